// Settlement Provider - Population centres near an impact site
// The engine only sees the trait; lookups may be remote, cached or static

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::ProviderError;
use crate::zones::{haversine_km, GeoPoint};

/// GDP per capita assumed for unknown countries (USD)
pub const DEFAULT_GDP_PER_CAPITA: f64 = 5000.0;

/// Cache entries older than this are refetched
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub name: String,
    pub country: String,
    /// ISO 3166-1 alpha-2
    #[serde(default)]
    pub country_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
    /// Falls back to the country table when absent
    #[serde(default)]
    pub gdp_per_capita_usd: Option<f64>,
}

impl Settlement {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Source of settlements around a point.
///
/// Implementations are synchronous; the async service puts a timeout
/// around them. Failures degrade the exposure report, never the physics.
pub trait SettlementProvider: Send + Sync {
    fn settlements_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Settlement>, ProviderError>;
}

impl<F> SettlementProvider for F
where
    F: Fn(GeoPoint, f64) -> Result<Vec<Settlement>, ProviderError> + Send + Sync,
{
    fn settlements_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Settlement>, ProviderError> {
        self(center, radius_km)
    }
}

// =============================================================================
// STATIC LIST
// =============================================================================

/// In-memory settlement list filtered by great-circle distance.
#[derive(Debug, Clone, Default)]
pub struct StaticSettlements {
    settlements: Vec<Settlement>,
}

impl StaticSettlements {
    pub fn new(settlements: Vec<Settlement>) -> Self {
        Self { settlements }
    }

    /// Built-in list of major world cities
    pub fn world_cities() -> Self {
        let settlements = WORLD_CITIES
            .iter()
            .map(|&(name, country, code, latitude, longitude, population, gdp)| Settlement {
                name: name.to_string(),
                country: country.to_string(),
                country_code: Some(code.to_string()),
                latitude,
                longitude,
                population,
                gdp_per_capita_usd: Some(gdp),
            })
            .collect();
        Self { settlements }
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }
}

impl SettlementProvider for StaticSettlements {
    fn settlements_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Settlement>, ProviderError> {
        Ok(self
            .settlements
            .iter()
            .filter(|s| haversine_km(center, s.location()) <= radius_km)
            .cloned()
            .collect())
    }
}

type CityRow = (&'static str, &'static str, &'static str, f64, f64, u64, f64);

#[rustfmt::skip]
const WORLD_CITIES: &[CityRow] = &[
    // North America
    ("New York", "USA", "US", 40.7128, -74.0060, 8_336_817, 65_000.0),
    ("Los Angeles", "USA", "US", 34.0522, -118.2437, 3_971_883, 65_000.0),
    ("Chicago", "USA", "US", 41.8781, -87.6298, 2_693_976, 65_000.0),
    ("Houston", "USA", "US", 29.7604, -95.3698, 2_320_268, 65_000.0),
    ("Phoenix", "USA", "US", 33.4484, -112.0740, 1_680_992, 65_000.0),
    ("Philadelphia", "USA", "US", 39.9526, -75.1652, 1_584_064, 65_000.0),
    ("San Diego", "USA", "US", 32.7157, -117.1611, 1_423_851, 65_000.0),
    ("Dallas", "USA", "US", 32.7767, -96.7970, 1_343_573, 65_000.0),
    ("Toronto", "Canada", "CA", 43.6532, -79.3832, 2_930_000, 45_000.0),
    ("Montreal", "Canada", "CA", 45.5017, -73.5673, 1_780_000, 45_000.0),
    ("Vancouver", "Canada", "CA", 49.2827, -123.1207, 675_218, 45_000.0),
    ("Mexico City", "Mexico", "MX", 19.4326, -99.1332, 9_209_944, 20_000.0),
    // Europe
    ("London", "UK", "GB", 51.5074, -0.1278, 8_982_000, 42_000.0),
    ("Paris", "France", "FR", 48.8566, 2.3522, 2_161_000, 40_000.0),
    ("Berlin", "Germany", "DE", 52.5200, 13.4050, 3_769_000, 45_000.0),
    ("Madrid", "Spain", "ES", 40.4168, -3.7038, 3_223_000, 30_000.0),
    ("Rome", "Italy", "IT", 41.9028, 12.4964, 2_873_000, 35_000.0),
    ("Moscow", "Russia", "RU", 55.7558, 37.6176, 12_615_000, 12_000.0),
    ("Barcelona", "Spain", "ES", 41.3851, 2.1734, 1_620_000, 30_000.0),
    ("Munich", "Germany", "DE", 48.1351, 11.5820, 1_472_000, 45_000.0),
    ("Milan", "Italy", "IT", 45.4642, 9.1900, 1_372_000, 35_000.0),
    // Asia
    ("Tokyo", "Japan", "JP", 35.6762, 139.6503, 13_929_286, 40_000.0),
    ("Shanghai", "China", "CN", 31.2304, 121.4737, 24_870_895, 15_000.0),
    ("Beijing", "China", "CN", 39.9042, 116.4074, 21_540_000, 15_000.0),
    ("Mumbai", "India", "IN", 19.0760, 72.8777, 12_478_447, 2_000.0),
    ("Delhi", "India", "IN", 28.7041, 77.1025, 32_941_000, 2_000.0),
    ("Seoul", "South Korea", "KR", 37.5665, 126.9780, 9_720_846, 30_000.0),
    ("Bangkok", "Thailand", "TH", 13.7563, 100.5018, 10_539_000, 7_000.0),
    ("Singapore", "Singapore", "SG", 1.3521, 103.8198, 5_685_807, 65_000.0),
    ("Hong Kong", "China", "HK", 22.3193, 114.1694, 7_496_981, 50_000.0),
    ("Guangzhou", "China", "CN", 23.1291, 113.2644, 14_043_500, 15_000.0),
    ("Shenzhen", "China", "CN", 22.5431, 114.0579, 12_356_820, 15_000.0),
    // Africa
    ("Cairo", "Egypt", "EG", 30.0444, 31.2357, 20_484_965, 3_000.0),
    ("Lagos", "Nigeria", "NG", 6.5244, 3.3792, 15_388_000, 2_000.0),
    ("Johannesburg", "South Africa", "ZA", -26.2041, 28.0473, 5_634_800, 6_000.0),
    ("Nairobi", "Kenya", "KE", -1.2921, 36.8219, 4_397_073, 2_000.0),
    ("Kinshasa", "DR Congo", "CD", -4.4419, 15.2663, 14_342_000, 500.0),
    // South America
    ("São Paulo", "Brazil", "BR", -23.5505, -46.6333, 12_325_232, 15_000.0),
    ("Buenos Aires", "Argentina", "AR", -34.6118, -58.3960, 3_075_646, 12_000.0),
    ("Lima", "Peru", "PE", -12.0464, -77.0428, 10_750_000, 6_000.0),
    ("Bogotá", "Colombia", "CO", 4.7110, -74.0721, 10_700_000, 6_000.0),
    ("Rio de Janeiro", "Brazil", "BR", -22.9068, -43.1729, 6_748_000, 15_000.0),
    // Oceania
    ("Sydney", "Australia", "AU", -33.8688, 151.2093, 5_312_163, 55_000.0),
    ("Melbourne", "Australia", "AU", -37.8136, 144.9631, 5_078_193, 55_000.0),
    ("Brisbane", "Australia", "AU", -27.4698, 153.0251, 2_514_184, 55_000.0),
    ("Perth", "Australia", "AU", -31.9505, 115.8605, 2_085_973, 55_000.0),
    ("Auckland", "New Zealand", "NZ", -36.8485, 174.7633, 1_657_200, 40_000.0),
];

// =============================================================================
// GDP TABLE
// =============================================================================

/// GDP per capita by ISO country code, with a default for unknown codes.
#[derive(Debug, Clone)]
pub struct GdpTable {
    by_country: HashMap<String, f64>,
    default_usd: f64,
}

impl GdpTable {
    pub fn new(by_country: HashMap<String, f64>, default_usd: f64) -> Self {
        Self {
            by_country,
            default_usd,
        }
    }

    /// 2023 estimates for the larger economies
    pub fn builtin() -> Self {
        #[rustfmt::skip]
        const ROWS: &[(&str, f64)] = &[
            ("US", 65_000.0), ("CA", 45_000.0), ("GB", 42_000.0), ("DE", 45_000.0),
            ("FR", 40_000.0), ("JP", 40_000.0), ("AU", 55_000.0), ("NZ", 40_000.0),
            ("SG", 65_000.0), ("CH", 80_000.0), ("NO", 75_000.0), ("SE", 55_000.0),
            ("DK", 60_000.0), ("NL", 50_000.0), ("AT", 48_000.0), ("BE", 45_000.0),
            ("FI", 48_000.0), ("IE", 70_000.0), ("LU", 110_000.0), ("IS", 60_000.0),
            ("HK", 50_000.0),
            ("CN", 15_000.0), ("KR", 30_000.0), ("ES", 30_000.0), ("IT", 35_000.0),
            ("PT", 25_000.0), ("GR", 20_000.0), ("PL", 18_000.0), ("CZ", 25_000.0),
            ("HU", 18_000.0), ("RO", 15_000.0), ("RU", 12_000.0), ("TR", 10_000.0),
            ("MX", 20_000.0), ("BR", 15_000.0), ("AR", 12_000.0), ("CL", 16_000.0),
            ("MY", 12_000.0), ("TH", 7_000.0), ("ZA", 6_000.0),
            ("IN", 2_000.0), ("ID", 4_000.0), ("PH", 3_500.0), ("VN", 3_500.0),
            ("EG", 3_000.0), ("NG", 2_000.0), ("KE", 2_000.0), ("PK", 1_500.0),
            ("BD", 2_000.0), ("UA", 4_000.0), ("PE", 6_000.0), ("CO", 6_000.0),
            ("EC", 6_000.0), ("MA", 3_500.0),
            ("ET", 900.0), ("CD", 500.0), ("TZ", 1_100.0), ("UG", 900.0), ("NP", 1_200.0),
        ];
        Self::new(
            ROWS.iter().map(|&(code, gdp)| (code.to_string(), gdp)).collect(),
            DEFAULT_GDP_PER_CAPITA,
        )
    }

    pub fn lookup(&self, country_code: Option<&str>) -> f64 {
        country_code
            .and_then(|code| self.by_country.get(&code.to_ascii_uppercase()))
            .copied()
            .unwrap_or(self.default_usd)
    }
}

impl Default for GdpTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// CACHING
// =============================================================================

/// Cache key: centre rounded to 0.01° and radius to 1 km
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lat_centi: i64,
    lon_centi: i64,
    radius_km: i64,
}

impl CacheKey {
    fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self {
            lat_centi: (center.latitude * 100.0).round() as i64,
            lon_centi: (center.longitude * 100.0).round() as i64,
            radius_km: radius_km.ceil() as i64,
        }
    }
}

struct CacheEntry {
    settlements: Vec<Settlement>,
    fetched_at: Instant,
}

/// Time-bounded memo in front of a slower provider. Failures are not cached.
pub struct CachedProvider<P> {
    inner: P,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    cache_duration: Duration,
}

impl<P: SettlementProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: P, cache_duration: Duration) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            cache_duration,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<P: SettlementProvider> SettlementProvider for CachedProvider<P> {
    fn settlements_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Settlement>, ProviderError> {
        let key = CacheKey::new(center, radius_km);
        if let Some(entry) = self.entries.read().get(&key) {
            if entry.fetched_at.elapsed() < self.cache_duration {
                return Ok(entry.settlements.clone());
            }
        }

        let settlements = self.inner.settlements_near(center, radius_km)?;
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.cache_duration);
        entries.insert(
            key,
            CacheEntry {
                settlements: settlements.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(settlements)
    }
}
