// Spatial Zone & Exposure Model - Damage rings and settlement exposure tiers
// Rings and tier classification share one set of radius thresholds

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::effects::{mmi_at_distance, TsunamiSeverity};
use crate::orbit::wrap_longitude;
use crate::settlements::{GdpTable, Settlement};
use crate::units::{KM_PER_DEGREE, R_EARTH_KM};

/// Vertex bounds for a ring polygon
pub const MIN_RING_VERTICES: usize = 20;
pub const MAX_RING_VERTICES: usize = 32;

/// Samples used for the seismic intensity rings
const MMI_SAMPLES: usize = 20;

/// Upper bound on tsunami ring reach (km)
const MAX_TSUNAMI_REACH_KM: f64 = 500.0;

/// Coastline credited per tsunami ring (km)
const COASTLINE_PER_TSUNAMI_ZONE_KM: f64 = 50.0;

// =============================================================================
// GEOGRAPHY
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Move by a local north/east offset (km), flat-Earth approximation
    pub fn offset_km(&self, north_km: f64, east_km: f64) -> Self {
        let latitude = (self.latitude + north_km / KM_PER_DEGREE).clamp(-90.0, 90.0);
        let cos_lat = self.latitude.to_radians().cos().abs().max(1e-6);
        let longitude = wrap_longitude(self.longitude + east_km / (KM_PER_DEGREE * cos_lat));
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance (km) using the haversine formula
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * R_EARTH_KM * h.sqrt().min(1.0).asin()
}

/// Closed polygon ring of `[lon, lat]` pairs around `center`.
/// The first vertex is repeated at the end.
pub fn ring_polygon(center: GeoPoint, radius_km: f64, vertices: usize) -> Vec<[f64; 2]> {
    let lat_offset = radius_km / KM_PER_DEGREE;
    let lon_offset = radius_km / (KM_PER_DEGREE * center.latitude.to_radians().cos().abs().max(1e-6));

    let mut ring: Vec<[f64; 2]> = (0..vertices)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / vertices as f64;
            let lat = (center.latitude + lat_offset * angle.cos()).clamp(-90.0, 90.0);
            let lon = wrap_longitude(center.longitude + lon_offset * angle.sin());
            [lon, lat]
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Vertex count so that edges are roughly `resolution_km` long
pub fn vertex_count(radius_km: f64, resolution_km: f64) -> usize {
    let wanted = (2.0 * PI * radius_km / resolution_km.max(1e-3)).ceil();
    if wanted.is_finite() {
        (wanted as usize).clamp(MIN_RING_VERTICES, MAX_RING_VERTICES)
    } else {
        MAX_RING_VERTICES
    }
}

// =============================================================================
// COLOR
// =============================================================================

fn hex_to_rgb(hex: u32) -> [f64; 3] {
    [
        ((hex >> 16) & 0xFF) as f64,
        ((hex >> 8) & 0xFF) as f64,
        (hex & 0xFF) as f64,
    ]
}

/// Linear RGB interpolation between two `0xRRGGBB` colors, `t` in [0, 1]
pub fn interpolate_color(from: u32, to: u32, t: f64) -> String {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let (a, b) = (hex_to_rgb(from), hex_to_rgb(to));
    let channel = |i: usize| (a[i] + (b[i] - a[i]) * t).round() as u8;
    format!("#{:02X}{:02X}{:02X}", channel(0), channel(1), channel(2))
}

const DAMAGE_COLOR_INNER: u32 = 0x8B0000;
const DAMAGE_COLOR_OUTER: u32 = 0xFFFFE0;
const MMI_COLOR_LOW: u32 = 0xFFFF00;
const MMI_COLOR_HIGH: u32 = 0x4B0082;
const TSUNAMI_COLOR_LOW: u32 = 0x0066CC;
const TSUNAMI_COLOR_HIGH: u32 = 0xCC0000;

// =============================================================================
// EXPOSURE TIERS
// =============================================================================

/// Distance-ordered severity bucket. Declaration order is innermost first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExposureTier {
    Extreme,
    High,
    Medium,
    Low,
    Minimal,
}

impl ExposureTier {
    pub const ALL: [ExposureTier; 5] = [
        ExposureTier::Extreme,
        ExposureTier::High,
        ExposureTier::Medium,
        ExposureTier::Low,
        ExposureTier::Minimal,
    ];

    /// Fraction of local GDP lost
    pub fn loss_multiplier(self) -> f64 {
        match self {
            ExposureTier::Extreme => 0.95,
            ExposureTier::High => 0.5,
            ExposureTier::Medium => 0.2,
            ExposureTier::Low => 0.05,
            ExposureTier::Minimal => 0.01,
        }
    }

    /// Structural damage percentage drawn on the ring
    pub fn damage_percent(self) -> f64 {
        match self {
            ExposureTier::Extreme => 100.0,
            ExposureTier::High => 75.0,
            ExposureTier::Medium => 50.0,
            ExposureTier::Low => 25.0,
            ExposureTier::Minimal => 10.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExposureTier::Extreme => "Total Destruction",
            ExposureTier::High => "Severe Damage",
            ExposureTier::Medium => "Moderate Damage",
            ExposureTier::Low => "Light Damage",
            ExposureTier::Minimal => "Minimal Damage",
        }
    }
}

/// How ring radii are derived. The two schemes disagree for the same
/// impact; neither is a refinement of the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneScheme {
    /// 1×, 3×, 6×, 10×, 15× the crater radius
    #[default]
    CraterMultiples,
    /// Crater diameter, then 1×, 3×, 10×, 15× the blast radius
    BlastKeyed,
}

/// Outer radius (km) of each tier ring, innermost first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierThresholds {
    pub radii_km: [f64; 5],
}

impl ZoneScheme {
    pub fn thresholds(self, crater_radius_km: f64, blast_radius_km: f64) -> TierThresholds {
        let mut radii_km = match self {
            ZoneScheme::CraterMultiples => [1.0, 3.0, 6.0, 10.0, 15.0].map(|k| k * crater_radius_km),
            ZoneScheme::BlastKeyed => [
                2.0 * crater_radius_km,
                blast_radius_km,
                3.0 * blast_radius_km,
                10.0 * blast_radius_km,
                15.0 * blast_radius_km,
            ],
        };
        // Keep rings nested even when a small blast radius undercuts the crater
        for i in 1..radii_km.len() {
            radii_km[i] = radii_km[i].max(radii_km[i - 1]);
        }
        TierThresholds { radii_km }
    }
}

impl TierThresholds {
    /// Tier for a settlement at `distance_km`; beyond the low ring is minimal
    pub fn classify(&self, distance_km: f64) -> ExposureTier {
        ExposureTier::ALL[..4]
            .iter()
            .zip(self.radii_km.iter())
            .find(|(_, radius)| distance_km <= **radius)
            .map(|(tier, _)| *tier)
            .unwrap_or(ExposureTier::Minimal)
    }

    pub fn outermost_km(&self) -> f64 {
        self.radii_km[4]
    }
}

// =============================================================================
// RINGS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DamageZone {
    pub radius_km: f64,
    pub severity_tier: ExposureTier,
    pub label: String,
    pub damage_percent: f64,
    pub color: String,
    /// Closed `[lon, lat]` ring
    pub ring: Vec<[f64; 2]>,
}

pub fn damage_zones(center: GeoPoint, thresholds: &TierThresholds, resolution_km: f64) -> Vec<DamageZone> {
    let last = (ExposureTier::ALL.len() - 1) as f64;
    ExposureTier::ALL
        .iter()
        .zip(thresholds.radii_km.iter())
        .enumerate()
        .map(|(i, (tier, &radius_km))| DamageZone {
            radius_km,
            severity_tier: *tier,
            label: tier.label().to_string(),
            damage_percent: tier.damage_percent(),
            color: interpolate_color(DAMAGE_COLOR_INNER, DAMAGE_COLOR_OUTER, i as f64 / last),
            ring: ring_polygon(center, radius_km, vertex_count(radius_km, resolution_km)),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MmiZone {
    pub mmi: u8,
    pub distance_km: f64,
    pub color: String,
    pub ring: Vec<[f64; 2]>,
}

/// Seismic intensity rings sampled evenly between 1 km and `max_distance_km`
pub fn mmi_zones(magnitude: f64, center: GeoPoint, max_distance_km: f64, resolution_km: f64) -> Vec<MmiZone> {
    let max_distance_km = max_distance_km.max(1.0);
    let step = (max_distance_km - 1.0) / (MMI_SAMPLES - 1) as f64;
    (1..MMI_SAMPLES)
        .map(|i| {
            let distance_km = 1.0 + step * i as f64;
            let mmi = mmi_at_distance(magnitude, distance_km).floor();
            MmiZone {
                mmi: mmi as u8,
                distance_km,
                color: interpolate_color(MMI_COLOR_LOW, MMI_COLOR_HIGH, (mmi - 1.0) / 11.0),
                ring: ring_polygon(center, distance_km, vertex_count(distance_km, resolution_km)),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TsunamiZone {
    pub height_m: f64,
    pub category: TsunamiSeverity,
    pub distance_km: f64,
    pub color: String,
    pub ring: Vec<[f64; 2]>,
}

/// Inundation rings at 80/60/40/20 % of the peak height
pub fn tsunami_zones(max_height_m: f64, center: GeoPoint, resolution_km: f64) -> Vec<TsunamiZone> {
    [
        (0.8, TsunamiSeverity::Extreme),
        (0.6, TsunamiSeverity::High),
        (0.4, TsunamiSeverity::Medium),
        (0.2, TsunamiSeverity::Low),
    ]
    .into_iter()
    .filter_map(|(fraction, category)| {
        let height_m = max_height_m * fraction;
        if height_m <= 0.0 || !height_m.is_finite() {
            return None;
        }
        let distance_km = (height_m * 100.0).min(MAX_TSUNAMI_REACH_KM);
        Some(TsunamiZone {
            height_m,
            category,
            distance_km,
            color: interpolate_color(TSUNAMI_COLOR_LOW, TSUNAMI_COLOR_HIGH, fraction),
            ring: ring_polygon(center, distance_km, vertex_count(distance_km, resolution_km)),
        })
    })
    .collect()
}

pub fn affected_coastline_km(zones: &[TsunamiZone]) -> f64 {
    zones.len() as f64 * COASTLINE_PER_TSUNAMI_ZONE_KM
}

// =============================================================================
// SETTLEMENT EXPOSURE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedSettlement {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
    pub gdp_per_capita_usd: f64,
    pub distance_km: f64,
    pub exposure_tier: ExposureTier,
    pub economic_loss_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExposureReport {
    /// Sorted by ascending distance
    pub settlements: Vec<AffectedSettlement>,
    pub total_population_affected: u64,
    pub total_economic_loss_usd: f64,
    /// Loss as a share of the candidates' combined GDP
    pub gdp_impact_percentage: f64,
    pub data_unavailable: bool,
}

impl ExposureReport {
    /// Degraded report used when the settlement provider fails
    pub fn unavailable() -> Self {
        Self {
            data_unavailable: true,
            ..Self::default()
        }
    }
}

/// Classify candidates within `search_radius_km` and total the losses.
pub fn assess_exposure(
    center: GeoPoint,
    thresholds: &TierThresholds,
    search_radius_km: f64,
    candidates: &[Settlement],
    gdp: &GdpTable,
) -> ExposureReport {
    let mut settlements = Vec::new();
    let mut total_population_affected = 0u64;
    let mut total_economic_loss_usd = 0.0;
    let mut candidate_gdp = 0.0;

    for candidate in candidates {
        let gdp_per_capita_usd = candidate
            .gdp_per_capita_usd
            .unwrap_or_else(|| gdp.lookup(candidate.country_code.as_deref()));
        let settlement_gdp = candidate.population as f64 * gdp_per_capita_usd;

        let distance_km = haversine_km(center, GeoPoint::new(candidate.latitude, candidate.longitude));
        if distance_km > search_radius_km {
            continue;
        }
        candidate_gdp += settlement_gdp;

        let exposure_tier = thresholds.classify(distance_km);
        let economic_loss_usd = settlement_gdp * exposure_tier.loss_multiplier();
        total_population_affected = total_population_affected.saturating_add(candidate.population);
        total_economic_loss_usd += economic_loss_usd;

        settlements.push(AffectedSettlement {
            name: candidate.name.clone(),
            country: candidate.country.clone(),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            population: candidate.population,
            gdp_per_capita_usd,
            distance_km,
            exposure_tier,
            economic_loss_usd,
        });
    }

    settlements.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let gdp_impact_percentage = if candidate_gdp > 0.0 {
        total_economic_loss_usd / candidate_gdp * 100.0
    } else {
        0.0
    };

    ExposureReport {
        settlements,
        total_population_affected,
        total_economic_loss_usd,
        gdp_impact_percentage,
        data_unavailable: false,
    }
}
