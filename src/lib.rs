// ImpactSim - Asteroid Impact Effect & Deflection Simulation Engine
// Library root: physics core, exposure model, Monte Carlo and async boundary

pub mod config;
pub mod deflection;
pub mod effects;
pub mod error;
pub mod impact;
pub mod logging;
pub mod monte_carlo;
pub mod orbit;
pub mod presets;
pub mod service;
pub mod settlements;
pub mod simulation;
pub mod units;
pub mod zones;

pub use config::EngineConfig;
pub use deflection::{DeflectionResult, DeflectionStrategy, StrategyKind};
pub use error::{ConfigError, GeometryError, ProviderError, SimulationError, ValidationError};
pub use impact::{AsteroidProperties, AsteroidSpec, Composition, ImpactParameters, TargetType};
pub use logging::init_logging;
pub use monte_carlo::{
    run_monte_carlo, CancellationToken, MonteCarloConfig, MonteCarloEngine, MonteCarloRequest,
    MonteCarloSummary,
};
pub use orbit::{ImpactGeometry, KeplerianElements};
pub use presets::{physics_constants, preset, presets};
pub use service::ImpactService;
pub use settlements::{CachedProvider, GdpTable, Settlement, SettlementProvider, StaticSettlements};
pub use simulation::{
    simulate_deflection, simulate_impact, DeflectionComparison, ImpactResult, ImpactScenario,
    SimulationOptions, SimulationRequest, SimulationResponse, Trajectory,
};
pub use zones::{ExposureTier, GeoPoint, ZoneScheme};
