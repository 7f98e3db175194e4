mod calendar;
mod goal;
mod ledger;
mod simulator;
mod types;

pub use calendar::{MonthParseError, YearMonth};
pub use goal::{project_goal, summarize_goal};
pub use ledger::monthly_series;
pub use simulator::{
    MAX_HORIZON_YEARS, NormalSource, Rng, clock_seed, horizon_months, simulate, simulate_bands,
};
pub use types::{
    AssetClass, AssetProfile, BandPoint, Entry, Goal, GoalProgress, GoalProjection,
    MonteCarloResult, MonthlyLedger, MonthlyNet, ProjectionPoint, SimulationInputs,
    SimulationPoint, SimulationResult,
};
