//! Pure computation engine for deterministic ledger arithmetic.

pub mod projection;
pub mod valuation;

pub use projection::{
    compare_strategies, days_to_target, project_cycle, project_scenarios, CycleProjection,
    ProjectedDay, ProjectionError, ScenarioProjection, StrategyComparison, TargetProjection,
    MAX_PROJECTION_DAYS,
};
pub use valuation::{
    assess_price, breakeven_price, daily_roi_average, estimated_net_margin_pct, price_quote, roi,
    sale_breakdown, suggested_price, weighted_average, PriceAssessment, PriceQuote, SaleBreakdown,
    MIN_MARGIN_PCT,
};
