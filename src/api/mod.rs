pub mod cycles;
pub mod days;
pub mod health;
pub mod projection;
pub mod sales;
pub mod settings;
pub mod vault;
pub mod views;

use crate::config::Config;
use crate::ledger::Ledger;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub config: Config,
}

impl AppState {
    pub fn new(ledger: Ledger, config: Config) -> Self {
        Self { ledger, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/config",
            get(settings::get_config).put(settings::update_config),
        )
        .route("/v1/assets", get(settings::get_assets))
        .route(
            "/v1/cycles",
            get(cycles::list_cycles).post(cycles::create_cycle),
        )
        .route("/v1/cycles/:id", get(cycles::get_cycle))
        .route("/v1/cycles/:id/close", post(cycles::close_cycle))
        .route("/v1/cycles/:id/extend", post(cycles::extend_cycle))
        .route("/v1/cycles/:id/stats", get(cycles::get_cycle_stats))
        .route("/v1/cycles/:id/vault", get(cycles::get_cycle_vault))
        .route("/v1/vault/deposit", post(vault::deposit))
        .route("/v1/vault/withdraw", post(vault::withdraw))
        .route("/v1/vault/transfer", post(vault::transfer))
        .route("/v1/days", post(days::open_day))
        .route("/v1/days/:id", get(days::get_day))
        .route("/v1/days/:id/close", post(days::close_day))
        .route("/v1/days/:id/price", post(days::set_price))
        .route("/v1/days/:id/reinvest", post(days::reinvest))
        .route("/v1/sales", post(sales::register_sale))
        .route("/v1/quote", get(sales::get_quote))
        .route("/v1/projection", get(projection::get_projection))
        .layer(cors)
        .with_state(state)
}
