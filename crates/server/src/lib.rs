//! HTTP and WebSocket front for the token aggregator
//!
//! Serves the committed snapshot over `/tokens`, process health over
//! `/health` and live feed events over `/ws`.

pub mod query;
pub mod routes;
pub mod server;
pub mod settings;
pub mod ws;

pub use query::{PageMeta, SortField, SortOrder, TokenPage, TokenQuery};
pub use routes::HealthResponse;
pub use server::{router, ApiServer, ApiServerBuilder, ApiServerConfig, AppState};
pub use settings::load_settings;
