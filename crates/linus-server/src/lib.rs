//! Linus server: HTTP surface over the grid service.

pub mod mandala;
pub mod routes;
pub mod service;
pub mod state;
pub mod views;

pub use routes::build_router;
pub use service::GridService;
pub use state::AppState;
