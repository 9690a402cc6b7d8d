//! HTTP API surface, following riptide-api's axum + tower-http split
//! (state/errors/routes/handlers), adapted to this crate's error taxonomy.

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
