pub mod debug_flow;
pub mod history;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod validation;

// Re-export what the binaries need to assemble the server.
pub use middleware::require_auth;
pub use router::build_router;
pub use state::AppState;
