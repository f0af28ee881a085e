pub mod auth;
pub mod import;
pub mod materials;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;

// Re-export the pieces the server binary needs to assemble the router.
pub use middleware::require_auth;
pub use rest::ApiDoc;
