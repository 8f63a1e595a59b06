// kibbledrop_server/src/web/mod.rs

//! HTTP surface: route table plus one handler module per resource.

pub mod handlers;
pub mod routes;

pub use routes::configure_app_routes;
