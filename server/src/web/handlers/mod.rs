// kibbledrop_server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod order_handlers;
pub mod pet_handlers;
pub mod product_handlers;
pub mod subscription_handlers;
pub mod upload_handlers;
pub mod webhook_handlers;
