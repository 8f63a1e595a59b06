// kibbledrop_server/src/web/routes.rs

//! The route table. Everything lives under `/api/v1`; the `/admin` scope is
//! gated by the `AdminUser` extractor inside each handler, webhooks are
//! unauthenticated but signature-verified.

use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, order_handlers, pet_handlers, product_handlers,
  subscription_handlers, upload_handlers, webhook_handlers,
};
use actix_web::web;

// Raw-body routes (uploads, webhooks) need more than the actix default;
// service-level validation enforces the real per-route caps.
const PAYLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(web::PayloadConfig::new(PAYLOAD_LIMIT_BYTES))
      .route("/health", web::get().to(health))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup))
          .route("/signin", web::post().to(auth_handlers::signin))
          .route("/signout", web::post().to(auth_handlers::signout))
          .route("/me", web::get().to(auth_handlers::me)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list))
          .route("/{id}", web::get().to(product_handlers::get)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view))
          .route("", web::delete().to(cart_handlers::clear))
          .route("/items", web::post().to(cart_handlers::add_item))
          .route("/items/{id}", web::patch().to(cart_handlers::update_item))
          .route("/items/{id}", web::delete().to(cart_handlers::remove_item)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create))
          .route("", web::get().to(order_handlers::list))
          .route("/{id}", web::get().to(order_handlers::get)),
      )
      .route("/checkout/{provider}", web::post().to(order_handlers::checkout))
      .service(
        web::scope("/subscriptions")
          .route("", web::post().to(subscription_handlers::create))
          .route("", web::get().to(subscription_handlers::list))
          .route("/{id}", web::get().to(subscription_handlers::get))
          .route("/{id}", web::patch().to(subscription_handlers::update))
          .route("/{id}/skip", web::post().to(subscription_handlers::skip))
          .route("/{id}/cancel", web::post().to(subscription_handlers::cancel)),
      )
      .service(
        web::scope("/pets")
          .route("", web::post().to(pet_handlers::create))
          .route("", web::get().to(pet_handlers::list))
          .route("/{id}", web::get().to(pet_handlers::get))
          .route("/{id}", web::put().to(pet_handlers::update))
          .route("/{id}", web::delete().to(pet_handlers::delete)),
      )
      .route("/uploads", web::post().to(upload_handlers::upload_image))
      .service(
        web::scope("/admin")
          .service(
            web::scope("/products")
              .route("", web::post().to(admin_handlers::create_product))
              .route("/{id}", web::put().to(admin_handlers::update_product))
              .route("/{id}", web::delete().to(admin_handlers::delete_product)),
          )
          .service(
            web::scope("/orders")
              .route("", web::get().to(admin_handlers::list_orders))
              .route("/{id}", web::get().to(admin_handlers::get_order))
              .route("/{id}/cancel", web::post().to(admin_handlers::cancel_order)),
          )
          .service(
            web::scope("/users")
              .route("", web::get().to(admin_handlers::list_users))
              .route("/{id}", web::get().to(admin_handlers::get_user))
              .route("/{id}", web::delete().to(admin_handlers::delete_user)),
          ),
      )
      .route("/webhooks/{provider}", web::post().to(webhook_handlers::receive)),
  );
}

async fn health() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
