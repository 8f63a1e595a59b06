// kibbledrop_server/src/services/mod.rs

//! Business operations between the HTTP handlers and the database. Every
//! multi-row write goes through an explicit transaction here.

pub mod cart;
pub mod catalog;
pub mod mailer;
pub mod orders;
pub mod pets;
pub mod subscriptions;
pub mod uploads;
pub mod users;
