// kibbledrop_server/src/auth/mod.rs

//! Password hashing and JWT-cookie sessions, plus the request extractors
//! that centralize the customer/admin authorization gates.

pub mod password;
pub mod session;

pub use session::{AdminUser, AuthenticatedUser, SESSION_COOKIE};
