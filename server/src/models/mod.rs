// kibbledrop_server/src/models/mod.rs

//! Contains data structures representing database entities.

pub mod order;
pub mod pet_profile;
pub mod product;
pub mod subscription;
pub mod user;

// Re-export the model structs for convenient access. Cart rows are only
// ever read joined with their product, so the cart service defines its own
// CartLine projection instead of a bare row struct here.
pub use order::{Order, OrderItem};
pub use pet_profile::PetProfile;
pub use product::{Product, WeightVariant};
pub use subscription::{Subscription, SubscriptionItem};
pub use user::User;
