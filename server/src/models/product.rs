// kibbledrop_server/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  /// Base price; weight variants carry their own.
  pub price_cents: i64,
  pub category: String,
  pub pet_type: String,
  pub brand: Option<String>,
  pub weight_label: Option<String>,
  pub species: Option<String>,
  pub life_stage: Option<String>,
  pub food_type: Option<String>,
  pub nutrition_facts: Option<serde_json::Value>,
  pub featured: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeightVariant {
  pub id: Uuid,
  pub product_id: Uuid,
  pub weight_label: String,
  pub price_cents: i64,
  pub in_stock: bool,
}
