// kibbledrop_server/src/models/pet_profile.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PetProfile {
  pub id: Uuid,
  pub user_id: Uuid,
  pub name: String,
  pub pet_type: String,
  pub breed: Option<String>,
  pub birthday: Option<NaiveDate>,
  pub weight_grams: Option<i64>,
  pub health_tags: Vec<String>,
  /// Inline base64 data URI, not a file path.
  pub image_data: Option<String>,
  pub vaccination_card: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
