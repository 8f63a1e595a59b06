// kibbledrop_server/src/services/pets.rs

//! Pet profiles: per-user records with health tags and inline base64
//! image/vaccination-card attachments. Attachments are validated and
//! mime-normalized before they hit the database.

use crate::errors::{AppError, Result as AppResult};
use crate::models::PetProfile;
use crate::services::uploads;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

const PET_COLUMNS: &str = "id, user_id, name, pet_type, breed, birthday, weight_grams, health_tags, \
 image_data, vaccination_card, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct PetProfileInput {
  pub name: String,
  pub pet_type: String,
  pub breed: Option<String>,
  pub birthday: Option<NaiveDate>,
  pub weight_grams: Option<i64>,
  #[serde(default)]
  pub health_tags: Vec<String>,
  pub image_data: Option<String>,
  pub vaccination_card: Option<String>,
}

impl PetProfileInput {
  /// Validates the profile and normalizes both attachments in place.
  fn validate(&mut self, max_attachment_bytes: usize) -> AppResult<()> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("Pet name is required.".to_string()));
    }
    if self.pet_type.trim().is_empty() {
      return Err(AppError::Validation("Pet type is required.".to_string()));
    }
    if let Some(grams) = self.weight_grams {
      if grams <= 0 {
        return Err(AppError::Validation("Weight must be a positive number of grams.".to_string()));
      }
    }
    if let Some(raw) = &self.image_data {
      self.image_data = Some(uploads::validate_data_uri(raw, max_attachment_bytes)?);
    }
    if let Some(raw) = &self.vaccination_card {
      self.vaccination_card = Some(uploads::validate_data_uri(raw, max_attachment_bytes)?);
    }
    Ok(())
  }
}

#[instrument(name = "pets::list", skip(pool))]
pub async fn list(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<PetProfile>> {
  let pets: Vec<PetProfile> = sqlx::query_as(&format!(
    "SELECT {} FROM pet_profiles WHERE user_id = $1 ORDER BY created_at ASC",
    PET_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(pets)
}

#[instrument(name = "pets::get", skip(pool))]
pub async fn get(pool: &PgPool, user_id: Uuid, pet_id: Uuid) -> AppResult<PetProfile> {
  let pet: Option<PetProfile> = sqlx::query_as(&format!(
    "SELECT {} FROM pet_profiles WHERE id = $1 AND user_id = $2",
    PET_COLUMNS
  ))
  .bind(pet_id)
  .bind(user_id)
  .fetch_optional(pool)
  .await?;
  pet.ok_or_else(|| AppError::NotFound(format!("Pet profile with ID {} not found.", pet_id)))
}

#[instrument(name = "pets::create", skip(pool, input), fields(name = %input.name))]
pub async fn create(
  pool: &PgPool,
  user_id: Uuid,
  mut input: PetProfileInput,
  max_attachment_bytes: usize,
) -> AppResult<PetProfile> {
  input.validate(max_attachment_bytes)?;

  let pet_id: Uuid = sqlx::query_scalar(
    "INSERT INTO pet_profiles (user_id, name, pet_type, breed, birthday, weight_grams, health_tags, \
     image_data, vaccination_card) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
  )
  .bind(user_id)
  .bind(&input.name)
  .bind(&input.pet_type)
  .bind(&input.breed)
  .bind(input.birthday)
  .bind(input.weight_grams)
  .bind(&input.health_tags)
  .bind(&input.image_data)
  .bind(&input.vaccination_card)
  .fetch_one(pool)
  .await?;

  info!("Pet profile {} created.", pet_id);
  get(pool, user_id, pet_id).await
}

#[instrument(name = "pets::update", skip(pool, input))]
pub async fn update(
  pool: &PgPool,
  user_id: Uuid,
  pet_id: Uuid,
  mut input: PetProfileInput,
  max_attachment_bytes: usize,
) -> AppResult<PetProfile> {
  input.validate(max_attachment_bytes)?;

  let result = sqlx::query(
    "UPDATE pet_profiles SET name = $1, pet_type = $2, breed = $3, birthday = $4, weight_grams = $5, \
     health_tags = $6, image_data = $7, vaccination_card = $8, updated_at = NOW() \
     WHERE id = $9 AND user_id = $10",
  )
  .bind(&input.name)
  .bind(&input.pet_type)
  .bind(&input.breed)
  .bind(input.birthday)
  .bind(input.weight_grams)
  .bind(&input.health_tags)
  .bind(&input.image_data)
  .bind(&input.vaccination_card)
  .bind(pet_id)
  .bind(user_id)
  .execute(pool)
  .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Pet profile with ID {} not found.", pet_id)));
  }

  get(pool, user_id, pet_id).await
}

#[instrument(name = "pets::delete", skip(pool))]
pub async fn delete(pool: &PgPool, user_id: Uuid, pet_id: Uuid) -> AppResult<()> {
  let result = sqlx::query("DELETE FROM pet_profiles WHERE id = $1 AND user_id = $2")
    .bind(pet_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Pet profile with ID {} not found.", pet_id)));
  }
  info!("Pet profile {} deleted.", pet_id);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_input() -> PetProfileInput {
    PetProfileInput {
      name: "Biscuit".to_string(),
      pet_type: "dog".to_string(),
      breed: Some("Corgi".to_string()),
      birthday: None,
      weight_grams: Some(9_500),
      health_tags: vec!["grain-sensitive".to_string()],
      image_data: None,
      vaccination_card: None,
    }
  }

  #[test]
  fn blank_name_or_type_is_rejected() {
    let mut input = base_input();
    input.name = " ".to_string();
    assert!(input.validate(1024).is_err());

    let mut input = base_input();
    input.pet_type = String::new();
    assert!(input.validate(1024).is_err());
  }

  #[test]
  fn non_positive_weight_is_rejected() {
    let mut input = base_input();
    input.weight_grams = Some(0);
    assert!(input.validate(1024).is_err());
  }

  #[test]
  fn bad_attachment_fails_validation() {
    let mut input = base_input();
    input.image_data = Some("data:image/png;base64,AAAA".to_string());
    assert!(input.validate(1024).is_err());
  }
}
