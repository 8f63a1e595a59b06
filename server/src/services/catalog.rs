// kibbledrop_server/src/services/catalog.rs

//! Product catalog reads and the admin-side mutations. Product + variant
//! writes happen inside one transaction; deletion is refused while an
//! active subscription still references the product.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Product, WeightVariant};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, pet_type, brand, weight_label, \
 species, life_stage, food_type, nutrition_facts, featured, created_at, updated_at";

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
  pub category: Option<String>,
  pub pet_type: Option<String>,
  pub featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VariantInput {
  pub weight_label: String,
  pub price_cents: i64,
  #[serde(default = "default_in_stock")]
  pub in_stock: bool,
}

fn default_in_stock() -> bool {
  true
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub category: String,
  pub pet_type: String,
  pub brand: Option<String>,
  pub weight_label: Option<String>,
  pub species: Option<String>,
  pub life_stage: Option<String>,
  pub food_type: Option<String>,
  pub nutrition_facts: Option<serde_json::Value>,
  #[serde(default)]
  pub featured: bool,
  #[serde(default)]
  pub variants: Vec<VariantInput>,
}

impl ProductInput {
  fn validate(&self) -> AppResult<()> {
    if self.name.trim().is_empty() {
      return Err(AppError::Validation("Product name is required.".to_string()));
    }
    if self.price_cents < 0 {
      return Err(AppError::Validation("Price cannot be negative.".to_string()));
    }
    if self.variants.iter().any(|v| v.price_cents < 0) {
      return Err(AppError::Validation("Variant price cannot be negative.".to_string()));
    }
    Ok(())
  }
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
  #[serde(flatten)]
  pub product: Product,
  pub variants: Vec<WeightVariant>,
}

#[instrument(name = "catalog::list", skip(pool, filter))]
pub async fn list(pool: &PgPool, filter: &ProductFilter) -> AppResult<Vec<Product>> {
  let mut qb: QueryBuilder<Postgres> =
    QueryBuilder::new(format!("SELECT {} FROM products WHERE 1=1", PRODUCT_COLUMNS));
  if let Some(category) = &filter.category {
    qb.push(" AND category = ").push_bind(category);
  }
  if let Some(pet_type) = &filter.pet_type {
    qb.push(" AND pet_type = ").push_bind(pet_type);
  }
  if let Some(featured) = filter.featured {
    qb.push(" AND featured = ").push_bind(featured);
  }
  qb.push(" ORDER BY name ASC");

  let products = qb.build_query_as::<Product>().fetch_all(pool).await?;
  Ok(products)
}

#[instrument(name = "catalog::get", skip(pool))]
pub async fn get_with_variants(pool: &PgPool, product_id: Uuid) -> AppResult<ProductDetail> {
  let product: Option<Product> = sqlx::query_as(&format!(
    "SELECT {} FROM products WHERE id = $1",
    PRODUCT_COLUMNS
  ))
  .bind(product_id)
  .fetch_optional(pool)
  .await?;
  let product = product.ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))?;

  let variants: Vec<WeightVariant> = sqlx::query_as(
    "SELECT id, product_id, weight_label, price_cents, in_stock FROM weight_variants \
     WHERE product_id = $1 ORDER BY price_cents ASC",
  )
  .bind(product_id)
  .fetch_all(pool)
  .await?;

  Ok(ProductDetail { product, variants })
}

#[instrument(name = "catalog::create", skip(pool, input), fields(name = %input.name))]
pub async fn create(pool: &PgPool, input: &ProductInput) -> AppResult<ProductDetail> {
  input.validate()?;

  let mut tx = pool.begin().await?;

  let product_id: Uuid = sqlx::query_scalar(
    "INSERT INTO products (name, description, price_cents, category, pet_type, brand, weight_label, \
     species, life_stage, food_type, nutrition_facts, featured) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
  )
  .bind(&input.name)
  .bind(&input.description)
  .bind(input.price_cents)
  .bind(&input.category)
  .bind(&input.pet_type)
  .bind(&input.brand)
  .bind(&input.weight_label)
  .bind(&input.species)
  .bind(&input.life_stage)
  .bind(&input.food_type)
  .bind(&input.nutrition_facts)
  .bind(input.featured)
  .fetch_one(&mut *tx)
  .await?;

  for variant in &input.variants {
    sqlx::query("INSERT INTO weight_variants (product_id, weight_label, price_cents, in_stock) VALUES ($1, $2, $3, $4)")
      .bind(product_id)
      .bind(&variant.weight_label)
      .bind(variant.price_cents)
      .bind(variant.in_stock)
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  info!("Product {} created with {} variants.", product_id, input.variants.len());
  get_with_variants(pool, product_id).await
}

/// Updates a product and replaces its variants, all or nothing.
#[instrument(name = "catalog::update", skip(pool, input))]
pub async fn update(pool: &PgPool, product_id: Uuid, input: &ProductInput) -> AppResult<ProductDetail> {
  input.validate()?;

  let mut tx = pool.begin().await?;

  let result = sqlx::query(
    "UPDATE products SET name = $1, description = $2, price_cents = $3, category = $4, pet_type = $5, \
     brand = $6, weight_label = $7, species = $8, life_stage = $9, food_type = $10, nutrition_facts = $11, \
     featured = $12, updated_at = NOW() WHERE id = $13",
  )
  .bind(&input.name)
  .bind(&input.description)
  .bind(input.price_cents)
  .bind(&input.category)
  .bind(&input.pet_type)
  .bind(&input.brand)
  .bind(&input.weight_label)
  .bind(&input.species)
  .bind(&input.life_stage)
  .bind(&input.food_type)
  .bind(&input.nutrition_facts)
  .bind(input.featured)
  .bind(product_id)
  .execute(&mut *tx)
  .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
  }

  sqlx::query("DELETE FROM weight_variants WHERE product_id = $1")
    .bind(product_id)
    .execute(&mut *tx)
    .await?;
  for variant in &input.variants {
    sqlx::query("INSERT INTO weight_variants (product_id, weight_label, price_cents, in_stock) VALUES ($1, $2, $3, $4)")
      .bind(product_id)
      .bind(&variant.weight_label)
      .bind(variant.price_cents)
      .bind(variant.in_stock)
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  get_with_variants(pool, product_id).await
}

/// Deletes a product unless an active subscription still references it.
#[instrument(name = "catalog::delete", skip(pool))]
pub async fn delete(pool: &PgPool, product_id: Uuid) -> AppResult<()> {
  let referenced: bool = sqlx::query_scalar(
    "SELECT EXISTS (SELECT 1 FROM subscription_items si \
     JOIN subscriptions s ON s.id = si.subscription_id \
     WHERE si.product_id = $1 AND s.status = 'active')",
  )
  .bind(product_id)
  .fetch_one(pool)
  .await?;
  if referenced {
    return Err(AppError::Validation(
      "Product is referenced by an active subscription and cannot be deleted.".to_string(),
    ));
  }

  let mut tx = pool.begin().await?;
  sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
    .bind(product_id)
    .execute(&mut *tx)
    .await?;
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product_id)
    .execute(&mut *tx)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
  }
  tx.commit().await?;

  info!("Product {} deleted.", product_id);
  Ok(())
}

/// A handful of demo rows for local development (`SEED_DB=true`).
pub async fn seed_demo_products(pool: &PgPool) -> AppResult<()> {
  let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(pool).await?;
  if count > 0 {
    return Ok(());
  }

  let demo = [
    ("Salmon & Sweet Potato Kibble", "dry-food", "dog", 4599_i64, true),
    ("Grain-Free Chicken Pate", "wet-food", "cat", 289_i64, true),
    ("Dental Chew Sticks", "treats", "dog", 1250_i64, false),
  ];
  for (name, category, pet_type, price_cents, featured) in demo {
    sqlx::query(
      "INSERT INTO products (name, price_cents, category, pet_type, featured) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(name)
    .bind(price_cents)
    .bind(category)
    .bind(pet_type)
    .bind(featured)
    .execute(pool)
    .await?;
  }
  info!("Seeded {} demo products.", demo.len());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_input() -> ProductInput {
    ProductInput {
      name: "Puppy Starter Mix".to_string(),
      description: None,
      price_cents: 2999,
      category: "dry-food".to_string(),
      pet_type: "dog".to_string(),
      brand: None,
      weight_label: None,
      species: None,
      life_stage: Some("puppy".to_string()),
      food_type: None,
      nutrition_facts: None,
      featured: false,
      variants: vec![],
    }
  }

  #[test]
  fn blank_name_is_rejected() {
    let mut input = base_input();
    input.name = "   ".to_string();
    assert!(input.validate().is_err());
  }

  #[test]
  fn negative_prices_are_rejected() {
    let mut input = base_input();
    input.price_cents = -1;
    assert!(input.validate().is_err());

    let mut input = base_input();
    input.variants.push(VariantInput {
      weight_label: "5kg".to_string(),
      price_cents: -500,
      in_stock: true,
    });
    assert!(input.validate().is_err());
  }

  #[test]
  fn well_formed_input_passes() {
    assert!(base_input().validate().is_ok());
  }
}
