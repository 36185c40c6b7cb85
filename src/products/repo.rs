use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::services::mint_code;

const CODE_MINT_ATTEMPTS: u32 = 5;

/// Product record as read back from the database. Image bytes are kept
/// out of this struct; they are only streamed by the image endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub description: String,
    pub unit: String,
    pub price: f64,
    pub discount: f64,
    pub stock_alert: i32,
    pub quantity: i32,
    pub code: String,
    pub image_type: String,
    pub slug: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewProduct<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub brand: &'a str,
    pub description: &'a str,
    pub unit: &'a str,
    pub price: f64,
    pub discount: f64,
    pub stock_alert: i32,
    pub quantity: i32,
    pub image: &'a [u8],
    pub image_type: &'a str,
    pub slug: &'a str,
}

/// Partial update of scalar fields; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub stock_alert: Option<i32>,
    pub quantity: Option<i32>,
}

pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, category, brand, description, unit, price, discount,
               stock_alert, quantity, code, image_type, slug, created_at, updated_at
        FROM products
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, category, brand, description, unit, price, discount,
               stock_alert, quantity, code, image_type, slug, created_at, updated_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, category, brand, description, unit, price, discount,
               stock_alert, quantity, code, image_type, slug, created_at, updated_at
        FROM products
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Insert a product, minting the unique code.
///
/// `products.code` carries a UNIQUE constraint; when a freshly minted code
/// collides, the insert is retried with a new code up to a small bound.
pub async fn create(db: &PgPool, new: &NewProduct<'_>) -> anyhow::Result<Product> {
    for _ in 0..CODE_MINT_ATTEMPTS {
        let code = mint_code();
        let result = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (name, category, brand, description, unit, price, discount,
                 stock_alert, quantity, code, image, image_type, slug)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, name, category, brand, description, unit, price, discount,
                      stock_alert, quantity, code, image_type, slug, created_at, updated_at
            "#,
        )
        .bind(new.name)
        .bind(new.category)
        .bind(new.brand)
        .bind(new.description)
        .bind(new.unit)
        .bind(new.price)
        .bind(new.discount)
        .bind(new.stock_alert)
        .bind(new.quantity)
        .bind(&code)
        .bind(new.image)
        .bind(new.image_type)
        .bind(new.slug)
        .fetch_one(db)
        .await;

        match result {
            Ok(product) => return Ok(product),
            Err(e) if is_code_collision(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    anyhow::bail!("could not mint a unique product code after {CODE_MINT_ATTEMPTS} attempts")
}

fn is_code_collision(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(dbe) => {
            dbe.is_unique_violation() && dbe.constraint() == Some("products_code_key")
        }
        _ => false,
    }
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    changes: &ProductChanges,
) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name        = COALESCE($2, name),
            category    = COALESCE($3, category),
            brand       = COALESCE($4, brand),
            description = COALESCE($5, description),
            unit        = COALESCE($6, unit),
            price       = COALESCE($7, price),
            discount    = COALESCE($8, discount),
            stock_alert = COALESCE($9, stock_alert),
            quantity    = COALESCE($10, quantity),
            updated_at  = now()
        WHERE id = $1
        RETURNING id, name, category, brand, description, unit, price, discount,
                  stock_alert, quantity, code, image_type, slug, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.category.as_deref())
    .bind(changes.brand.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.unit.as_deref())
    .bind(changes.price)
    .bind(changes.discount)
    .bind(changes.stock_alert)
    .bind(changes.quantity)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn set_image(
    db: &PgPool,
    id: Uuid,
    image: &[u8],
    image_type: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET image = $2, image_type = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(image)
    .bind(image_type)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Raw bytes and stored MIME type for the image endpoint.
pub async fn fetch_image(db: &PgPool, id: Uuid) -> anyhow::Result<Option<(Vec<u8>, String)>> {
    let row = sqlx::query_as::<_, (Vec<u8>, String)>(
        r#"SELECT image, image_type FROM products WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
