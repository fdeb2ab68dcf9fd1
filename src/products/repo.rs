use sqlx::types::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
}

pub struct NewProduct<'a> {
    pub farmer_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub category: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

pub struct ProductPatch<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub category: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

const PRODUCT_COLUMNS: &str =
    "id, farmer_id, name, description, price, category, image_url, created_at";

impl Product {
    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn create(db: &PgPool, new: NewProduct<'_>) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (farmer_id, name, description, price, category, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(new.farmer_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.price)
        .bind(new.category)
        .bind(new.image_url)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    /// Partial update; absent fields keep their stored values.
    pub async fn update(db: &PgPool, id: Uuid, patch: ProductPatch<'_>) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                image_url = COALESCE($6, image_url)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.price)
        .bind(patch.category)
        .bind(patch.image_url)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}
