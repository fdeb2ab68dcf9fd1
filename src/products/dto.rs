use serde::{Deserialize, Serialize};
use sqlx::types::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::Product;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// All fields optional; absent ones keep their stored values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            farmer_id: product.farmer_id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: product.image_url,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductPayload {
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct ProductsPayload {
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn product_response_uses_camel_case() {
        let response = ProductResponse {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            name: "Tomatoes".into(),
            description: None,
            price: Decimal::new(250, 2),
            category: Some("vegetables".into()),
            image_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("farmerId").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("farmer_id").is_none());
        assert_eq!(json["name"], "Tomatoes");
    }

    #[test]
    fn create_request_accepts_numeric_price() {
        let req: CreateProductRequest =
            serde_json::from_str(r#"{"name":"Eggs","price":4.5}"#).unwrap();
        assert_eq!(req.price, Some(Decimal::new(45, 1)));
    }
}
