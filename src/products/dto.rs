use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Product;

/// Scalar fields and the optional image file collected from a multipart
/// form. Creation requires most of them; updates take any subset.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub stock_alert: Option<i32>,
    pub quantity: Option<i32>,
    /// Raw bytes plus the part's MIME type.
    pub image: Option<(Bytes, String)>,
}

/// Product as served to clients: image bytes projected out, fetch URL in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
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
    pub slug: String,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProductResponse {
    pub fn from_product(p: Product, image_url: String) -> Self {
        Self {
            id: p.id,
            name: p.name,
            category: p.category,
            brand: p.brand,
            description: p.description,
            unit: p.unit,
            price: p.price,
            discount: p.discount,
            stock_alert: p.stock_alert,
            quantity: p.quantity,
            code: p.code,
            slug: p.slug,
            image_url,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_camel_case_without_bytes() {
        let now = OffsetDateTime::now_utc();
        let resp = ProductResponse {
            id: Uuid::new_v4(),
            name: "Wrench".into(),
            category: "Tools".into(),
            brand: "ACME".into(),
            description: "A wrench".into(),
            unit: "pcs".into(),
            price: 9.99,
            discount: 0.0,
            stock_alert: 5,
            quantity: 40,
            code: "PRD-123456".into(),
            slug: "wrench".into(),
            image_url: "http://localhost:8080/api/product/x/image".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"imageUrl\""));
        assert!(json.contains("\"stockAlert\":5"));
        assert!(!json.contains("\"image\":"));
    }
}
