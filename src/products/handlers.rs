use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{auth::extractors::AuthUser, slug::slugify, state::AppState};

use super::dto::{MessageResponse, ProductForm, ProductResponse};
use super::repo::{self, NewProduct, ProductChanges};
use super::services::{image_url, parse_price};

#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    headers: HeaderMap,
    mut mp: Multipart,
) -> Result<Json<ProductResponse>, (StatusCode, String)> {
    let form = parse_form(&mut mp).await?;

    let (image, image_type) = form.image.ok_or((
        StatusCode::BAD_REQUEST,
        "Product image is required.".to_string(),
    ))?;
    if !image_type.starts_with("image/") {
        warn!(%image_type, "create_product: rejected upload type");
        return Err((StatusCode::BAD_REQUEST, "Invalid image type.".into()));
    }

    let name = require(form.name, "Product name is required.")?;
    let category = require(form.category, "Category is required.")?;
    let description = require(form.description, "Product details is required.")?;
    let price = form
        .price
        .ok_or((StatusCode::BAD_REQUEST, "Price is required.".to_string()))?;
    let quantity = form
        .quantity
        .ok_or((StatusCode::BAD_REQUEST, "Quantity is required.".to_string()))?;

    // Duplicate name is a validation failure, checked before any write
    match repo::find_by_name(&state.db, &name).await {
        Ok(Some(_)) => {
            warn!(%name, "create_product: duplicate name");
            return Err((StatusCode::BAD_REQUEST, "Product already exists.".into()));
        }
        Ok(None) => {}
        Err(e) => return Err(internal(e)),
    }

    let slug = slugify(&name);
    let new = NewProduct {
        name: &name,
        category: &category,
        brand: form.brand.as_deref().unwrap_or(""),
        description: &description,
        unit: form.unit.as_deref().unwrap_or(""),
        price,
        discount: form.discount.unwrap_or(0.0),
        stock_alert: form.stock_alert.unwrap_or(0),
        quantity,
        image: &image,
        image_type: &image_type,
        slug: &slug,
    };

    let product = match repo::create(&state.db, &new).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "create product failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(product_id = %product.id, code = %product.code, "product created");
    let url = image_url(host(&headers), product.id);
    Ok(Json(ProductResponse::from_product(product, url)))
}

#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductResponse>>, (StatusCode, String)> {
    let products = repo::list(&state.db).await.map_err(internal)?;
    let host = host(&headers);
    let items = products
        .into_iter()
        .map(|p| {
            let url = image_url(host, p.id);
            ProductResponse::from_product(p, url)
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, (StatusCode, String)> {
    let product = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found.".to_string()))?;

    let url = image_url(host(&headers), product.id);
    Ok(Json(ProductResponse::from_product(product, url)))
}

#[instrument(skip(state, mp))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<ProductResponse>, (StatusCode, String)> {
    let form = parse_form(&mut mp).await?;

    if let Some((_, image_type)) = form.image.as_ref() {
        if !image_type.starts_with("image/") {
            return Err((StatusCode::BAD_REQUEST, "Invalid image type.".into()));
        }
    }

    let changes = ProductChanges {
        name: form.name,
        category: form.category,
        brand: form.brand,
        description: form.description,
        unit: form.unit,
        price: form.price,
        discount: form.discount,
        stock_alert: form.stock_alert,
        quantity: form.quantity,
    };

    let product = repo::update(&state.db, id, &changes)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    if let Some((image, image_type)) = form.image {
        repo::set_image(&state.db, id, &image, &image_type)
            .await
            .map_err(internal)?;
    }

    info!(product_id = %id, "product updated");
    let url = image_url(host(&headers), product.id);
    Ok(Json(ProductResponse::from_product(product, url)))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, id).await.map_err(internal)?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Product not found".into()));
    }
    info!(product_id = %id, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

#[instrument(skip(state))]
pub async fn get_product_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (image, image_type) = repo::fetch_image(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Image not found.".to_string()))?;

    // Never serve a 200 with an empty body
    if image.is_empty() {
        return Err((StatusCode::NOT_FOUND, "Image not found.".into()));
    }
    if !image_type.starts_with("image/") {
        return Err((StatusCode::BAD_REQUEST, "Invalid image type.".into()));
    }
    let content_type = HeaderValue::from_str(&image_type)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid image type.".to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type)], Bytes::from(image)))
}

/// Collect scalar fields and the `image` file from a multipart form.
/// Unknown parts are ignored.
async fn parse_form(mp: &mut Multipart) -> Result<ProductForm, (StatusCode, String)> {
    let mut form = ProductForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(internal)?;
                form.image = Some((data, content_type));
            }
            "name" => form.name = Some(text(field).await?),
            "category" => form.category = Some(text(field).await?),
            "brand" => form.brand = Some(text(field).await?),
            "description" => form.description = Some(text(field).await?),
            "unit" => form.unit = Some(text(field).await?),
            "price" => {
                let raw = text(field).await?;
                let price = parse_price(&raw)
                    .ok_or((StatusCode::BAD_REQUEST, "Price is invalid.".to_string()))?;
                form.price = Some(price);
            }
            "discount" => {
                let raw = text(field).await?;
                let discount = parse_price(&raw)
                    .ok_or((StatusCode::BAD_REQUEST, "Discount is invalid.".to_string()))?;
                form.discount = Some(discount);
            }
            "stockAlert" => {
                let raw = text(field).await?;
                let value = raw.trim().parse::<i32>().map_err(|_| {
                    (StatusCode::BAD_REQUEST, "Stock alert is invalid.".to_string())
                })?;
                form.stock_alert = Some(value);
            }
            "quantity" => {
                let raw = text(field).await?;
                let value = raw.trim().parse::<i32>().map_err(|_| {
                    (StatusCode::BAD_REQUEST, "Quantity is invalid.".to_string())
                })?;
                form.quantity = Some(value);
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, (StatusCode, String)> {
    field.text().await.map_err(internal)
}

fn host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn require(value: Option<String>, message: &str) -> Result<String, (StatusCode, String)> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err((StatusCode::BAD_REQUEST, message.to_string())),
    }
}
