use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    products::{
        dto::{
            CreateProductRequest, Pagination, ProductPayload, ProductResponse, ProductsPayload,
            UpdateProductRequest,
        },
        repo::{NewProduct, Product, ProductPatch},
    },
    response::{Envelope, NoData},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Envelope<ProductsPayload>>, ApiError> {
    let products = Product::list(&state.db, p.limit, p.offset)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;
    Ok(Json(Envelope::ok(ProductsPayload {
        products: products.into_iter().map(ProductResponse::from).collect(),
    })))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ProductPayload>>, ApiError> {
    let product = Product::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    Ok(Json(Envelope::ok(ProductPayload {
        product: product.into(),
    })))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Envelope<ProductPayload>>), ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (name, price) = match (name, payload.price) {
        (Some(name), Some(price)) => (name, price),
        _ => {
            warn!("product creation missing fields");
            return Err(ApiError::Validation("Name and price are required".into()));
        }
    };

    let product = Product::create(
        &state.db,
        NewProduct {
            farmer_id: user_id,
            name,
            description: payload.description.as_deref(),
            price,
            category: payload.category.as_deref(),
            image_url: payload.image_url.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal("Server error", e))?;

    info!(product_id = %product.id, farmer_id = %user_id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Product created successfully",
            ProductPayload {
                product: product.into(),
            },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Envelope<ProductPayload>>, ApiError> {
    let existing = Product::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    if existing.farmer_id != user_id {
        warn!(product_id = %id, user_id = %user_id, "product update by non-owner");
        return Err(ApiError::Forbidden(
            "You can only modify your own products".into(),
        ));
    }

    let product = Product::update(
        &state.db,
        id,
        ProductPatch {
            name: payload.name.as_deref(),
            description: payload.description.as_deref(),
            price: payload.price,
            category: payload.category.as_deref(),
            image_url: payload.image_url.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal("Server error", e))?;

    Ok(Json(Envelope::with_message(
        "Product updated successfully",
        ProductPayload {
            product: product.into(),
        },
    )))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let existing = Product::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    if existing.farmer_id != user_id {
        warn!(product_id = %id, user_id = %user_id, "product delete by non-owner");
        return Err(ApiError::Forbidden(
            "You can only modify your own products".into(),
        ));
    }

    Product::delete(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;

    info!(product_id = %id, farmer_id = %user_id, "product deleted");
    Ok(Json(Envelope::message_only("Product deleted")))
}
