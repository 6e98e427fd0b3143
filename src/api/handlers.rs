//! API handlers
//!
//! Every handler performs a single store call and maps its outcome to a
//! response. Failures surface as [`ApiError`].

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, AppState};
use crate::types::{Body, ItemId, ItemUpdate, NewItem, SerializedItem};

/// Maximum number of items returned by the list endpoint
pub const LIST_LIMIT: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<SerializedItem>,
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<ItemListResponse>, ApiError> {
    let items = state.store.find(LIST_LIMIT).await?;

    Ok(Json(ItemListResponse {
        items: items.iter().map(|item| item.serialize()).collect(),
    }))
}

/// Fetch a single item
pub async fn get_item(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<SerializedItem>, ApiError> {
    let Path(id) = path?;
    let item_id = ItemId::parse(&id)?;

    let item = state
        .store
        .find_by_id(&item_id)
        .await?
        .ok_or(ApiError::ItemNotFound(id))?;

    Ok(Json(item.serialize()))
}

/// Create an item from the whitelisted body fields
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<Body>, JsonRejection>,
) -> Result<(StatusCode, Json<SerializedItem>), ApiError> {
    let Json(body) = payload?;
    let fields = NewItem::from_body(&body)?;

    let item = state.store.create(fields).await?;
    tracing::info!(id = %item.id, name = %item.name, "Item created");

    Ok((StatusCode::CREATED, Json(item.serialize())))
}

/// Apply a partial update
///
/// The body must repeat the path id. Updating an id that does not exist is
/// not an error.
pub async fn update_item(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<Body>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let Json(body) = payload?;

    let body_id = match body.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    if body_id.as_deref() != Some(id.as_str()) {
        return Err(ApiError::Validation(format!(
            "Request path id ({}) and request body id ({}) must match",
            id,
            body_id.as_deref().unwrap_or("missing"),
        )));
    }

    let update = ItemUpdate::from_body(&body)?;
    let item_id = ItemId::parse(&id)?;

    match state.store.find_by_id_and_update(&item_id, update).await? {
        Some(_) => tracing::info!(%id, "Item updated"),
        None => tracing::debug!(%id, "Update matched no item"),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Delete an item; deleting an absent id still succeeds
pub async fn delete_item(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let item_id = ItemId::parse(&id)?;

    if state.store.find_by_id_and_remove(&item_id).await?.is_some() {
        tracing::info!(%id, "Item deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Catch-all for unmatched requests
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
