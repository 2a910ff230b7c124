//! Resource handlers shared by every record type.
//!
//! Each handler is generic over the record and mounted once per resource,
//! e.g. `get(records::list::<Teacher>)`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::Value;

use crate::database::SharedStore;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::record::Record;
use crate::services::RecordService;

#[derive(Debug, Serialize)]
pub struct BulkDeleted {
    pub status: String,
    pub deleted_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub status: String,
    pub id: i64,
}

/// GET /R - list with equality filters and `sortby`
pub async fn list<R: Record>(
    Extension(store): Extension<SharedStore>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Listing<R>> {
    let records = RecordService::<R>::new(store).list(&params).await?;
    Ok(ApiResponse::success(Listing::success(records)))
}

/// POST /R - create from an array of objects
pub async fn create<R: Record>(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Listing<R>> {
    let created = RecordService::<R>::new(store).create_many(json_body(payload)?).await?;
    Ok(ApiResponse::created(Listing::success(created)))
}

/// PATCH /R - atomic bulk patch of `[{"id": "<n>", ...}]`
pub async fn patch_many<R: Record>(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<()> {
    RecordService::<R>::new(store).patch_many(json_body(payload)?).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// DELETE /R - atomic bulk delete of an id array
pub async fn delete_many<R: Record>(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<BulkDeleted> {
    let deleted_ids = RecordService::<R>::new(store).delete_many(json_body(payload)?).await?;
    Ok(ApiResponse::success(BulkDeleted {
        status: format!("{}s successfully deleted", R::LABEL),
        deleted_ids,
    }))
}

/// GET /R/:id
pub async fn get_one<R: Record>(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<R> {
    let id = parse_id::<R>(&id)?;
    Ok(ApiResponse::success(RecordService::<R>::new(store).get(id).await?))
}

/// PUT /R/:id - replace every field
pub async fn replace<R: Record>(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<R> {
    let id = parse_id::<R>(&id)?;
    let record = RecordService::<R>::new(store).replace(id, json_body(payload)?).await?;
    Ok(ApiResponse::success(record))
}

/// PATCH /R/:id
pub async fn patch_one<R: Record>(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<R> {
    let id = parse_id::<R>(&id)?;
    let record = RecordService::<R>::new(store).patch_one(id, json_body(payload)?).await?;
    Ok(ApiResponse::success(record))
}

/// DELETE /R/:id
pub async fn delete_one<R: Record>(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let id = parse_id::<R>(&id)?;
    let id = RecordService::<R>::new(store).delete_one(id).await?;
    Ok(ApiResponse::success(Deleted {
        status: format!("{} successfully deleted", R::LABEL),
        id,
    }))
}

pub(crate) fn parse_id<R: Record>(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", R::LABEL.to_lowercase(), raw)))
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::PayloadTooLarge("Request body too large".to_string()))
        }
        Err(rejection) => {
            tracing::warn!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::invalid_json("Invalid request payload"))
        }
    }
}
