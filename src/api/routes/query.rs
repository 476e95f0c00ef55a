//! Query Routes
//!
//! - GET /GET?key=&t=&i= - Aggregate a key pattern
//!
//! A literal key with no data answers `null`, a wildcard with no matches
//! answers `{}`.

use axum::{
    extract::{Query as QueryParams, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::api::dto::GetParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::query::{Query, TimestampFilter};

/// GET /GET
pub async fn get_value(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<GetParams>,
) -> ApiResult<impl IntoResponse> {
    let query = build_query(&params, state.config.default_interval_secs)?;
    let wildcard = query.pattern.has_wildcard();

    let body = match state.store.query(&query).await? {
        Some(value) => serde_json::to_string(&value).unwrap_or_else(|e| {
            tracing::error!(key = %query.pattern, "Failed to serialize query result: {}", e);
            "{}".to_string()
        }),
        None if wildcard => "{}".to_string(),
        None => "null".to_string(),
    };

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

fn build_query(params: &GetParams, default_interval: f64) -> ApiResult<Query> {
    let key = params
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Validation("key parameter is required".to_string()))?;

    let filter = match params.t.as_deref() {
        Some(list) => TimestampFilter::parse_list(list)?,
        None => TimestampFilter::all(),
    };

    let interval = match params.i.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<f64>()
            .map_err(|_| ApiError::Validation(format!("Invalid interval: {:?}", raw)))?,
        _ => default_interval,
    };

    let query = Query::parse(key)?.filter(filter).interval(interval);
    query.validate()?;
    Ok(query)
}
