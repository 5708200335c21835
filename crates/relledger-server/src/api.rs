//! Public ledger API.
//!
//! Every POST is authorized first, then its `os`/`arch` are normalized, then
//! the typed payload is read. GETs are unauthenticated reads.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relledger_core::{AuthError, AuthorizedRequest, DbHandle, SignatureAuthorizer, VersionLedger};
use relledger_schema::{
    Ack, AuthEcho, Flag, LatestCommit, ListQuery, TargetContent, Total, UrlContent, VersionKey,
    VersionPage, normalize_content,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Shared handler state: the ledger and the gate in front of it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: VersionLedger,
    pub authorizer: Arc<SignatureAuthorizer>,
}

impl AppState {
    pub fn new(db: DbHandle) -> Self {
        Self {
            ledger: VersionLedger::new(db.clone()),
            authorizer: Arc::new(SignatureAuthorizer::new(db)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/version/auth", post(auth_check))
        .route("/version/url", post(set_url))
        .route("/version/test", post(set_tested))
        .route("/version/publish", post(set_published))
        .route("/version/pack", post(set_packed))
        .route("/version/packtest", post(set_pack_tested))
        .route("/version", get(list_versions))
        .route("/version/total", get(total))
        .route("/version/latest/commit", get(latest_commit))
        .with_state(state)
}

/// Optional `?product=` filter.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProductParam {
    product: Option<String>,
}

impl ProductParam {
    pub(crate) fn into_product(self) -> Option<String> {
        self.product.filter(|p| !p.is_empty())
    }
}

/// Parse, authorize, and normalize a signed body.
async fn authorized(state: &AppState, body: &[u8]) -> Result<AuthorizedRequest, ApiError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|_| AuthError::MalformedRequest("body is not JSON"))?;
    let mut request = state.authorizer.authorize(body).await?;
    normalize_content(&mut request.content);
    Ok(request)
}

fn target_key(content: &Value) -> Result<VersionKey, ApiError> {
    let target: TargetContent =
        serde_json::from_value(content.clone()).map_err(|_| ApiError::MissingFields)?;
    if !target.is_complete() {
        return Err(ApiError::MissingFields);
    }
    Ok(VersionKey::new(
        target.product,
        target.version,
        &target.os,
        &target.arch,
    ))
}

async fn auth_check(State(state): State<AppState>, body: Bytes) -> Result<Json<AuthEcho>, ApiError> {
    let request = authorized(&state, &body).await?;
    Ok(Json(AuthEcho {
        result: 1,
        request: request.content,
    }))
}

async fn set_url(State(state): State<AppState>, body: Bytes) -> Result<Json<Ack>, ApiError> {
    let request = authorized(&state, &body).await?;
    let content: UrlContent =
        serde_json::from_value(request.content).map_err(|_| ApiError::MissingFields)?;
    if !content.target.is_complete() || content.url.is_empty() || content.commit.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let target = content.target;
    let key = VersionKey::new(target.product, target.version, &target.os, &target.arch);
    state
        .ledger
        .upsert_url(key, content.url, content.commit)
        .await
        .map_err(ApiError::storage("Failed to set version URL"))?;
    Ok(Json(Ack::OK))
}

async fn update_flag(
    state: &AppState,
    body: &[u8],
    flag: Flag,
    failure: &'static str,
) -> Result<Json<Ack>, ApiError> {
    let request = authorized(state, body).await?;
    let key = target_key(&request.content)?;
    let value = request
        .content
        .get(flag.request_field())
        .or_else(|| request.content.get(flag.column()))
        .and_then(Value::as_bool)
        .ok_or(ApiError::MissingFields)?;

    state
        .ledger
        .set_flag(key, flag, value)
        .await
        .map_err(ApiError::storage(failure))?;
    Ok(Json(Ack::OK))
}

async fn set_tested(State(state): State<AppState>, body: Bytes) -> Result<Json<Ack>, ApiError> {
    update_flag(&state, &body, Flag::Tested, "Failed to set version test result").await
}

async fn set_published(State(state): State<AppState>, body: Bytes) -> Result<Json<Ack>, ApiError> {
    update_flag(&state, &body, Flag::Published, "Failed to set version publish result").await
}

async fn set_packed(State(state): State<AppState>, body: Bytes) -> Result<Json<Ack>, ApiError> {
    update_flag(&state, &body, Flag::Packed, "Failed to set version pack result").await
}

async fn set_pack_tested(State(state): State<AppState>, body: Bytes) -> Result<Json<Ack>, ApiError> {
    update_flag(
        &state,
        &body,
        Flag::PackTested,
        "Failed to set version pack test result",
    )
    .await
}

async fn list_versions(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<VersionPage>, ApiError> {
    let query = ListQuery::from_pairs(pairs);
    let (page_num, page_size) = (query.page, query.page_size);
    let items = state
        .ledger
        .list_versions(query)
        .await
        .map_err(ApiError::storage("Failed to list versions"))?;

    Ok(Json(VersionPage {
        items,
        page_num,
        page_size,
    }))
}

async fn total(
    State(state): State<AppState>,
    Query(param): Query<ProductParam>,
) -> Result<Json<Total>, ApiError> {
    let total = state
        .ledger
        .count_versions(param.into_product())
        .await
        .map_err(ApiError::storage("Failed to count versions"))?;
    Ok(Json(Total { total }))
}

async fn latest_commit(
    State(state): State<AppState>,
    Query(param): Query<ProductParam>,
) -> Result<Response, ApiError> {
    let commit = state
        .ledger
        .latest_commit(param.into_product())
        .await
        .map_err(ApiError::storage("Failed to read latest commit"))?;

    Ok(match commit {
        Some(commit_sha) => Json(LatestCommit { commit_sha }).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
