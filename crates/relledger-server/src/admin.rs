//! Administrative API. Bind it to a private interface; it is not signed.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use relledger_core::ConsistencyEnforcer;
use relledger_schema::Ack;

use crate::api::ProductParam;
use crate::error::ApiError;

pub fn router(enforcer: ConsistencyEnforcer) -> Router {
    Router::new()
        .route("/cleanup", get(cleanup))
        .with_state(enforcer)
}

async fn cleanup(
    State(enforcer): State<ConsistencyEnforcer>,
    Query(param): Query<ProductParam>,
) -> Result<Json<Ack>, ApiError> {
    enforcer
        .run(param.into_product())
        .await
        .map_err(ApiError::storage("Failed to cleanup versions"))?;
    Ok(Json(Ack::OK))
}
