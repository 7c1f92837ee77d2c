use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError};
use motusdao_database::Recompensa;

use crate::state::AppState;

use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsQuery {
    pub receptor_id: Option<Uuid>,
    pub tipo_receptor: Option<String>,
}

// The append-only points ledger, newest first
pub async fn list_rewards(
    State(state): State<AppState>,
    Query(params): Query<RewardsQuery>,
) -> HandlerResult<Vec<Recompensa>> {
    let result = sqlx::query_as::<_, Recompensa>(
        r#"
        SELECT * FROM recompensas
        WHERE ($1::uuid IS NULL OR receptor_id = $1)
          AND ($2::text IS NULL OR tipo_receptor = $2)
        ORDER BY created_date DESC
        "#,
    )
    .bind(params.receptor_id)
    .bind(&params.tipo_receptor)
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(recompensas) => Ok(Json(ApiResponse::success(recompensas))),
        Err(err) => Err(error_reply("Failed to fetch rewards", AppError::Database(err))),
    }
}
