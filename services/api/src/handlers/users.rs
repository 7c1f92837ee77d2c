use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use motusdao_common::{is_connectivity_error, ApiResponse, AppError};
use motusdao_database::{DbPool, Psm, Usuario};

use crate::mock;
use crate::state::AppState;

use super::{error_reply, HandlerResult};

/// The PSM fields embedded in patient-facing payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsmResumen {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub especialidades: Vec<String>,
    pub biografia: Option<String>,
    pub foto: Option<String>,
}

impl From<Psm> for PsmResumen {
    fn from(psm: Psm) -> Self {
        Self {
            id: psm.id,
            nombre: psm.nombre,
            apellido: psm.apellido,
            especialidades: psm.especialidades,
            biografia: psm.biografia,
            foto: psm.foto,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioDetalle {
    #[serde(flatten)]
    pub usuario: Usuario,
    pub current_psm: Option<PsmResumen>,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub wallet: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUsuarioRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: Option<String>,
    pub lugar_residencia: Option<String>,
    pub problematica_principal: Option<String>,
    pub tipo_atencion: Option<String>,
    pub preferencia_asignacion: Option<String>,
    pub wallet: Option<String>,
    pub owner: Option<String>,
}

// List patients, or resolve a single one by wallet address
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UsersQuery>,
) -> HandlerResult<serde_json::Value> {
    let result = match params.wallet.as_deref() {
        Some(wallet) => fetch_user_by_wallet(&state.db_pool, wallet)
            .await
            .and_then(to_json),
        None => fetch_all_users(&state.db_pool).await.and_then(to_json),
    };

    match result {
        Ok(value) => Ok(Json(ApiResponse::success(value))),
        Err(AppError::Database(err))
            if is_connectivity_error(&err) && state.config.use_mock_data =>
        {
            tracing::warn!("Database unreachable, serving mock users: {}", err);
            let value = to_json(mock::usuarios()).map_err(|e| error_reply("Failed to fetch user data", e))?;
            Ok(Json(ApiResponse::with_message(
                value,
                "Development mode: returning mock user data",
            )))
        }
        Err(err) => Err(error_reply("Failed to fetch user data", err)),
    }
}

// Create or update a patient profile, keyed by wallet or email
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(request): Json<UpsertUsuarioRequest>,
) -> HandlerResult<Usuario> {
    if let Err(validation_errors) = request.validate() {
        return Err(error_reply(
            "Failed to save user data",
            AppError::Validation(format!("Validation error: {:?}", validation_errors)),
        ));
    }

    match upsert_usuario(&state.db_pool, &request).await {
        Ok(usuario) => Ok(Json(ApiResponse::success(usuario))),
        Err(err) => Err(error_reply("Failed to save user data", err)),
    }
}

// The patient's current PSM, or null when unassigned
pub async fn get_current_psm(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> HandlerResult<Option<PsmResumen>> {
    let usuario = match fetch_usuario(&state.db_pool, user_id).await {
        Ok(usuario) => usuario,
        Err(err) => return Err(error_reply("Failed to fetch user data", err)),
    };

    let psm = match usuario.current_psm_id {
        Some(psm_id) => sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = $1")
            .bind(psm_id)
            .fetch_optional(&state.db_pool)
            .await
            .map_err(|e| error_reply("Failed to fetch user data", AppError::Database(e)))?,
        None => None,
    };

    Ok(Json(ApiResponse::success(psm.map(PsmResumen::from))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPsmRequest {
    pub psm_id: Option<Uuid>,
}

// Point the patient at a PSM, or clear the link with a null psmId
pub async fn set_current_psm(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SetPsmRequest>,
) -> HandlerResult<Usuario> {
    if let Some(psm_id) = request.psm_id {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM psms WHERE id = $1)")
            .bind(psm_id)
            .fetch_one(&state.db_pool)
            .await
            .map_err(|e| error_reply("Failed to update assignment", AppError::Database(e)))?;

        if !exists {
            return Err(error_reply(
                "Failed to update assignment",
                AppError::NotFound("PSM not found".to_string()),
            ));
        }
    }

    let updated = sqlx::query_as::<_, Usuario>(
        "UPDATE usuarios SET current_psm_id = $2, updated_date = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(request.psm_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| error_reply("Failed to update assignment", AppError::Database(e)))?
    .ok_or_else(|| {
        error_reply(
            "Failed to update assignment",
            AppError::NotFound("User not found".to_string()),
        )
    })?;

    Ok(Json(ApiResponse::success(updated)))
}

// Shared with the dual-write registration flow
pub(crate) async fn upsert_usuario(
    pool: &DbPool,
    request: &UpsertUsuarioRequest,
) -> Result<Usuario, AppError> {
    let nombre = request
        .nombre
        .as_deref()
        .ok_or_else(|| AppError::Validation("Missing required field: nombre".to_string()))?;
    let apellido = request
        .apellido
        .as_deref()
        .ok_or_else(|| AppError::Validation("Missing required field: apellido".to_string()))?;
    let email = request
        .email
        .as_deref()
        .ok_or_else(|| AppError::Validation("Missing required field: email".to_string()))?;

    let owner = request.owner.clone().or_else(|| request.wallet.clone());
    let telefono = request.telefono.clone().unwrap_or_default();
    let lugar_residencia = request.lugar_residencia.clone().unwrap_or_default();

    // Wallet-connected clients upsert on the wallet address; the rest
    // fall back to the email key.
    let conflict_key = if request.wallet.is_some() { "wallet" } else { "email" };
    let sql = format!(
        r#"
        INSERT INTO usuarios (
            nombre, apellido, email, fecha_nacimiento, telefono, lugar_residencia,
            problematica_principal, tipo_atencion, preferencia_asignacion,
            wallet, owner, horario_envio
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'automatica'), $10, $11, NOW())
        ON CONFLICT ({key}) DO UPDATE SET
            nombre = EXCLUDED.nombre,
            apellido = EXCLUDED.apellido,
            email = EXCLUDED.email,
            fecha_nacimiento = COALESCE(EXCLUDED.fecha_nacimiento, usuarios.fecha_nacimiento),
            telefono = EXCLUDED.telefono,
            lugar_residencia = EXCLUDED.lugar_residencia,
            problematica_principal = COALESCE($7, usuarios.problematica_principal),
            tipo_atencion = COALESCE($8, usuarios.tipo_atencion),
            preferencia_asignacion = COALESCE($9, usuarios.preferencia_asignacion),
            wallet = COALESCE(EXCLUDED.wallet, usuarios.wallet),
            owner = COALESCE(EXCLUDED.owner, usuarios.owner),
            horario_envio = EXCLUDED.horario_envio,
            updated_date = NOW()
        RETURNING *
        "#,
        key = conflict_key
    );

    let usuario = sqlx::query_as::<_, Usuario>(&sql)
        .bind(nombre)
        .bind(apellido)
        .bind(email)
        .bind(request.fecha_nacimiento)
        .bind(&telefono)
        .bind(&lugar_residencia)
        .bind(&request.problematica_principal)
        .bind(&request.tipo_atencion)
        .bind(&request.preferencia_asignacion)
        .bind(&request.wallet)
        .bind(&owner)
        .fetch_one(pool)
        .await?;

    tracing::info!("Upserted user {} ({})", usuario.id, usuario.email);
    Ok(usuario)
}

pub(crate) async fn fetch_usuario(pool: &DbPool, user_id: Uuid) -> Result<Usuario, AppError> {
    sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn fetch_all_users(pool: &DbPool) -> Result<Vec<UsuarioDetalle>, AppError> {
    let usuarios =
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios ORDER BY created_date DESC")
            .fetch_all(pool)
            .await?;

    let psms = fetch_current_psms(pool, &usuarios).await?;

    Ok(usuarios
        .into_iter()
        .map(|usuario| {
            let current_psm = usuario.current_psm_id.and_then(|id| psms.get(&id).cloned());
            UsuarioDetalle {
                usuario,
                current_psm,
            }
        })
        .collect())
}

async fn fetch_user_by_wallet(
    pool: &DbPool,
    wallet: &str,
) -> Result<Option<UsuarioDetalle>, AppError> {
    let usuario = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE wallet = $1")
        .bind(wallet)
        .fetch_optional(pool)
        .await?;

    let Some(usuario) = usuario else {
        return Ok(None);
    };

    let current_psm = match usuario.current_psm_id {
        Some(psm_id) => sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = $1")
            .bind(psm_id)
            .fetch_optional(pool)
            .await?
            .map(PsmResumen::from),
        None => None,
    };

    Ok(Some(UsuarioDetalle {
        usuario,
        current_psm,
    }))
}

pub(crate) async fn fetch_current_psms(
    pool: &DbPool,
    usuarios: &[Usuario],
) -> Result<HashMap<Uuid, PsmResumen>, AppError> {
    let psm_ids: Vec<Uuid> = usuarios.iter().filter_map(|u| u.current_psm_id).collect();
    if psm_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let psms = sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = ANY($1)")
        .bind(&psm_ids)
        .fetch_all(pool)
        .await?;

    Ok(psms
        .into_iter()
        .map(|psm| (psm.id, PsmResumen::from(psm)))
        .collect())
}

fn to_json<T: serde::Serialize>(value: T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}
