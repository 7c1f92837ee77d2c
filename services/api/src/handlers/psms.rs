use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use motusdao_common::{is_connectivity_error, ApiResponse, AppError};
use motusdao_database::{Certificacion, DbPool, Psm};
use rust_decimal::Decimal;

use crate::mock;
use crate::state::AppState;

use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
pub struct PsmsQuery {
    pub activo: Option<bool>,
    pub disponible: Option<bool>,
    pub certificado: Option<bool>,
    pub especialidad: Option<String>,
}

// List PSMs with optional flag and specialty filters
pub async fn list_psms(
    State(state): State<AppState>,
    Query(params): Query<PsmsQuery>,
) -> HandlerResult<Vec<Psm>> {
    let result = sqlx::query_as::<_, Psm>(
        r#"
        SELECT * FROM psms
        WHERE ($1::boolean IS NULL OR activo = $1)
          AND ($2::boolean IS NULL OR disponible = $2)
          AND ($3::boolean IS NULL OR certificado = $3)
          AND ($4::text IS NULL OR $4 = ANY(especialidades))
        ORDER BY created_date DESC
        "#,
    )
    .bind(params.activo)
    .bind(params.disponible)
    .bind(params.certificado)
    .bind(&params.especialidad)
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(psms) => Ok(Json(ApiResponse::success(psms))),
        Err(err) if is_connectivity_error(&err) && state.config.use_mock_data => {
            tracing::warn!("Database unreachable, serving mock PSMs: {}", err);
            Ok(Json(ApiResponse::with_message(
                mock::psms(),
                "Development mode: returning mock PSM data",
            )))
        }
        Err(err) => Err(error_reply("Failed to fetch PSMs", AppError::Database(err))),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistroPsmRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: Option<String>,
    pub lugar_residencia: Option<String>,
    pub cedula_profesional: Option<String>,
    #[serde(default)]
    pub especialidades: Vec<String>,
    pub formacion_academica: Option<String>,
    pub experiencia_anios: Option<i32>,
    pub biografia: Option<String>,
    pub owner: Option<String>,
    pub wallet: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistroPsmResponse {
    pub psm: Psm,
    pub certificacion: Certificacion,
}

// Register a PSM; the pending certification is created with it
pub async fn register_psm(
    State(state): State<AppState>,
    Json(request): Json<RegistroPsmRequest>,
) -> HandlerResult<RegistroPsmResponse> {
    if let Err(validation_errors) = request.validate() {
        return Err(error_reply(
            "Failed to register PSM",
            AppError::Validation(format!("Validation error: {:?}", validation_errors)),
        ));
    }

    match crear_psm(&state.db_pool, &request).await {
        Ok((psm, certificacion)) => Ok(Json(ApiResponse::with_message(
            RegistroPsmResponse { psm, certificacion },
            "PSM registered. Certification review pending.",
        ))),
        Err(err) => Err(error_reply("Failed to register PSM", err)),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePsmRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: Option<String>,
    pub lugar_residencia: Option<String>,
    pub cedula_profesional: Option<String>,
    pub especialidades: Option<Vec<String>>,
    pub formacion_academica: Option<String>,
    pub experiencia_anios: Option<i32>,
    pub biografia: Option<String>,
    pub foto: Option<String>,
}

pub async fn update_psm(
    State(state): State<AppState>,
    Path(psm_id): Path<Uuid>,
    Json(request): Json<UpdatePsmRequest>,
) -> HandlerResult<Psm> {
    if let Err(validation_errors) = request.validate() {
        return Err(error_reply(
            "Failed to update PSM",
            AppError::Validation(format!("Validation error: {:?}", validation_errors)),
        ));
    }

    let updated = sqlx::query_as::<_, Psm>(
        r#"
        UPDATE psms SET
            nombre = COALESCE($2, nombre),
            apellido = COALESCE($3, apellido),
            email = COALESCE($4, email),
            fecha_nacimiento = COALESCE($5, fecha_nacimiento),
            telefono = COALESCE($6, telefono),
            lugar_residencia = COALESCE($7, lugar_residencia),
            cedula_profesional = COALESCE($8, cedula_profesional),
            especialidades = COALESCE($9, especialidades),
            formacion_academica = COALESCE($10, formacion_academica),
            experiencia_anios = COALESCE($11, experiencia_anios),
            biografia = COALESCE($12, biografia),
            foto = COALESCE($13, foto),
            updated_date = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(psm_id)
    .bind(&request.nombre)
    .bind(&request.apellido)
    .bind(&request.email)
    .bind(request.fecha_nacimiento)
    .bind(&request.telefono)
    .bind(&request.lugar_residencia)
    .bind(&request.cedula_profesional)
    .bind(&request.especialidades)
    .bind(&request.formacion_academica)
    .bind(request.experiencia_anios)
    .bind(&request.biografia)
    .bind(&request.foto)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| error_reply("Failed to update PSM", AppError::Database(e)))?
    .ok_or_else(|| {
        error_reply(
            "Failed to update PSM",
            AppError::NotFound("PSM not found".to_string()),
        )
    })?;

    Ok(Json(ApiResponse::success(updated)))
}

#[derive(Debug, Serialize)]
pub struct DeletedPsm {
    pub id: Uuid,
}

pub async fn delete_psm(
    State(state): State<AppState>,
    Path(psm_id): Path<Uuid>,
) -> HandlerResult<DeletedPsm> {
    let result = sqlx::query("DELETE FROM psms WHERE id = $1")
        .bind(psm_id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| error_reply("Failed to delete PSM", AppError::Database(e)))?;

    if result.rows_affected() == 0 {
        return Err(error_reply(
            "Failed to delete PSM",
            AppError::NotFound("PSM not found".to_string()),
        ));
    }

    Ok(Json(ApiResponse::success(DeletedPsm { id: psm_id })))
}

// Shared with the dual-write registration flow. Creating the PSM and
// its pending certification is all-or-nothing.
pub(crate) async fn crear_psm(
    pool: &DbPool,
    request: &RegistroPsmRequest,
) -> Result<(Psm, Certificacion), AppError> {
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

    let mut tx = pool.begin().await?;

    let psm = sqlx::query_as::<_, Psm>(
        r#"
        INSERT INTO psms (
            nombre, apellido, email, fecha_nacimiento, telefono, lugar_residencia,
            cedula_profesional, especialidades, formacion_academica,
            experiencia_anios, biografia, owner, wallet, horario_envio
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
        RETURNING *
        "#,
    )
    .bind(nombre)
    .bind(apellido)
    .bind(email)
    .bind(request.fecha_nacimiento)
    .bind(request.telefono.clone().unwrap_or_default())
    .bind(request.lugar_residencia.clone().unwrap_or_default())
    .bind(&request.cedula_profesional)
    .bind(&request.especialidades)
    .bind(&request.formacion_academica)
    .bind(request.experiencia_anios.unwrap_or(0))
    .bind(&request.biografia)
    .bind(&owner)
    .bind(&request.wallet)
    .fetch_one(&mut *tx)
    .await?;

    let certificacion = sqlx::query_as::<_, Certificacion>(
        r#"
        INSERT INTO certificaciones (psm_id, tipo_certificacion, estado, pagado, monto_activacion)
        VALUES ($1, 'cedula_profesional', 'pendiente', FALSE, $2)
        RETURNING *
        "#,
    )
    .bind(psm.id)
    .bind(Decimal::from(65))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Registered PSM {} with pending certification", psm.id);
    Ok((psm, certificacion))
}
