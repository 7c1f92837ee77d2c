use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError};
use motusdao_database::{Certificacion, Psm, Usuario};

use crate::services::registration::{mirror_user, OnChainOutcome, RegistrationRole};
use crate::state::AppState;

use super::psms::{crear_psm, RegistroPsmRequest};
use super::users::{upsert_usuario, UpsertUsuarioRequest};
use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    pub role: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub fecha_nacimiento: Option<chrono::NaiveDate>,
    pub telefono: Option<String>,
    pub lugar_residencia: Option<String>,
    pub wallet: Option<String>,
    pub owner: Option<String>,
    // Patient profile
    pub problematica_principal: Option<String>,
    pub tipo_atencion: Option<String>,
    pub preferencia_asignacion: Option<String>,
    // PSM profile
    pub cedula_profesional: Option<String>,
    pub especialidades: Option<Vec<String>>,
    pub formacion_academica: Option<String>,
    pub experiencia_anios: Option<i32>,
    pub biografia: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub role: RegistrationRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuario: Option<Usuario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psm: Option<Psm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificacion: Option<Certificacion>,
    /// Absent when the contract mirror is not configured. A failed
    /// mirror still returns 200: the off-chain record is committed and
    /// the client can retry the chain half later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainOutcome>,
}

// Complete registration: off-chain upsert first, contract mirror after
pub async fn complete_registration(
    State(state): State<AppState>,
    Json(request): Json<CompleteRegistrationRequest>,
) -> HandlerResult<RegistrationResponse> {
    let role = parse_role(request.role.as_deref())
        .map_err(|err| error_reply("Failed to complete registration", err))?;

    // Step (a): the off-chain record. A failure here fails the whole
    // request; nothing has touched the chain yet.
    let (off_chain_id, response) = match role {
        RegistrationRole::Patient => {
            let upsert = UpsertUsuarioRequest {
                nombre: request.nombre.clone(),
                apellido: request.apellido.clone(),
                email: request.email.clone(),
                fecha_nacimiento: request.fecha_nacimiento,
                telefono: request.telefono.clone(),
                lugar_residencia: request.lugar_residencia.clone(),
                problematica_principal: request.problematica_principal.clone(),
                tipo_atencion: request.tipo_atencion.clone(),
                preferencia_asignacion: request.preferencia_asignacion.clone(),
                wallet: request.wallet.clone(),
                owner: request.owner.clone(),
            };

            let usuario = upsert_usuario(&state.db_pool, &upsert)
                .await
                .map_err(|err| error_reply("Failed to complete registration", err))?;

            (
                usuario.id,
                RegistrationResponse {
                    role,
                    usuario: Some(usuario),
                    psm: None,
                    certificacion: None,
                    on_chain: None,
                },
            )
        }
        RegistrationRole::Psm => {
            let registro = RegistroPsmRequest {
                nombre: request.nombre.clone(),
                apellido: request.apellido.clone(),
                email: request.email.clone(),
                fecha_nacimiento: request.fecha_nacimiento,
                telefono: request.telefono.clone(),
                lugar_residencia: request.lugar_residencia.clone(),
                cedula_profesional: request.cedula_profesional.clone(),
                especialidades: request.especialidades.clone().unwrap_or_default(),
                formacion_academica: request.formacion_academica.clone(),
                experiencia_anios: request.experiencia_anios,
                biografia: request.biografia.clone(),
                owner: request.owner.clone(),
                wallet: request.wallet.clone(),
            };

            let (psm, certificacion) = crear_psm(&state.db_pool, &registro)
                .await
                .map_err(|err| error_reply("Failed to complete registration", err))?;

            (
                psm.id,
                RegistrationResponse {
                    role,
                    usuario: None,
                    psm: Some(psm),
                    certificacion: Some(certificacion),
                    on_chain: None,
                },
            )
        }
    };

    // Step (b): best-effort mirror, not transactional with (a).
    let on_chain = match &state.registry {
        Some(registry) => Some(mirror_user(registry, off_chain_id, role).await),
        None => None,
    };

    let message = match &on_chain {
        Some(outcome) if !outcome.success => {
            "Registration saved. On-chain registration failed; you can retry it later."
        }
        Some(_) => "Registration completed on-chain and off-chain.",
        None => "Registration completed.",
    };

    Ok(Json(ApiResponse::with_message(
        RegistrationResponse {
            on_chain,
            ..response
        },
        message,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryChainRequest {
    pub role: Option<String>,
    pub wallet: Option<String>,
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryChainResponse {
    pub off_chain_id: Uuid,
    pub on_chain: OnChainOutcome,
}

// Retry the contract half against an existing off-chain record. The
// contract is the only thing standing between a retry and a duplicate
// entry; this service adds no idempotency key of its own.
pub async fn retry_chain_registration(
    State(state): State<AppState>,
    Json(request): Json<RetryChainRequest>,
) -> HandlerResult<RetryChainResponse> {
    let role = parse_role(request.role.as_deref())
        .map_err(|err| error_reply("Failed to register on-chain", err))?;

    let Some(registry) = &state.registry else {
        return Err(error_reply(
            "Failed to register on-chain",
            AppError::ExternalService("On-chain registration is not configured".to_string()),
        ));
    };

    let off_chain_id = resolve_off_chain_id(&state, role, &request)
        .await
        .map_err(|err| error_reply("Failed to register on-chain", err))?;

    let outcome = mirror_user(registry, off_chain_id, role).await;

    if !outcome.success {
        // The retry endpoint exists for the chain write alone, so its
        // failure is the response, message verbatim from the signer.
        let message = outcome
            .error
            .unwrap_or_else(|| "On-chain registration failed".to_string());
        return Err(error_reply(
            "Failed to register on-chain",
            AppError::ExternalService(message),
        ));
    }

    Ok(Json(ApiResponse::with_message(
        RetryChainResponse {
            off_chain_id,
            on_chain: outcome,
        },
        "On-chain registration submitted",
    )))
}

fn parse_role(role: Option<&str>) -> Result<RegistrationRole, AppError> {
    role.ok_or_else(|| AppError::Validation("Missing required field: role".to_string()))?
        .parse::<RegistrationRole>()
        .map_err(AppError::Validation)
}

async fn resolve_off_chain_id(
    state: &AppState,
    role: RegistrationRole,
    request: &RetryChainRequest,
) -> Result<Uuid, AppError> {
    let (table, id_param) = match role {
        RegistrationRole::Patient => ("usuarios", request.usuario_id),
        RegistrationRole::Psm => ("psms", request.psm_id),
    };

    if let Some(id) = id_param {
        let sql = format!("SELECT id FROM {} WHERE id = $1", table);
        return sqlx::query_as::<_, (Uuid,)>(&sql)
            .bind(id)
            .fetch_optional(&state.db_pool)
            .await?
            .map(|(id,)| id)
            .ok_or_else(|| AppError::NotFound("No off-chain registration found".to_string()));
    }

    let Some(wallet) = request.wallet.as_deref() else {
        return Err(AppError::Validation(
            "Either an id or a wallet is required".to_string(),
        ));
    };

    let sql = format!("SELECT id FROM {} WHERE wallet = $1", table);
    sqlx::query_as::<_, (Uuid,)>(&sql)
        .bind(wallet)
        .fetch_optional(&state.db_pool)
        .await?
        .map(|(id,)| id)
        .ok_or_else(|| AppError::NotFound("No off-chain registration found".to_string()))
}
