use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError, PreferenciaAsignacion};
use motusdao_database::{Psm, Sesion, Usuario};

use crate::services::matching;
use crate::services::registration::{mirror_assignment, OnChainOutcome};
use crate::state::AppState;

use super::users::{fetch_usuario, PsmResumen};
use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsQuery {
    pub usuario_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsmRecomendado {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub especialidades: Vec<String>,
    pub biografia: Option<String>,
    pub foto: Option<String>,
    pub reputacion_puntos: i32,
    pub total_sesiones: i32,
    pub experiencia_anios: i32,
}

impl From<Psm> for PsmRecomendado {
    fn from(psm: Psm) -> Self {
        Self {
            id: psm.id,
            nombre: psm.nombre,
            apellido: psm.apellido,
            especialidades: psm.especialidades,
            biografia: psm.biografia,
            foto: psm.foto,
            reputacion_puntos: psm.reputacion_puntos,
            total_sesiones: psm.total_sesiones,
            experiencia_anios: psm.experiencia_anios,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioAsignacion {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub preferencia_asignacion: String,
    pub current_psm: Option<PsmResumen>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomendacionesResponse {
    pub usuario: UsuarioAsignacion,
    pub recommended_psms: Vec<PsmRecomendado>,
}

// PSM recommendations for a patient, per their assignment preference
pub async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationsQuery>,
) -> HandlerResult<RecomendacionesResponse> {
    let Some(usuario_id) = params.usuario_id else {
        return Err(error_reply(
            "Failed to fetch PSM recommendations",
            AppError::Validation("Usuario ID is required".to_string()),
        ));
    };

    let usuario = fetch_usuario(&state.db_pool, usuario_id)
        .await
        .map_err(|err| error_reply("Failed to fetch PSM recommendations", err))?;

    // Unknown preference strings fall back to automatic matching.
    let preferencia = usuario
        .preferencia_asignacion
        .parse::<PreferenciaAsignacion>()
        .unwrap_or(PreferenciaAsignacion::Automatica);

    // Base order is deterministic; ties in the ranking keep it.
    let candidatos = sqlx::query_as::<_, Psm>(
        r#"
        SELECT * FROM psms
        WHERE activo = TRUE AND disponible = TRUE AND certificado = TRUE
        ORDER BY created_date DESC
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| error_reply("Failed to fetch PSM recommendations", AppError::Database(e)))?;

    let recomendados = matching::recomendar(
        candidatos,
        preferencia,
        usuario.tipo_atencion.as_deref(),
    );

    let current_psm = match usuario.current_psm_id {
        Some(psm_id) => sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = $1")
            .bind(psm_id)
            .fetch_optional(&state.db_pool)
            .await
            .map_err(|e| error_reply("Failed to fetch PSM recommendations", AppError::Database(e)))?
            .map(PsmResumen::from),
        None => None,
    };

    let message = match preferencia {
        PreferenciaAsignacion::Automatica => "Showing PSMs matched to your therapeutic needs",
        PreferenciaAsignacion::Explorar => {
            "Explore available PSMs and choose who feels right for you"
        }
    };

    Ok(Json(ApiResponse::with_message(
        RecomendacionesResponse {
            usuario: UsuarioAsignacion {
                id: usuario.id,
                nombre: usuario.nombre,
                apellido: usuario.apellido,
                preferencia_asignacion: usuario.preferencia_asignacion,
                current_psm,
            },
            recommended_psms: recomendados.into_iter().map(PsmRecomendado::from).collect(),
        },
        message,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub usuario: Usuario,
    pub psm: PsmResumen,
    pub framing_session: Sesion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainOutcome>,
}

// Assign a PSM to a patient and schedule the framing session
pub async fn create_assignment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssignmentRequest>,
) -> HandlerResult<AssignmentResponse> {
    let (Some(usuario_id), Some(psm_id)) = (request.usuario_id, request.psm_id) else {
        return Err(error_reply(
            "Failed to create assignment",
            AppError::Validation("Missing required fields: usuarioId, psmId".to_string()),
        ));
    };

    let psm = sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = $1")
        .bind(psm_id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| error_reply("Failed to create assignment", AppError::Database(e)))?
        .ok_or_else(|| {
            error_reply(
                "Failed to create assignment",
                AppError::NotFound("PSM not found".to_string()),
            )
        })?;

    if !matching::es_elegible(&psm) {
        return Err(error_reply(
            "Failed to create assignment",
            AppError::Validation("PSM is not available for new patients".to_string()),
        ));
    }

    match crear_asignacion(&state, usuario_id, psm_id, &psm).await {
        Ok(response) => {
            let message = format!(
                "Successfully assigned to {} {}. Framing session scheduled.",
                psm.nombre, psm.apellido
            );
            Ok(Json(ApiResponse::with_message(response, message)))
        }
        Err(err) => Err(error_reply("Failed to create assignment", err)),
    }
}

async fn crear_asignacion(
    state: &AppState,
    usuario_id: Uuid,
    psm_id: Uuid,
    psm: &Psm,
) -> Result<AssignmentResponse, AppError> {
    // All-or-nothing: the patient update, the framing session, and the
    // PSM's assignment reward commit together.
    let mut tx = state.db_pool.begin().await?;

    let usuario = sqlx::query_as::<_, Usuario>(
        r#"
        UPDATE usuarios
        SET current_psm_id = $2, estatus_proceso = 'encuadre', updated_date = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(usuario_id)
    .bind(psm_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let fecha_encuadre = Utc::now() + Duration::hours(24);
    let framing_session = sqlx::query_as::<_, Sesion>(
        r#"
        INSERT INTO sesiones (usuario_id, psm_id, fecha_sesion, tipo_sesion, duracion_minutos, estado)
        VALUES ($1, $2, $3, 'encuadre', 50, 'programada')
        RETURNING *
        "#,
    )
    .bind(usuario_id)
    .bind(psm_id)
    .bind(fecha_encuadre)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO recompensas (receptor_id, tipo_receptor, tipo_recompensa, puntos, descripcion, relacionado_id)
        VALUES ($1, 'psm', 'asignacion', 5, $2, $3)
        "#,
    )
    .bind(psm_id)
    .bind(format!(
        "New patient assigned: {} {}",
        usuario.nombre, usuario.apellido
    ))
    .bind(usuario_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    // The mirror runs after the commit on purpose: a chain failure is
    // reported but never rolls the assignment back.
    let on_chain = match &state.registry {
        Some(registry) if usuario.wallet.is_some() && psm.wallet.is_some() => {
            Some(mirror_assignment(registry, &usuario, psm).await)
        }
        _ => None,
    };

    Ok(AssignmentResponse {
        usuario,
        psm: PsmResumen::from(psm.clone()),
        framing_session,
        on_chain,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProcessRequest {
    pub usuario_id: Option<Uuid>,
    pub action: Option<String>,
}

// Pause, resume, or restart the matching process
pub async fn update_process(
    State(state): State<AppState>,
    Json(request): Json<UpdateProcessRequest>,
) -> HandlerResult<Usuario> {
    let (Some(usuario_id), Some(action)) = (request.usuario_id, request.action.as_deref()) else {
        return Err(error_reply(
            "Failed to update assignment",
            AppError::Validation("Missing required fields: usuarioId, action".to_string()),
        ));
    };

    let result = match action {
        "change_psm" => {
            sqlx::query_as::<_, Usuario>(
                r#"
                UPDATE usuarios
                SET current_psm_id = NULL, estatus_proceso = 'registrado', updated_date = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(usuario_id)
            .fetch_optional(&state.db_pool)
            .await
        }
        "pause_process" => set_estatus(&state, usuario_id, "pausado").await,
        "resume_process" => set_estatus(&state, usuario_id, "activo").await,
        _ => {
            return Err(error_reply(
                "Failed to update assignment",
                AppError::Validation("Invalid action".to_string()),
            ))
        }
    };

    let usuario = result
        .map_err(|e| error_reply("Failed to update assignment", AppError::Database(e)))?
        .ok_or_else(|| {
            error_reply(
                "Failed to update assignment",
                AppError::NotFound("User not found".to_string()),
            )
        })?;

    let message = format!("Process {} completed successfully", action.replace('_', " "));
    Ok(Json(ApiResponse::with_message(usuario, message)))
}

async fn set_estatus(
    state: &AppState,
    usuario_id: Uuid,
    estatus: &str,
) -> Result<Option<Usuario>, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(
        "UPDATE usuarios SET estatus_proceso = $2, updated_date = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(usuario_id)
    .bind(estatus)
    .fetch_optional(&state.db_pool)
    .await
}
