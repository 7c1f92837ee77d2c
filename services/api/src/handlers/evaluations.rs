use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{is_unique_violation, ApiResponse, AppError};
use motusdao_database::{DbPool, Evaluacion};

use crate::state::AppState;

use super::sessions::{PsmSesion, UsuarioResumen};
use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationsQuery {
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
    pub sesion_id: Option<Uuid>,
    pub min_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SesionResumen {
    pub id: Uuid,
    pub fecha_sesion: chrono::DateTime<chrono::Utc>,
    pub tipo_sesion: String,
    pub duracion_minutos: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluacionDetalle {
    #[serde(flatten)]
    pub evaluacion: Evaluacion,
    pub sesion: Option<SesionResumen>,
    pub psm: Option<PsmSesion>,
    pub usuario: Option<UsuarioResumen>,
}

// List evaluations, newest first, with session and parties
pub async fn list_evaluations(
    State(state): State<AppState>,
    Query(params): Query<EvaluationsQuery>,
) -> HandlerResult<Vec<EvaluacionDetalle>> {
    match fetch_evaluations(&state.db_pool, &params).await {
        Ok(evaluaciones) => Ok(Json(ApiResponse::success(evaluaciones))),
        Err(err) => Err(error_reply("Failed to fetch evaluations", err)),
    }
}

async fn fetch_evaluations(
    pool: &DbPool,
    params: &EvaluationsQuery,
) -> Result<Vec<EvaluacionDetalle>, AppError> {
    let evaluaciones = sqlx::query_as::<_, Evaluacion>(
        r#"
        SELECT * FROM evaluaciones
        WHERE ($1::uuid IS NULL OR usuario_id = $1)
          AND ($2::uuid IS NULL OR psm_id = $2)
          AND ($3::uuid IS NULL OR sesion_id = $3)
          AND ($4::int IS NULL OR calificacion_psm >= $4)
        ORDER BY created_date DESC
        "#,
    )
    .bind(params.usuario_id)
    .bind(params.psm_id)
    .bind(params.sesion_id)
    .bind(params.min_rating)
    .fetch_all(pool)
    .await?;

    if evaluaciones.is_empty() {
        return Ok(Vec::new());
    }

    let sesion_ids: Vec<Uuid> = evaluaciones.iter().map(|e| e.sesion_id).collect();
    let psm_ids: Vec<Uuid> = evaluaciones.iter().map(|e| e.psm_id).collect();
    let usuario_ids: Vec<Uuid> = evaluaciones.iter().map(|e| e.usuario_id).collect();

    let sesiones: HashMap<Uuid, SesionResumen> = sqlx::query_as::<_, SesionResumen>(
        "SELECT id, fecha_sesion, tipo_sesion, duracion_minutos FROM sesiones WHERE id = ANY($1)",
    )
    .bind(&sesion_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|s| (s.id, s))
    .collect();

    let psms: HashMap<Uuid, PsmSesion> = sqlx::query_as::<_, PsmSesion>(
        "SELECT id, nombre, apellido, especialidades FROM psms WHERE id = ANY($1)",
    )
    .bind(&psm_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

    let usuarios: HashMap<Uuid, UsuarioResumen> = sqlx::query_as::<_, UsuarioResumen>(
        "SELECT id, nombre, apellido, email FROM usuarios WHERE id = ANY($1)",
    )
    .bind(&usuario_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|u| (u.id, u))
    .collect();

    Ok(evaluaciones
        .into_iter()
        .map(|evaluacion| EvaluacionDetalle {
            sesion: sesiones.get(&evaluacion.sesion_id).cloned(),
            psm: psms.get(&evaluacion.psm_id).cloned(),
            usuario: usuarios.get(&evaluacion.usuario_id).cloned(),
            evaluacion,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationRequest {
    pub sesion_id: Option<Uuid>,
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
    pub calificacion_servicio: Option<i32>,
    pub calificacion_psm: Option<i32>,
    pub recomendaria: Option<bool>,
    pub comentario: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluacionCreada {
    #[serde(flatten)]
    pub evaluacion: Evaluacion,
    pub reputation_bonus: i32,
}

// Evaluate a completed session, once
pub async fn create_evaluation(
    State(state): State<AppState>,
    Json(request): Json<CreateEvaluationRequest>,
) -> HandlerResult<EvaluacionCreada> {
    let (
        Some(sesion_id),
        Some(usuario_id),
        Some(psm_id),
        Some(calificacion_servicio),
        Some(calificacion_psm),
        Some(recomendaria),
    ) = (
        request.sesion_id,
        request.usuario_id,
        request.psm_id,
        request.calificacion_servicio,
        request.calificacion_psm,
        request.recomendaria,
    )
    else {
        return Err(error_reply(
            "Failed to create evaluation",
            AppError::Validation(
                "Missing required fields: sesionId, usuarioId, psmId, calificacionServicio, calificacionPsm, recomendaria"
                    .to_string(),
            ),
        ));
    };

    if !(1..=5).contains(&calificacion_servicio) || !(1..=5).contains(&calificacion_psm) {
        return Err(error_reply(
            "Failed to create evaluation",
            AppError::Validation("Ratings must be between 1 and 5".to_string()),
        ));
    }

    let result = crear_evaluacion(
        &state.db_pool,
        sesion_id,
        usuario_id,
        psm_id,
        calificacion_servicio,
        calificacion_psm,
        recomendaria,
        request.comentario.as_deref(),
    )
    .await;

    match result {
        Ok(creada) => Ok(Json(ApiResponse::with_message(
            creada,
            "Thank you for your feedback! Your evaluation helps us improve our services.",
        ))),
        Err(err) => Err(error_reply("Failed to create evaluation", err)),
    }
}

#[allow(clippy::too_many_arguments)]
async fn crear_evaluacion(
    pool: &DbPool,
    sesion_id: Uuid,
    usuario_id: Uuid,
    psm_id: Uuid,
    calificacion_servicio: i32,
    calificacion_psm: i32,
    recomendaria: bool,
    comentario: Option<&str>,
) -> Result<EvaluacionCreada, AppError> {
    let (estado,) = sqlx::query_as::<_, (String,)>("SELECT estado FROM sesiones WHERE id = $1")
        .bind(sesion_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if estado != "completada" {
        return Err(AppError::Validation(
            "Can only evaluate completed sessions".to_string(),
        ));
    }

    // Pre-check first; the unique index on sesion_id still backstops a
    // race between two submissions.
    let ya_evaluada = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM evaluaciones WHERE sesion_id = $1)",
    )
    .bind(sesion_id)
    .fetch_one(pool)
    .await?;

    if ya_evaluada {
        return Err(AppError::Conflict(
            "This session has already been evaluated".to_string(),
        ));
    }

    let reputation_bonus = calificacion_psm * 2;

    let mut tx = pool.begin().await?;

    let evaluacion = sqlx::query_as::<_, Evaluacion>(
        r#"
        INSERT INTO evaluaciones (
            sesion_id, usuario_id, psm_id,
            calificacion_servicio, calificacion_psm, recomendaria, comentario
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(sesion_id)
    .bind(usuario_id)
    .bind(psm_id)
    .bind(calificacion_servicio)
    .bind(calificacion_psm)
    .bind(recomendaria)
    .bind(comentario)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict("This session has already been evaluated".to_string())
        } else {
            AppError::Database(err)
        }
    })?;

    // Each rating point is worth two reputation points.
    sqlx::query(
        "UPDATE psms SET reputacion_puntos = reputacion_puntos + $2, updated_date = NOW() WHERE id = $1",
    )
    .bind(psm_id)
    .bind(reputation_bonus)
    .execute(&mut *tx)
    .await?;

    let (psm_nombre, psm_apellido) =
        sqlx::query_as::<_, (String, String)>("SELECT nombre, apellido FROM psms WHERE id = $1")
            .bind(psm_id)
            .fetch_one(&mut *tx)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO recompensas (receptor_id, tipo_receptor, tipo_recompensa, puntos, descripcion, relacionado_id)
        VALUES ($1, 'usuario', 'evaluacion', 3, $2, $3)
        "#,
    )
    .bind(usuario_id)
    .bind(format!(
        "Evaluation submitted for session with {} {}",
        psm_nombre, psm_apellido
    ))
    .bind(sesion_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(EvaluacionCreada {
        evaluacion,
        reputation_bonus,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummaryRequest {
    pub psm_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumenCalificaciones {
    pub psm_id: Uuid,
    pub average_rating: f64,
    pub average_service_rating: f64,
    pub total_reviews: usize,
    pub recommendation_rate: i64,
}

// Average ratings and recommendation rate for one PSM
pub async fn psm_rating_summary(
    State(state): State<AppState>,
    Json(request): Json<RatingSummaryRequest>,
) -> HandlerResult<ResumenCalificaciones> {
    let Some(psm_id) = request.psm_id else {
        return Err(error_reply(
            "Failed to calculate ratings",
            AppError::Validation("PSM ID is required".to_string()),
        ));
    };

    let filas = sqlx::query_as::<_, (i32, i32, bool)>(
        "SELECT calificacion_psm, calificacion_servicio, recomendaria FROM evaluaciones WHERE psm_id = $1",
    )
    .bind(psm_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| error_reply("Failed to calculate ratings", AppError::Database(e)))?;

    let (average_rating, average_service_rating, recommendation_rate) = resumen(&filas);

    Ok(Json(ApiResponse::success(ResumenCalificaciones {
        psm_id,
        average_rating,
        average_service_rating,
        total_reviews: filas.len(),
        recommendation_rate,
    })))
}

/// Plain arithmetic means (one decimal) plus the rounded percentage of
/// patients who would recommend the PSM. Zeros when nothing exists.
fn resumen(filas: &[(i32, i32, bool)]) -> (f64, f64, i64) {
    if filas.is_empty() {
        return (0.0, 0.0, 0);
    }

    let n = filas.len() as f64;
    let total_psm: i32 = filas.iter().map(|(psm, _, _)| psm).sum();
    let total_servicio: i32 = filas.iter().map(|(_, servicio, _)| servicio).sum();
    let recomendaciones = filas.iter().filter(|(_, _, r)| *r).count() as f64;

    let redondea = |x: f64| (x * 10.0).round() / 10.0;

    (
        redondea(total_psm as f64 / n),
        redondea(total_servicio as f64 / n),
        ((recomendaciones / n) * 100.0).round() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::resumen;

    #[test]
    fn empty_summary_is_all_zeros() {
        assert_eq!(resumen(&[]), (0.0, 0.0, 0));
    }

    #[test]
    fn averages_round_to_one_decimal() {
        // 5, 4, 4 -> 4.333... -> 4.3
        let filas = vec![(5, 3, true), (4, 4, false), (4, 5, true)];
        let (psm, servicio, rate) = resumen(&filas);
        assert_eq!(psm, 4.3);
        assert_eq!(servicio, 4.0);
        assert_eq!(rate, 67);
    }

    #[test]
    fn unanimous_recommendation_is_one_hundred_percent() {
        let filas = vec![(5, 5, true), (5, 5, true)];
        assert_eq!(resumen(&filas), (5.0, 5.0, 100));
    }
}
