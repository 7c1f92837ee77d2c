use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError, EstadoSesion};
use motusdao_database::{DbPool, Evaluacion, Sesion};

use crate::services::commission;
use crate::state::AppState;

use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioResumen {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PsmSesion {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub especialidades: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SesionDetalle {
    #[serde(flatten)]
    pub sesion: Sesion,
    pub usuario: Option<UsuarioResumen>,
    pub psm: Option<PsmSesion>,
    pub evaluacion: Option<Evaluacion>,
}

// List sessions, newest first, with their parties and evaluation
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionsQuery>,
) -> HandlerResult<Vec<SesionDetalle>> {
    match fetch_sessions(&state.db_pool, &params).await {
        Ok(sesiones) => Ok(Json(ApiResponse::success(sesiones))),
        Err(err) => Err(error_reply("Failed to fetch sessions", err)),
    }
}

async fn fetch_sessions(
    pool: &DbPool,
    params: &SessionsQuery,
) -> Result<Vec<SesionDetalle>, AppError> {
    let sesiones = sqlx::query_as::<_, Sesion>(
        r#"
        SELECT * FROM sesiones
        WHERE ($1::uuid IS NULL OR usuario_id = $1)
          AND ($2::uuid IS NULL OR psm_id = $2)
          AND ($3::text IS NULL OR estado = $3)
        ORDER BY fecha_sesion DESC
        "#,
    )
    .bind(params.usuario_id)
    .bind(params.psm_id)
    .bind(&params.estado)
    .fetch_all(pool)
    .await?;

    if sesiones.is_empty() {
        return Ok(Vec::new());
    }

    let usuario_ids: Vec<Uuid> = sesiones.iter().map(|s| s.usuario_id).collect();
    let psm_ids: Vec<Uuid> = sesiones.iter().map(|s| s.psm_id).collect();
    let sesion_ids: Vec<Uuid> = sesiones.iter().map(|s| s.id).collect();

    let usuarios: HashMap<Uuid, UsuarioResumen> = sqlx::query_as::<_, UsuarioResumen>(
        "SELECT id, nombre, apellido, email FROM usuarios WHERE id = ANY($1)",
    )
    .bind(&usuario_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|u| (u.id, u))
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

    let evaluaciones: HashMap<Uuid, Evaluacion> = sqlx::query_as::<_, Evaluacion>(
        "SELECT * FROM evaluaciones WHERE sesion_id = ANY($1)",
    )
    .bind(&sesion_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|e| (e.sesion_id, e))
    .collect();

    Ok(sesiones
        .into_iter()
        .map(|sesion| SesionDetalle {
            usuario: usuarios.get(&sesion.usuario_id).cloned(),
            psm: psms.get(&sesion.psm_id).cloned(),
            evaluacion: evaluaciones.get(&sesion.id).cloned(),
            sesion,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub usuario_id: Option<Uuid>,
    pub psm_id: Option<Uuid>,
    pub fecha_sesion: Option<DateTime<Utc>>,
    pub tipo_sesion: Option<String>,
    pub duracion_minutos: Option<i32>,
    pub monto_cobrado: Option<Decimal>,
    pub metodo_pago: Option<String>,
}

// Book a session; the platform commission is derived from the amount
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> HandlerResult<Sesion> {
    let (Some(usuario_id), Some(psm_id), Some(fecha_sesion)) =
        (request.usuario_id, request.psm_id, request.fecha_sesion)
    else {
        return Err(error_reply(
            "Failed to create session",
            AppError::Validation(
                "Missing required fields: usuarioId, psmId, fechaSesion".to_string(),
            ),
        ));
    };

    match crear_sesion(&state.db_pool, usuario_id, psm_id, fecha_sesion, &request).await {
        Ok(sesion) => Ok(Json(ApiResponse::with_message(
            sesion,
            "Session scheduled successfully",
        ))),
        Err(err) => Err(error_reply("Failed to create session", err)),
    }
}

async fn crear_sesion(
    pool: &DbPool,
    usuario_id: Uuid,
    psm_id: Uuid,
    fecha_sesion: DateTime<Utc>,
    request: &CreateSessionRequest,
) -> Result<Sesion, AppError> {
    let usuario_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM usuarios WHERE id = $1)")
            .bind(usuario_id)
            .fetch_one(pool)
            .await?;
    if !usuario_exists {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let psm_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM psms WHERE id = $1)")
        .bind(psm_id)
        .fetch_one(pool)
        .await?;
    if !psm_exists {
        return Err(AppError::NotFound("PSM not found".to_string()));
    }

    let comision = commission::comision_opcional(request.monto_cobrado);

    let sesion = sqlx::query_as::<_, Sesion>(
        r#"
        INSERT INTO sesiones (
            usuario_id, psm_id, fecha_sesion, tipo_sesion, duracion_minutos,
            monto_cobrado, comision_plataforma, metodo_pago, estado
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'programada')
        RETURNING *
        "#,
    )
    .bind(usuario_id)
    .bind(psm_id)
    .bind(fecha_sesion)
    .bind(request.tipo_sesion.as_deref().unwrap_or("individual"))
    .bind(request.duracion_minutos.unwrap_or(50))
    .bind(request.monto_cobrado)
    .bind(comision)
    .bind(&request.metodo_pago)
    .fetch_one(pool)
    .await?;

    Ok(sesion)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub session_id: Option<Uuid>,
    pub estado: Option<String>,
    pub notas_sesion: Option<String>,
    pub monto_cobrado: Option<Decimal>,
    pub metodo_pago: Option<String>,
}

// Update a session; completing it settles counters and rewards
pub async fn update_session(
    State(state): State<AppState>,
    Json(request): Json<UpdateSessionRequest>,
) -> HandlerResult<Sesion> {
    let Some(session_id) = request.session_id else {
        return Err(error_reply(
            "Failed to update session",
            AppError::Validation("Session ID is required".to_string()),
        ));
    };

    if let Some(estado) = request.estado.as_deref() {
        if estado.parse::<EstadoSesion>().is_err() {
            return Err(error_reply(
                "Failed to update session",
                AppError::Validation(format!("Invalid session state: {}", estado)),
            ));
        }
    }

    match actualizar_sesion(&state.db_pool, session_id, &request).await {
        Ok(sesion) => {
            let message = if sesion.estado == "completada" {
                "Session completed successfully"
            } else {
                "Session updated successfully"
            };
            Ok(Json(ApiResponse::with_message(sesion, message)))
        }
        Err(err) => Err(error_reply("Failed to update session", err)),
    }
}

async fn actualizar_sesion(
    pool: &DbPool,
    session_id: Uuid,
    request: &UpdateSessionRequest,
) -> Result<Sesion, AppError> {
    let anterior = sqlx::query_as::<_, Sesion>("SELECT * FROM sesiones WHERE id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    // Commission follows the charged amount whenever it changes.
    let comision = request.monto_cobrado.map(commission::comision_por_monto);

    let mut tx = pool.begin().await?;

    let actualizada = sqlx::query_as::<_, Sesion>(
        r#"
        UPDATE sesiones SET
            estado = COALESCE($2, estado),
            notas_sesion = COALESCE($3, notas_sesion),
            monto_cobrado = COALESCE($4, monto_cobrado),
            comision_plataforma = COALESCE($5, comision_plataforma),
            metodo_pago = COALESCE($6, metodo_pago),
            updated_date = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(&request.estado)
    .bind(&request.notas_sesion)
    .bind(request.monto_cobrado)
    .bind(comision)
    .bind(&request.metodo_pago)
    .fetch_one(&mut *tx)
    .await?;

    // Counters and rewards settle once, on the transition into
    // 'completada'.
    let completando =
        request.estado.as_deref() == Some("completada") && anterior.estado != "completada";

    if completando {
        let neto = actualizada
            .monto_cobrado
            .map(|monto| monto - actualizada.comision_plataforma)
            .unwrap_or(Decimal::ZERO);

        sqlx::query(
            r#"
            UPDATE psms
            SET total_sesiones = total_sesiones + 1,
                total_ingresos = total_ingresos + $2,
                updated_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(actualizada.psm_id)
        .bind(neto)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE usuarios
            SET sesiones_completadas = sesiones_completadas + 1, updated_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(actualizada.usuario_id)
        .execute(&mut *tx)
        .await?;

        let (usuario_nombre, usuario_apellido) = sqlx::query_as::<_, (String, String)>(
            "SELECT nombre, apellido FROM usuarios WHERE id = $1",
        )
        .bind(actualizada.usuario_id)
        .fetch_one(&mut *tx)
        .await?;

        let (psm_nombre, psm_apellido) =
            sqlx::query_as::<_, (String, String)>("SELECT nombre, apellido FROM psms WHERE id = $1")
                .bind(actualizada.psm_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO recompensas (receptor_id, tipo_receptor, tipo_recompensa, puntos, descripcion, relacionado_id)
            VALUES ($1, 'psm', 'sesion', 10, $2, $3)
            "#,
        )
        .bind(actualizada.psm_id)
        .bind(format!(
            "Session completed with {} {}",
            usuario_nombre, usuario_apellido
        ))
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO recompensas (receptor_id, tipo_receptor, tipo_recompensa, puntos, descripcion, relacionado_id)
            VALUES ($1, 'usuario', 'sesion', 5, $2, $3)
            "#,
        )
        .bind(actualizada.usuario_id)
        .bind(format!(
            "Session attended with {} {}",
            psm_nombre, psm_apellido
        ))
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(actualizada)
}
