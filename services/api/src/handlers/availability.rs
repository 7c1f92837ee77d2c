use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError};
use motusdao_database::{DbPool, Psm};

use crate::services::availability::{
    es_fecha_pasada, generar_slots, DURACION_SESION, MAX_FECHAS_CONSULTA,
};
use crate::state::AppState;

use super::{error_reply, HandlerResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsmStatus {
    pub activo: bool,
    pub disponible: bool,
    pub certificado: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorarioTrabajo {
    pub start: &'static str,
    pub end: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisponibilidadDia {
    pub psm_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psm_name: Option<String>,
    pub date: String,
    pub available_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_sessions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<HorarioTrabajo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psm_status: Option<PsmStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub psm_id: Option<Uuid>,
    pub date: Option<String>,
}

// Open slots for one PSM on one date
pub async fn day_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityQuery>,
) -> HandlerResult<DisponibilidadDia> {
    let Some(psm_id) = params.psm_id else {
        return Err(error_reply(
            "Failed to fetch availability",
            AppError::Validation("PSM ID is required".to_string()),
        ));
    };

    let Some(date_param) = params.date.as_deref() else {
        return Err(error_reply(
            "Failed to fetch availability",
            AppError::Validation("Date is required (format: YYYY-MM-DD)".to_string()),
        ));
    };

    let fecha = parse_fecha(date_param)
        .map_err(|err| error_reply("Failed to fetch availability", err))?;

    // Booking into the past yields an empty list, not an error.
    if es_fecha_pasada(fecha, Utc::now().date_naive()) {
        return Ok(Json(ApiResponse::with_message(
            DisponibilidadDia {
                psm_id,
                psm_name: None,
                date: date_param.to_string(),
                available_slots: Vec::new(),
                booked_sessions: None,
                next_available_date: None,
                working_hours: None,
                session_duration: None,
                psm_status: None,
            },
            "Cannot book sessions in the past",
        )));
    }

    let psm = fetch_psm(&state.db_pool, psm_id)
        .await
        .map_err(|err| error_reply("Failed to fetch availability", err))?;

    if !(psm.activo && psm.disponible && psm.certificado) {
        return Ok(Json(ApiResponse::with_message(
            DisponibilidadDia {
                psm_id,
                psm_name: Some(format!("{} {}", psm.nombre, psm.apellido)),
                date: date_param.to_string(),
                available_slots: Vec::new(),
                booked_sessions: None,
                next_available_date: None,
                working_hours: None,
                session_duration: None,
                psm_status: Some(PsmStatus {
                    activo: psm.activo,
                    disponible: psm.disponible,
                    certificado: psm.certificado,
                }),
            },
            "This PSM is currently unavailable for bookings",
        )));
    }

    let ocupados = booked_times(&state.db_pool, psm_id, fecha)
        .await
        .map_err(|err| error_reply("Failed to fetch availability", err))?;

    let available_slots = generar_slots(&ocupados);

    let next_available_date = if available_slots.is_empty() {
        Some((fecha + Duration::days(1)).format("%Y-%m-%d").to_string())
    } else {
        None
    };

    let message = if available_slots.is_empty() {
        "No slots available for this date".to_string()
    } else {
        format!("{} slots available", available_slots.len())
    };

    Ok(Json(ApiResponse::with_message(
        DisponibilidadDia {
            psm_id,
            psm_name: Some(format!("{} {}", psm.nombre, psm.apellido)),
            date: date_param.to_string(),
            available_slots,
            booked_sessions: Some(ocupados.len()),
            next_available_date,
            working_hours: Some(HorarioTrabajo {
                start: "09:00",
                end: "20:00",
            }),
            session_duration: Some(DURACION_SESION),
            psm_status: None,
        },
        message,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailabilityRequest {
    pub psm_id: Option<Uuid>,
    pub dates: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisponibilidadFecha {
    pub available_slots: Vec<String>,
    pub has_availability: bool,
    pub slots_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisponibilidadMultiple {
    pub psm_id: Uuid,
    pub psm_name: String,
    pub availability: HashMap<String, DisponibilidadFecha>,
    pub psm_status: PsmStatus,
}

// Open slots across up to fourteen dates in one call
pub async fn bulk_availability(
    State(state): State<AppState>,
    Json(request): Json<BulkAvailabilityRequest>,
) -> HandlerResult<DisponibilidadMultiple> {
    let (Some(psm_id), Some(dates)) = (request.psm_id, request.dates.as_ref()) else {
        return Err(error_reply(
            "Failed to check availability",
            AppError::Validation("PSM ID and dates array are required".to_string()),
        ));
    };

    if dates.len() > MAX_FECHAS_CONSULTA {
        return Err(error_reply(
            "Failed to check availability",
            AppError::Validation("Maximum 14 dates can be checked at once".to_string()),
        ));
    }

    let psm = fetch_psm(&state.db_pool, psm_id)
        .await
        .map_err(|err| error_reply("Failed to check availability", err))?;

    let hoy = Utc::now().date_naive();
    let mut availability = HashMap::new();

    for date_param in dates {
        let slots = match parse_fecha(date_param) {
            Ok(fecha) if !es_fecha_pasada(fecha, hoy) => {
                let ocupados = booked_times(&state.db_pool, psm_id, fecha)
                    .await
                    .map_err(|err| error_reply("Failed to check availability", err))?;
                generar_slots(&ocupados)
            }
            // Past or malformed dates report no availability.
            _ => Vec::new(),
        };

        availability.insert(
            date_param.clone(),
            DisponibilidadFecha {
                has_availability: !slots.is_empty(),
                slots_count: slots.len(),
                available_slots: slots,
            },
        );
    }

    Ok(Json(ApiResponse::success(DisponibilidadMultiple {
        psm_id,
        psm_name: format!("{} {}", psm.nombre, psm.apellido),
        availability,
        psm_status: PsmStatus {
            activo: psm.activo,
            disponible: psm.disponible,
            certificado: psm.certificado,
        },
    })))
}

fn parse_fecha(date_param: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(date_param, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Date is required (format: YYYY-MM-DD)".to_string()))
}

async fn fetch_psm(pool: &DbPool, psm_id: Uuid) -> Result<Psm, AppError> {
    sqlx::query_as::<_, Psm>("SELECT * FROM psms WHERE id = $1")
        .bind(psm_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("PSM not found".to_string()))
}

/// Wall-clock start times of every non-cancelled session that day.
async fn booked_times(
    pool: &DbPool,
    psm_id: Uuid,
    fecha: NaiveDate,
) -> Result<Vec<NaiveTime>, AppError> {
    let inicio = Utc.from_utc_datetime(&fecha.and_hms_opt(0, 0, 0).unwrap_or_default());
    let fin = Utc.from_utc_datetime(
        &fecha
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_default(),
    );

    let sesiones = sqlx::query_as::<_, (chrono::DateTime<Utc>,)>(
        r#"
        SELECT fecha_sesion FROM sesiones
        WHERE psm_id = $1
          AND fecha_sesion >= $2
          AND fecha_sesion <= $3
          AND estado <> 'cancelada'
        ORDER BY fecha_sesion ASC
        "#,
    )
    .bind(psm_id)
    .bind(inicio)
    .bind(fin)
    .fetch_all(pool)
    .await?;

    Ok(sesiones.into_iter().map(|(f,)| f.time()).collect())
}
