use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError, EstadoCertificacion};
use motusdao_database::{Certificacion, DbPool};

use crate::state::AppState;

use super::{error_reply, HandlerResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationsQuery {
    pub psm_id: Option<Uuid>,
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PsmCertificacion {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub cedula_profesional: Option<String>,
    pub especialidades: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificacionDetalle {
    #[serde(flatten)]
    pub certificacion: Certificacion,
    pub psm: Option<PsmCertificacion>,
}

// List certifications, newest first, with their PSM
pub async fn list_certifications(
    State(state): State<AppState>,
    Query(params): Query<CertificationsQuery>,
) -> HandlerResult<Vec<CertificacionDetalle>> {
    match fetch_certifications(&state.db_pool, &params).await {
        Ok(certificaciones) => Ok(Json(ApiResponse::success(certificaciones))),
        Err(err) => Err(error_reply("Failed to fetch certifications", err)),
    }
}

async fn fetch_certifications(
    pool: &DbPool,
    params: &CertificationsQuery,
) -> Result<Vec<CertificacionDetalle>, AppError> {
    let certificaciones = sqlx::query_as::<_, Certificacion>(
        r#"
        SELECT * FROM certificaciones
        WHERE ($1::uuid IS NULL OR psm_id = $1)
          AND ($2::text IS NULL OR estado = $2)
        ORDER BY created_date DESC
        "#,
    )
    .bind(params.psm_id)
    .bind(&params.estado)
    .fetch_all(pool)
    .await?;

    if certificaciones.is_empty() {
        return Ok(Vec::new());
    }

    let psm_ids: Vec<Uuid> = certificaciones.iter().map(|c| c.psm_id).collect();
    let psms: HashMap<Uuid, PsmCertificacion> = sqlx::query_as::<_, PsmCertificacion>(
        r#"
        SELECT id, nombre, apellido, email, cedula_profesional, especialidades
        FROM psms WHERE id = ANY($1)
        "#,
    )
    .bind(&psm_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

    Ok(certificaciones
        .into_iter()
        .map(|certificacion| CertificacionDetalle {
            psm: psms.get(&certificacion.psm_id).cloned(),
            certificacion,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCertificationRequest {
    pub psm_id: Option<Uuid>,
    pub tipo_certificacion: Option<String>,
    pub documento_url: Option<String>,
    pub monto_activacion: Option<Decimal>,
}

// Submit certification documents; review starts as 'pendiente'
pub async fn submit_certification(
    State(state): State<AppState>,
    Json(request): Json<SubmitCertificationRequest>,
) -> HandlerResult<Certificacion> {
    let (Some(psm_id), Some(tipo), Some(documento_url)) = (
        request.psm_id,
        request.tipo_certificacion.as_deref(),
        request.documento_url.as_deref(),
    ) else {
        return Err(error_reply(
            "Failed to create certification",
            AppError::Validation(
                "Missing required fields: psmId, tipoCertificacion, documentoUrl".to_string(),
            ),
        ));
    };

    let result = async {
        let psm_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM psms WHERE id = $1)")
                .bind(psm_id)
                .fetch_one(&state.db_pool)
                .await?;
        if !psm_exists {
            return Err(AppError::NotFound("PSM not found".to_string()));
        }

        let certificacion = sqlx::query_as::<_, Certificacion>(
            r#"
            INSERT INTO certificaciones (psm_id, tipo_certificacion, documento_url, estado, pagado, monto_activacion)
            VALUES ($1, $2, $3, 'pendiente', FALSE, $4)
            RETURNING *
            "#,
        )
        .bind(psm_id)
        .bind(tipo)
        .bind(documento_url)
        .bind(request.monto_activacion.unwrap_or_else(|| Decimal::from(65)))
        .fetch_one(&state.db_pool)
        .await?;

        Ok(certificacion)
    }
    .await;

    match result {
        Ok(certificacion) => Ok(Json(ApiResponse::with_message(
            certificacion,
            "Certification documents uploaded successfully. Review process initiated.",
        ))),
        Err(err) => Err(error_reply("Failed to create certification", err)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCertificationRequest {
    pub certification_id: Option<Uuid>,
    pub estado: Option<String>,
    pub pagado: Option<bool>,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificacionActualizada {
    #[serde(flatten)]
    pub certificacion: Certificacion,
    pub psm_activated: bool,
}

// Review a certification; approval + payment activates the PSM
pub async fn update_certification(
    State(state): State<AppState>,
    Json(request): Json<UpdateCertificationRequest>,
) -> HandlerResult<CertificacionActualizada> {
    let Some(certification_id) = request.certification_id else {
        return Err(error_reply(
            "Failed to update certification",
            AppError::Validation("Certification ID is required".to_string()),
        ));
    };

    if let Some(estado) = request.estado.as_deref() {
        if estado.parse::<EstadoCertificacion>().is_err() {
            return Err(error_reply(
                "Failed to update certification",
                AppError::Validation(format!("Invalid certification state: {}", estado)),
            ));
        }
    }

    let result = async {
        let certificacion = sqlx::query_as::<_, Certificacion>(
            r#"
            UPDATE certificaciones SET
                estado = COALESCE($2, estado),
                pagado = COALESCE($3, pagado),
                fecha_pago = COALESCE($4, fecha_pago),
                fecha_vencimiento = COALESCE($5, fecha_vencimiento),
                updated_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(certification_id)
        .bind(&request.estado)
        .bind(request.pagado)
        .bind(request.fecha_pago)
        .bind(request.fecha_vencimiento)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Certification not found".to_string()))?;

        // Activation condition, checked here and again at the payment
        // endpoint: approved review plus settled payment.
        let psm_activated = if certificacion.estado == "aprobada" && certificacion.pagado {
            activate_psm(&state.db_pool, certificacion.psm_id, certification_id).await?
        } else {
            false
        };

        Ok(CertificacionActualizada {
            certificacion,
            psm_activated,
        })
    }
    .await;

    match result {
        Ok(actualizada) => {
            let message = if actualizada.psm_activated
                || (actualizada.certificacion.estado == "aprobada" && actualizada.certificacion.pagado)
            {
                "PSM certified and activated successfully!"
            } else {
                "Certification updated successfully"
            };
            Ok(Json(ApiResponse::with_message(actualizada, message)))
        }
        Err(err) => Err(error_reply("Failed to update certification", err)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub certification_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub amount: Option<Decimal>,
}

// Record the activation payment; an approved review activates the PSM
pub async fn record_payment(
    State(state): State<AppState>,
    Json(request): Json<RecordPaymentRequest>,
) -> HandlerResult<CertificacionActualizada> {
    let (Some(certification_id), Some(_payment_method), Some(_amount)) = (
        request.certification_id,
        request.payment_method.as_deref(),
        request.amount,
    ) else {
        return Err(error_reply(
            "Failed to process payment",
            AppError::Validation("Missing required payment fields".to_string()),
        ));
    };

    let result = async {
        let certificacion = sqlx::query_as::<_, Certificacion>(
            r#"
            UPDATE certificaciones
            SET pagado = TRUE, fecha_pago = NOW(), updated_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(certification_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Certification not found".to_string()))?;

        // Same activation condition as the review endpoint, on purpose.
        let psm_activated = if certificacion.estado == "aprobada" && certificacion.pagado {
            activate_psm(&state.db_pool, certificacion.psm_id, certification_id).await?
        } else {
            false
        };

        Ok(CertificacionActualizada {
            certificacion,
            psm_activated,
        })
    }
    .await;

    match result {
        Ok(actualizada) => {
            let message = if actualizada.certificacion.estado == "aprobada" {
                "Payment processed successfully. PSM is now active and can receive patients!"
            } else {
                "Payment processed successfully. Pending document review for activation."
            };
            Ok(Json(ApiResponse::with_message(actualizada, message)))
        }
        Err(err) => Err(error_reply("Failed to process payment", err)),
    }
}

/// Flip the PSM live and append the welcome reward. The reward is
/// keyed to the activation transition: a PSM that is already
/// `certificado` gets its flags refreshed but no second reward, no
/// matter which endpoint ran the activation condition first.
async fn activate_psm(
    pool: &DbPool,
    psm_id: Uuid,
    certification_id: Uuid,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let (ya_certificado,) = sqlx::query_as::<_, (bool,)>(
        "SELECT certificado FROM psms WHERE id = $1 FOR UPDATE",
    )
    .bind(psm_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("PSM not found".to_string()))?;

    sqlx::query(
        r#"
        UPDATE psms
        SET certificado = TRUE,
            activo = TRUE,
            disponible = TRUE,
            fecha_certificacion = NOW(),
            estatus_pago = 'pagado',
            updated_date = NOW()
        WHERE id = $1
        "#,
    )
    .bind(psm_id)
    .execute(&mut *tx)
    .await?;

    if !ya_certificado {
        sqlx::query(
            r#"
            INSERT INTO recompensas (receptor_id, tipo_receptor, tipo_recompensa, puntos, descripcion, relacionado_id)
            VALUES ($1, 'psm', 'certificacion', 50, 'Welcome to MotusDAO! Certification completed successfully.', $2)
            "#,
        )
        .bind(psm_id)
        .bind(certification_id)
        .execute(&mut *tx)
        .await?;

        tracing::info!("PSM {} activated by certification {}", psm_id, certification_id);
    }

    tx.commit().await?;

    Ok(!ya_certificado)
}
