use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A patient. `estatus_proceso` and `preferencia_asignacion` carry the
/// string states defined in `motusdao_common::types`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub lugar_residencia: String,
    pub problematica_principal: Option<String>,
    pub tipo_atencion: Option<String>,
    pub preferencia_asignacion: String,
    pub estatus_proceso: String,
    pub sesiones_completadas: i32,
    pub wallet: Option<String>,
    pub owner: Option<String>,
    pub horario_envio: Option<DateTime<Utc>>,
    pub current_psm_id: Option<Uuid>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// A mental-health professional. Only becomes bookable once
/// `activo`, `disponible` and `certificado` are all true.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Psm {
    pub id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub lugar_residencia: String,
    pub cedula_profesional: Option<String>,
    pub especialidades: Vec<String>,
    pub formacion_academica: Option<String>,
    pub experiencia_anios: i32,
    pub biografia: Option<String>,
    pub foto: Option<String>,
    pub certificado: bool,
    pub activo: bool,
    pub disponible: bool,
    pub reputacion_puntos: i32,
    pub total_sesiones: i32,
    pub total_ingresos: Decimal,
    pub estatus_pago: Option<String>,
    pub fecha_certificacion: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub wallet: Option<String>,
    pub horario_envio: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certificacion {
    pub id: Uuid,
    pub psm_id: Uuid,
    pub tipo_certificacion: String,
    pub documento_url: Option<String>,
    pub estado: String,
    pub pagado: bool,
    pub monto_activacion: Decimal,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sesion {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub psm_id: Uuid,
    pub fecha_sesion: DateTime<Utc>,
    pub tipo_sesion: String,
    pub duracion_minutos: i32,
    pub monto_cobrado: Option<Decimal>,
    pub comision_plataforma: Decimal,
    pub metodo_pago: Option<String>,
    pub estado: String,
    pub notas_sesion: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// One evaluation per completed session, enforced by a unique index on
/// `sesion_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Evaluacion {
    pub id: Uuid,
    pub sesion_id: Uuid,
    pub usuario_id: Uuid,
    pub psm_id: Uuid,
    pub calificacion_servicio: i32,
    pub calificacion_psm: i32,
    pub recomendaria: bool,
    pub comentario: Option<String>,
    pub created_date: DateTime<Utc>,
}

/// Append-only ledger entry. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recompensa {
    pub id: Uuid,
    pub receptor_id: Uuid,
    pub tipo_receptor: String,
    pub tipo_recompensa: String,
    pub puntos: i32,
    pub descripcion: String,
    pub relacionado_id: Option<Uuid>,
    pub created_date: DateTime<Utc>,
}
