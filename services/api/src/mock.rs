//! Canned payloads served for list reads when the database is
//! unreachable and `USE_MOCK_DATA` is set. Development convenience
//! only; the shapes match the real responses.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use motusdao_database::{Psm, Usuario};

use crate::handlers::users::UsuarioDetalle;

pub fn usuarios() -> Vec<UsuarioDetalle> {
    vec![UsuarioDetalle {
        usuario: Usuario {
            id: Uuid::from_u128(1),
            nombre: "Ana".to_string(),
            apellido: "García".to_string(),
            email: "ana@example.com".to_string(),
            fecha_nacimiento: NaiveDate::from_ymd_opt(1990, 5, 15),
            telefono: "+52 555 123 4567".to_string(),
            lugar_residencia: "Mexico City".to_string(),
            problematica_principal: Some("Dealing with anxiety and stress".to_string()),
            tipo_atencion: Some("Ansiedad".to_string()),
            preferencia_asignacion: "automatica".to_string(),
            estatus_proceso: "registrado".to_string(),
            sesiones_completadas: 0,
            wallet: None,
            owner: Some("ana@example.com".to_string()),
            horario_envio: None,
            current_psm_id: None,
            created_date: Utc::now(),
            updated_date: Utc::now(),
        },
        current_psm: None,
    }]
}

pub fn psms() -> Vec<Psm> {
    vec![Psm {
        id: Uuid::from_u128(2),
        nombre: "Dr. Carlos".to_string(),
        apellido: "Rodriguez".to_string(),
        email: "carlos@example.com".to_string(),
        fecha_nacimiento: NaiveDate::from_ymd_opt(1985, 3, 20),
        telefono: "+52 555 987 6543".to_string(),
        lugar_residencia: "Guadalajara".to_string(),
        cedula_profesional: Some("12345678".to_string()),
        especialidades: vec![
            "Ansiedad".to_string(),
            "Depresión".to_string(),
            "Terapia Cognitivo-Conductual".to_string(),
        ],
        formacion_academica: Some(
            "PhD in Clinical Psychology, Universidad Nacional".to_string(),
        ),
        experiencia_anios: 10,
        biografia: Some(
            "Experienced therapist specializing in cognitive behavioral therapy".to_string(),
        ),
        foto: None,
        certificado: true,
        activo: true,
        disponible: true,
        reputacion_puntos: 150,
        total_sesiones: 45,
        total_ingresos: Decimal::from(1500),
        estatus_pago: Some("pagado".to_string()),
        fecha_certificacion: None,
        owner: Some("carlos@example.com".to_string()),
        wallet: None,
        horario_envio: None,
        created_date: Utc::now(),
        updated_date: Utc::now(),
    }]
}
