use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Assignment preference chosen by a patient during registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferenciaAsignacion {
    Automatica,
    Explorar,
}

impl PreferenciaAsignacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenciaAsignacion::Automatica => "automatica",
            PreferenciaAsignacion::Explorar => "explorar",
        }
    }
}

impl FromStr for PreferenciaAsignacion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatica" => Ok(PreferenciaAsignacion::Automatica),
            "explorar" => Ok(PreferenciaAsignacion::Explorar),
            other => Err(format!("unknown assignment preference: {}", other)),
        }
    }
}

/// Where a patient stands in the therapeutic process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstatusProceso {
    Registrado,
    Encuadre,
    Activo,
    Pausado,
}

impl EstatusProceso {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstatusProceso::Registrado => "registrado",
            EstatusProceso::Encuadre => "encuadre",
            EstatusProceso::Activo => "activo",
            EstatusProceso::Pausado => "pausado",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstadoSesion {
    Programada,
    Completada,
    Cancelada,
}

impl EstadoSesion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoSesion::Programada => "programada",
            EstadoSesion::Completada => "completada",
            EstadoSesion::Cancelada => "cancelada",
        }
    }
}

impl FromStr for EstadoSesion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "programada" => Ok(EstadoSesion::Programada),
            "completada" => Ok(EstadoSesion::Completada),
            "cancelada" => Ok(EstadoSesion::Cancelada),
            other => Err(format!("unknown session state: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstadoCertificacion {
    Pendiente,
    Aprobada,
    Rechazada,
}

impl EstadoCertificacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoCertificacion::Pendiente => "pendiente",
            EstadoCertificacion::Aprobada => "aprobada",
            EstadoCertificacion::Rechazada => "rechazada",
        }
    }
}

impl FromStr for EstadoCertificacion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(EstadoCertificacion::Pendiente),
            "aprobada" => Ok(EstadoCertificacion::Aprobada),
            "rechazada" => Ok(EstadoCertificacion::Rechazada),
            other => Err(format!("unknown certification state: {}", other)),
        }
    }
}

/// Who a ledger entry belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TipoReceptor {
    Usuario,
    Psm,
}

impl TipoReceptor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoReceptor::Usuario => "usuario",
            TipoReceptor::Psm => "psm",
        }
    }
}

impl fmt::Display for TipoReceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            message: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_round_trips_through_strings() {
        assert_eq!(
            "automatica".parse::<PreferenciaAsignacion>().unwrap(),
            PreferenciaAsignacion::Automatica
        );
        assert_eq!(PreferenciaAsignacion::Explorar.as_str(), "explorar");
        assert!("aleatoria".parse::<PreferenciaAsignacion>().is_err());
    }

    #[test]
    fn session_states_parse() {
        for estado in [
            EstadoSesion::Programada,
            EstadoSesion::Completada,
            EstadoSesion::Cancelada,
        ] {
            assert_eq!(estado.as_str().parse::<EstadoSesion>().unwrap(), estado);
        }
    }
}
