use motusdao_common::PreferenciaAsignacion;
use motusdao_database::Psm;

/// Automatic matching returns a short list; explore mode a longer one.
pub const MAX_AUTOMATICA: usize = 5;
pub const MAX_EXPLORAR: usize = 10;

/// Rank eligible PSMs for a patient. Candidates are expected to be
/// pre-filtered to `activo && disponible && certificado` and arrive in
/// a deterministic base order; the sort is stable, so candidates tied
/// on every key keep that order.
///
/// `automatica` narrows to the patient's attention type (when set) and
/// ranks by reputation, then completed sessions, then years of
/// experience, keeping the top five. `explorar` skips the specialty
/// filter, ranks by reputation and sessions only, and keeps ten.
pub fn recomendar(
    mut candidatos: Vec<Psm>,
    preferencia: PreferenciaAsignacion,
    tipo_atencion: Option<&str>,
) -> Vec<Psm> {
    match preferencia {
        PreferenciaAsignacion::Automatica => {
            if let Some(tipo) = tipo_atencion {
                candidatos.retain(|psm| psm.especialidades.iter().any(|e| e == tipo));
            }
            candidatos.sort_by(|a, b| {
                b.reputacion_puntos
                    .cmp(&a.reputacion_puntos)
                    .then(b.total_sesiones.cmp(&a.total_sesiones))
                    .then(b.experiencia_anios.cmp(&a.experiencia_anios))
            });
            candidatos.truncate(MAX_AUTOMATICA);
        }
        PreferenciaAsignacion::Explorar => {
            candidatos.sort_by(|a, b| {
                b.reputacion_puntos
                    .cmp(&a.reputacion_puntos)
                    .then(b.total_sesiones.cmp(&a.total_sesiones))
            });
            candidatos.truncate(MAX_EXPLORAR);
        }
    }
    candidatos
}

/// A PSM can take new patients only with all three flags set.
pub fn es_elegible(psm: &Psm) -> bool {
    psm.activo && psm.disponible && psm.certificado
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn psm(
        nombre: &str,
        especialidades: &[&str],
        reputacion: i32,
        sesiones: i32,
        experiencia: i32,
    ) -> Psm {
        Psm {
            id: Uuid::new_v4(),
            nombre: nombre.to_string(),
            apellido: "Test".to_string(),
            email: format!("{}@example.com", nombre),
            fecha_nacimiento: None,
            telefono: String::new(),
            lugar_residencia: String::new(),
            cedula_profesional: None,
            especialidades: especialidades.iter().map(|s| s.to_string()).collect(),
            formacion_academica: None,
            experiencia_anios: experiencia,
            biografia: None,
            foto: None,
            certificado: true,
            activo: true,
            disponible: true,
            reputacion_puntos: reputacion,
            total_sesiones: sesiones,
            total_ingresos: Decimal::ZERO,
            estatus_pago: None,
            fecha_certificacion: None,
            owner: None,
            wallet: None,
            horario_envio: None,
            created_date: Utc::now(),
            updated_date: Utc::now(),
        }
    }

    #[test]
    fn automatic_matching_filters_by_specialty() {
        let candidatos = vec![
            psm("ansiedad", &["Ansiedad"], 10, 5, 3),
            psm("depresion", &["Depresión"], 100, 50, 10),
        ];

        let resultado = recomendar(
            candidatos,
            PreferenciaAsignacion::Automatica,
            Some("Ansiedad"),
        );

        assert_eq!(resultado.len(), 1);
        assert_eq!(resultado[0].nombre, "ansiedad");
    }

    #[test]
    fn automatic_matching_ranks_by_reputation_then_sessions_then_experience() {
        let candidatos = vec![
            psm("c", &["Ansiedad"], 50, 10, 2),
            psm("a", &["Ansiedad"], 90, 10, 2),
            psm("b", &["Ansiedad"], 90, 20, 2),
            psm("d", &["Ansiedad"], 90, 20, 8),
        ];

        let resultado = recomendar(
            candidatos,
            PreferenciaAsignacion::Automatica,
            Some("Ansiedad"),
        );

        let nombres: Vec<&str> = resultado.iter().map(|p| p.nombre.as_str()).collect();
        assert_eq!(nombres, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn automatic_matching_keeps_at_most_five() {
        let candidatos: Vec<Psm> = (0..8)
            .map(|i| psm(&format!("p{}", i), &["Ansiedad"], i, 0, 0))
            .collect();

        let resultado = recomendar(candidatos, PreferenciaAsignacion::Automatica, None);
        assert_eq!(resultado.len(), 5);
        assert_eq!(resultado[0].reputacion_puntos, 7);
    }

    #[test]
    fn explore_mode_ignores_specialty_and_keeps_ten() {
        let candidatos: Vec<Psm> = (0..12)
            .map(|i| psm(&format!("p{}", i), &["Depresión"], i, 0, 0))
            .collect();

        // tipo_atencion is irrelevant in explore mode
        let resultado = recomendar(
            candidatos,
            PreferenciaAsignacion::Explorar,
            Some("Ansiedad"),
        );
        assert_eq!(resultado.len(), 10);
        assert_eq!(resultado[0].reputacion_puntos, 11);
    }

    #[test]
    fn ties_keep_the_stable_input_order() {
        let mut primero = psm("primero", &[], 10, 10, 10);
        let mut segundo = psm("segundo", &[], 10, 10, 10);
        primero.id = Uuid::from_u128(1);
        segundo.id = Uuid::from_u128(2);

        let resultado = recomendar(
            vec![primero.clone(), segundo.clone()],
            PreferenciaAsignacion::Explorar,
            None,
        );
        assert_eq!(resultado[0].id, primero.id);
        assert_eq!(resultado[1].id, segundo.id);
    }

    #[test]
    fn eligibility_requires_all_three_flags() {
        let mut candidato = psm("x", &[], 0, 0, 0);
        assert!(es_elegible(&candidato));
        candidato.disponible = false;
        assert!(!es_elegible(&candidato));
    }
}
