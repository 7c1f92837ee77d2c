use chrono::{NaiveDate, NaiveTime};

/// Bookable window: sessions start between 09:00 and 19:00, on the
/// hour and on the half hour (50-minute sessions, 10-minute breaks).
pub const HORA_INICIO: u32 = 9;
pub const HORA_FIN: u32 = 20;

/// Fixed session length in minutes.
pub const DURACION_SESION: i32 = 50;

/// Bulk availability queries are capped per call.
pub const MAX_FECHAS_CONSULTA: usize = 14;

/// Generate the open slots for one day as wall-clock "HH:MM" strings,
/// removing every slot whose start coincides to the minute with a
/// booked session. A session starting off-grid (e.g. 09:15) blocks no
/// slot even though its duration overlaps — exact-minute matching is
/// the contract here.
pub fn generar_slots(ocupados: &[NaiveTime]) -> Vec<String> {
    let mut slots = Vec::new();
    for hora in HORA_INICIO..HORA_FIN {
        slots.push(format!("{:02}:00", hora));
        if hora < HORA_FIN - 1 {
            slots.push(format!("{:02}:30", hora));
        }
    }

    let reservados: Vec<String> = ocupados
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();

    slots.retain(|slot| !reservados.contains(slot));
    slots
}

/// Booking into the past is silently empty rather than an error.
pub fn es_fecha_pasada(fecha: NaiveDate, hoy: NaiveDate) -> bool {
    fecha < hoy
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn full_day_has_twenty_one_slots() {
        let slots = generar_slots(&[]);
        assert_eq!(slots.len(), 21);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("19:00"));
        // The grid stops adding half-hour slots before the last hour.
        assert!(!slots.contains(&"19:30".to_string()));
        assert!(!slots.contains(&"20:00".to_string()));
    }

    #[test]
    fn booked_slot_is_excluded() {
        let slots = generar_slots(&[t(9, 0)]);
        assert!(!slots.contains(&"09:00".to_string()));
        assert!(slots.contains(&"09:30".to_string()));
        assert_eq!(slots.len(), 20);
    }

    #[test]
    fn off_grid_session_blocks_nothing() {
        // A 09:15 session overlaps 09:00 and 09:30 in duration, but
        // only exact-minute matches are removed.
        let slots = generar_slots(&[t(9, 15)]);
        assert_eq!(slots.len(), 21);
        assert!(slots.contains(&"09:00".to_string()));
        assert!(slots.contains(&"09:30".to_string()));
    }

    #[test]
    fn fully_booked_day_is_empty() {
        let todos: Vec<NaiveTime> = (HORA_INICIO..HORA_FIN)
            .flat_map(|h| {
                if h < HORA_FIN - 1 {
                    vec![t(h, 0), t(h, 30)]
                } else {
                    vec![t(h, 0)]
                }
            })
            .collect();
        assert!(generar_slots(&todos).is_empty());
    }

    #[test]
    fn past_date_detection() {
        let hoy = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(es_fecha_pasada(
            NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            hoy
        ));
        assert!(!es_fecha_pasada(hoy, hoy));
        assert!(!es_fecha_pasada(
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            hoy
        ));
    }
}
