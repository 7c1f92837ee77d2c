use rust_decimal::Decimal;

/// Platform commission for a charged session amount.
///
/// Symbolic payments (up to 15) carry no commission, medium payments
/// (over 15, up to 40) a flat 5, and full payments a flat 10. The
/// boundaries are inclusive on the lower tier.
pub fn comision_por_monto(monto: Decimal) -> Decimal {
    if monto <= Decimal::from(15) {
        Decimal::ZERO
    } else if monto <= Decimal::from(40) {
        Decimal::from(5)
    } else {
        Decimal::from(10)
    }
}

/// Commission for an optional charge; sessions without a charged
/// amount owe nothing.
pub fn comision_opcional(monto: Option<Decimal>) -> Decimal {
    monto.map(comision_por_monto).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(mantissa: i64, scale: u32) -> Decimal {
        Decimal::new(mantissa, scale)
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(comision_por_monto(dec(15, 0)), Decimal::ZERO);
        assert_eq!(comision_por_monto(dec(1501, 2)), Decimal::from(5));
        assert_eq!(comision_por_monto(dec(40, 0)), Decimal::from(5));
        assert_eq!(comision_por_monto(dec(4001, 2)), Decimal::from(10));
    }

    #[test]
    fn low_amounts_are_free() {
        assert_eq!(comision_por_monto(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(comision_por_monto(dec(5, 0)), Decimal::ZERO);
        assert_eq!(comision_por_monto(dec(1499, 2)), Decimal::ZERO);
    }

    #[test]
    fn medium_and_full_tiers() {
        assert_eq!(comision_por_monto(dec(16, 0)), Decimal::from(5));
        assert_eq!(comision_por_monto(dec(39, 0)), Decimal::from(5));
        assert_eq!(comision_por_monto(dec(41, 0)), Decimal::from(10));
        assert_eq!(comision_por_monto(dec(500, 0)), Decimal::from(10));
    }

    #[test]
    fn missing_amount_owes_nothing() {
        assert_eq!(comision_opcional(None), Decimal::ZERO);
        assert_eq!(comision_opcional(Some(dec(100, 0))), Decimal::from(10));
    }
}
