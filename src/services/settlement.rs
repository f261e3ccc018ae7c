// src/services/settlement.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{orders::PaymentType, quotation::Charges};

const SECS_PER_HOUR: i64 = 3_600;

/// Multa por atraso em degraus: dias inteiros se passou de 24h, senão horas.
/// Fração de hora conta como hora cheia; 25h de atraso cobram 1 dia, não 1 dia + 1h.
pub fn late_fee(planned_return: DateTime<Utc>, returned_at: DateTime<Utc>, charges: &Charges) -> Decimal {
    if returned_at <= planned_return {
        return Decimal::ZERO;
    }
    let overage_secs = (returned_at - planned_return).num_seconds();
    let late_hours = (overage_secs + SECS_PER_HOUR - 1) / SECS_PER_HOUR;
    let late_days = late_hours / 24;

    if late_days >= 1 {
        Decimal::from(late_days) * charges.extra_day_price
    } else {
        Decimal::from(late_hours) * charges.extra_hour_price
    }
}

/// Saldo devido na devolução, antes da multa.
/// `agreed_total` é o total da cotação (ou da linha, no caminho do carrinho).
pub fn remaining_balance(payment_type: PaymentType, agreed_total: Decimal, paid_amount: Decimal) -> Decimal {
    match payment_type {
        PaymentType::FullUpfront => Decimal::ZERO,
        PaymentType::PartialDeposit => (agreed_total - paid_amount).max(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn charges() -> Charges {
        Charges {
            extra_hour_price: dec!(50),
            extra_day_price: dec!(500),
            extra_week_price: dec!(3000),
        }
    }

    fn planned() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap()
    }

    #[test]
    fn twenty_five_hours_late_is_one_day_not_a_day_and_an_hour() {
        let returned = Utc.with_ymd_and_hms(2025, 1, 11, 11, 0, 0).unwrap();
        assert_eq!(late_fee(planned(), returned, &charges()), dec!(500));
    }

    #[test]
    fn on_time_or_early_is_free() {
        assert_eq!(late_fee(planned(), planned(), &charges()), Decimal::ZERO);
        assert_eq!(late_fee(planned(), planned() - Duration::hours(3), &charges()), Decimal::ZERO);
    }

    #[test]
    fn partial_hour_rounds_up() {
        let returned = planned() + Duration::minutes(90);
        assert_eq!(late_fee(planned(), returned, &charges()), dec!(100));
    }

    #[test]
    fn twenty_three_hours_is_still_hourly() {
        let returned = planned() + Duration::hours(23);
        assert_eq!(late_fee(planned(), returned, &charges()), dec!(1150));
    }

    #[test]
    fn forty_nine_hours_is_two_days() {
        let returned = planned() + Duration::hours(49);
        assert_eq!(late_fee(planned(), returned, &charges()), dec!(1000));
    }

    #[test]
    fn full_upfront_owes_nothing() {
        assert_eq!(remaining_balance(PaymentType::FullUpfront, dec!(900), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn deposit_owes_the_difference_never_negative() {
        assert_eq!(remaining_balance(PaymentType::PartialDeposit, dec!(900), dec!(300)), dec!(600));
        assert_eq!(remaining_balance(PaymentType::PartialDeposit, dec!(900), dec!(1200)), Decimal::ZERO);
    }
}
