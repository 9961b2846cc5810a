use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LboModelError;
use crate::types::{Money, Rate};
use crate::LboModelResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> LboModelResult<Money> {
    if rate <= dec!(-1) {
        return Err(LboModelError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(LboModelError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Whether the series contains both positive and negative flows. Without a
/// sign change the NPV never crosses zero and no IRR exists.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let any_negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let any_positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    any_negative && any_positive
}

/// Internal Rate of Return using Newton-Raphson.
///
/// A series without a sign change is rejected with `NoIrrSolution` before
/// any iteration; the root-finder itself fails with `ConvergenceFailure`
/// after a bounded iteration count. Callers that treat an absent IRR as a
/// normal outcome should map either error to `None`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> LboModelResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(LboModelError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    if !has_sign_change(cash_flows) {
        return Err(LboModelError::NoIrrSolution(
            "cash flows have no sign change".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let mut npv_val = Decimal::ZERO;
        let mut dnpv = Decimal::ZERO;
        let one_plus_r = Decimal::ONE + rate;

        for (t, cf) in cash_flows.iter().enumerate() {
            let t_dec = Decimal::from(t as i64);
            let discount = one_plus_r.powd(t_dec);
            if discount.is_zero() {
                continue;
            }
            npv_val += cf / discount;
            if t > 0 {
                dnpv -= t_dec * cf / (one_plus_r.powd(t_dec + Decimal::ONE));
            }
        }

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            log::debug!("irr converged to {rate} after {i} iterations");
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(LboModelError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        rate -= npv_val / dnpv;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    Err(LboModelError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}
