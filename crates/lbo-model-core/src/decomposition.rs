use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::error::LboModelError;
use crate::projection::LboAssumptions;
use crate::types::*;
use crate::LboModelResult;

/// Decomposition of the levered IRR into its return drivers.
///
/// The components satisfy
/// `levered_irr = tev_growth + ebitda_yield + covariance + leverage_impact`,
/// with `covariance` the residual between the unlevered IRR and the additive
/// growth-plus-yield approximation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrAttribution {
    /// Annualized EBITDA growth over the holding period
    pub ebitda_growth: Rate,
    /// Annualized change in the EV/EBITDA multiple
    pub multiple_change: Rate,
    /// Compounded TEV growth: (1 + growth) * (1 + multiple change) - 1
    pub tev_growth: Rate,
    /// Entry EBITDA yield: 1 / entry multiple
    pub ebitda_yield: Rate,
    /// Residual of the unlevered IRR over tev_growth + ebitda_yield
    pub covariance: Rate,
    pub unlevered_irr: Rate,
    /// Levered minus unlevered IRR
    pub leverage_impact: Rate,
    pub levered_irr: Rate,
}

/// Annualized growth rate implied by a total ratio over `years` periods.
fn annualized(ratio: Decimal, years: u32) -> Rate {
    let exponent = Decimal::ONE / Decimal::from(years);
    ratio.powd(exponent) - Decimal::ONE
}

/// Attribute the levered IRR to growth, multiple change, yield, and
/// leverage. Requires both IRRs to have converged.
pub fn attribute(
    input: &LboAssumptions,
    exit_ebitda: Money,
    levered_irr: Rate,
    unlevered_irr: Rate,
) -> LboModelResult<IrrAttribution> {
    if input.entry_ebitda <= Decimal::ZERO || input.entry_tev <= Decimal::ZERO {
        return Err(LboModelError::DivisionByZero {
            context: "entry multiple (entry EBITDA and TEV must be positive)".into(),
        });
    }
    if exit_ebitda <= Decimal::ZERO || input.exit_multiple <= Decimal::ZERO {
        return Err(LboModelError::InvalidInput {
            field: "exit_ebitda".into(),
            reason: "Exit EBITDA and exit multiple must be positive for attribution".into(),
        });
    }
    if input.years == 0 {
        return Err(LboModelError::InvalidInput {
            field: "years".into(),
            reason: "Holding period must be at least 1 year".into(),
        });
    }

    let entry_multiple = input.entry_tev / input.entry_ebitda;

    let ebitda_growth = annualized(exit_ebitda / input.entry_ebitda, input.years);
    let multiple_change = annualized(input.exit_multiple / entry_multiple, input.years);
    let tev_growth =
        (Decimal::ONE + ebitda_growth) * (Decimal::ONE + multiple_change) - Decimal::ONE;
    let ebitda_yield = Decimal::ONE / entry_multiple;
    let covariance = unlevered_irr - (tev_growth + ebitda_yield);
    let leverage_impact = levered_irr - unlevered_irr;

    Ok(IrrAttribution {
        ebitda_growth,
        multiple_change,
        tev_growth,
        ebitda_yield,
        covariance,
        unlevered_irr,
        leverage_impact,
        levered_irr,
    })
}
