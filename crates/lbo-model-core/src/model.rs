use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::projection::{self, LboAssumptions, YearRecord};
use crate::returns::{self, ReturnSummary};
use crate::types::*;
use crate::LboModelResult;

/// Full model output: projection schedule, exit valuation, and returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboModelOutput {
    pub schedule: Vec<YearRecord>,
    pub exit_ebitda: Money,
    pub exit_tev: Money,
    pub returns: ReturnSummary,
}

/// Run the complete model from entry assumptions through exit returns.
///
/// This is the top-level orchestrator that ties together the projection
/// engine and the return analyzer, merging warnings from both phases.
pub fn run_model(input: &LboAssumptions) -> LboModelResult<ComputationOutput<LboModelOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // ─── Projection ──────────────────────────────────────────────────
    let projection = projection::project(input)?;
    warnings.extend(projection.warnings);

    // ─── Returns ─────────────────────────────────────────────────────
    let analysis = returns::analyze(input, &projection.result)?;
    warnings.extend(analysis.warnings);

    let output = LboModelOutput {
        schedule: projection.result.schedule,
        exit_ebitda: projection.result.exit_ebitda,
        exit_tev: projection.result.exit_tev,
        returns: analysis.result,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged Buyout Return Model",
        &serde_json::json!({
            "entry_ebitda": input.entry_ebitda.to_string(),
            "ebitda_cagr": input.ebitda_cagr.to_string(),
            "entry_tev": input.entry_tev.to_string(),
            "exit_multiple": input.exit_multiple.to_string(),
            "entry_debt": input.entry_debt.to_string(),
            "years": input.years,
            "cash_flow_policy": input.cash_flow_policy,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::CashFlowPolicy;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const TOLERANCE: Decimal = dec!(0.000001);

    /// Scenario A from the model's acceptance set: 10% growth, 8x entry
    /// leverage, slight multiple compression at exit.
    fn scenario_a() -> LboAssumptions {
        LboAssumptions {
            entry_ebitda: dec!(100),
            ebitda_cagr: dec!(0.10),
            entry_tev: dec!(2000),
            exit_multiple: dec!(19),
            entry_debt: dec!(800),
            tax_rate: dec!(0.25),
            interest_rate: dec!(0.08),
            capex_pct: dec!(0.10),
            years: 5,
            cash_flow_policy: CashFlowPolicy::Retain,
        }
    }

    #[test]
    fn test_scenario_a_positive_leverage_impact() {
        let result = run_model(&scenario_a()).unwrap();
        let out = &result.result;

        // Debt amortizes but is not extinguished: cumulative FCF < 800
        let last = out.schedule.last().unwrap();
        assert!(last.ending_debt > Decimal::ZERO);
        assert!(last.ending_debt < dec!(800));

        let levered = out.returns.levered_irr.unwrap();
        let unlevered = out.returns.unlevered_irr.unwrap();
        assert!(levered > unlevered);

        let attr = out.returns.attribution.as_ref().unwrap();
        assert!(attr.leverage_impact > Decimal::ZERO);
    }

    #[test]
    fn test_scenario_b_unlevered_equals_levered() {
        let mut input = scenario_a();
        input.entry_debt = dec!(0);

        let result = run_model(&input).unwrap();
        let returns = &result.result.returns;

        assert_eq!(returns.levered_irr, returns.unlevered_irr);
        assert_eq!(
            returns.attribution.as_ref().unwrap().leverage_impact,
            dec!(0)
        );
    }

    #[test]
    fn test_scenario_c_yield_driven() {
        let mut input = scenario_a();
        input.ebitda_cagr = dec!(0.0);
        input.exit_multiple = dec!(20); // entry multiple: 2000 / 100

        let result = run_model(&input).unwrap();
        let attr = result.result.returns.attribution.as_ref().unwrap().clone();

        assert!(attr.ebitda_growth.abs() < TOLERANCE);
        assert!(attr.tev_growth.abs() < TOLERANCE);
        assert_eq!(attr.ebitda_yield, dec!(0.05));
        // With no growth, the levered return is yield, residual, and
        // leverage only
        let reassembled = attr.ebitda_yield + attr.covariance + attr.leverage_impact;
        assert!((reassembled - attr.levered_irr).abs() < dec!(0.00001));
    }

    #[test]
    fn test_decomposition_identity() {
        let result = run_model(&scenario_a()).unwrap();
        let attr = result.result.returns.attribution.as_ref().unwrap();

        let reassembled =
            attr.tev_growth + attr.ebitda_yield + attr.covariance + attr.leverage_impact;
        assert!((reassembled - attr.levered_irr).abs() < TOLERANCE);
        assert!(
            (attr.leverage_impact - (attr.levered_irr - attr.unlevered_irr)).abs() < TOLERANCE
        );
    }

    #[test]
    fn test_round_trip_is_deterministic() {
        let input = scenario_a();
        let first = run_model(&input).unwrap();
        let second = run_model(&input).unwrap();

        assert_eq!(first.result.schedule, second.result.schedule);
        assert_eq!(first.result.exit_tev, second.result.exit_tev);
        assert_eq!(
            first.result.returns.levered_irr,
            second.result.returns.levered_irr
        );
        assert_eq!(
            first.result.returns.unlevered_irr,
            second.result.returns.unlevered_irr
        );
        assert_eq!(first.result.returns.exit_equity, second.result.returns.exit_equity);
    }

    #[test]
    fn test_all_nonnegative_flows_yield_absent_irr() {
        let mut input = scenario_a();
        input.entry_debt = dec!(2000); // entry equity = 0: nothing invested

        let result = run_model(&input).unwrap();
        let returns = &result.result.returns;

        assert!(returns.levered_irr.is_none());
        assert!(returns.attribution.is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no sign change")));
    }

    #[test]
    fn test_exit_equity_nonnegative_when_tev_covers_net_debt() {
        let result = run_model(&scenario_a()).unwrap();
        let out = &result.result;
        let last = out.schedule.last().unwrap();

        assert!(out.exit_tev >= last.ending_debt - last.ending_cash);
        assert!(out.returns.exit_equity >= Decimal::ZERO);
    }

    #[test]
    fn test_warnings_propagate_from_projection() {
        let mut input = scenario_a();
        input.ebitda_cagr = dec!(0.0);
        input.capex_pct = dec!(0.90); // deeply cash-flow negative

        let result = run_model(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("funding shortfall")));
    }
}
