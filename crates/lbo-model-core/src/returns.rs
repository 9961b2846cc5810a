use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::decomposition::{self, IrrAttribution};
use crate::error::LboModelError;
use crate::projection::{self, LboAssumptions, ProjectionOutput, YearRecord};
use crate::types::*;
use crate::LboModelResult;

/// Output of the return analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSummary {
    /// Equity invested at entry (entry TEV minus entry debt)
    pub entry_equity: Money,
    /// Equity received at exit (exit TEV minus exit net debt)
    pub exit_equity: Money,
    /// Sponsor IRR; absent when the equity flows admit no solution
    pub levered_irr: Option<Rate>,
    /// IRR of the all-equity counterfactual (same assumptions, zero debt)
    pub unlevered_irr: Option<Rate>,
    /// Multiple on Invested Capital; absent when entry equity is non-positive
    pub moic: Option<Multiple>,
    /// Entry debt / entry EBITDA
    pub entry_leverage: Multiple,
    /// Exit net debt / exit EBITDA
    pub exit_leverage: Multiple,
    /// Return-driver decomposition; present only when both IRRs converged
    pub attribution: Option<IrrAttribution>,
}

/// Assemble the equity cash-flow vector: entry equity out at year 0,
/// per-year distributions, exit equity added into the final year.
fn equity_flow_vector(
    entry_equity: Money,
    schedule: &[YearRecord],
    exit_equity: Money,
) -> Vec<Money> {
    let mut flows: Vec<Money> = Vec::with_capacity(schedule.len());
    flows.push(-entry_equity);
    for record in &schedule[1..] {
        flows.push(record.distribution);
    }
    if let Some(last) = flows.last_mut() {
        *last += exit_equity;
    }
    flows
}

/// Solve for IRR, mapping an unsolvable or non-converging series to `None`
/// with a warning. Absence is a result, not a fault.
fn solve_irr(flows: &[Money], label: &str, warnings: &mut Vec<String>) -> Option<Rate> {
    match crate::time_value::irr(flows, dec!(0.10)) {
        Ok(r) => Some(r),
        Err(e) => {
            warnings.push(format!("{label} IRR unavailable: {e}"));
            None
        }
    }
}

/// Analyze returns for a completed projection: levered and unlevered IRR,
/// MOIC, leverage multiples, and the IRR decomposition.
///
/// The unlevered counterfactual re-runs the projection engine with zero
/// entry debt and applies the identical exit-equity convention, so a deal
/// with no debt yields exactly equal levered and unlevered IRRs.
pub fn analyze(
    input: &LboAssumptions,
    projection: &ProjectionOutput,
) -> LboModelResult<ComputationOutput<ReturnSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    projection::validate(input)?;
    if projection.schedule.len() != input.years as usize + 1 {
        return Err(LboModelError::InvalidInput {
            field: "schedule".into(),
            reason: format!(
                "Schedule has {} records, expected {}",
                projection.schedule.len(),
                input.years + 1
            ),
        });
    }
    let last = projection
        .schedule
        .last()
        .ok_or_else(|| LboModelError::InsufficientData("Schedule is empty".into()))?;

    let entry_equity = input.entry_tev - input.entry_debt;
    // Net-debt convention: retained cash nets against debt at exit
    let exit_equity = projection.exit_tev - last.ending_debt + last.ending_cash;

    let flows = equity_flow_vector(entry_equity, &projection.schedule, exit_equity);
    let levered_irr = solve_irr(&flows, "levered", &mut warnings);

    let unlevered_irr = if input.entry_debt.is_zero() {
        // Already all-equity: the counterfactual is this run
        levered_irr
    } else {
        let unlevered_input = LboAssumptions {
            entry_debt: Decimal::ZERO,
            ..input.clone()
        };
        let unlevered = projection::project(&unlevered_input)?;
        for w in unlevered.warnings {
            warnings.push(format!("Unlevered counterfactual: {w}"));
        }
        let unlevered_last = unlevered
            .result
            .schedule
            .last()
            .ok_or_else(|| LboModelError::InsufficientData("Schedule is empty".into()))?;
        let unlevered_exit = unlevered.result.exit_tev + unlevered_last.ending_cash;
        let unlevered_flows = equity_flow_vector(
            unlevered_input.entry_tev,
            &unlevered.result.schedule,
            unlevered_exit,
        );
        solve_irr(&unlevered_flows, "unlevered", &mut warnings)
    };

    let moic = if entry_equity > Decimal::ZERO {
        Some(exit_equity / entry_equity)
    } else {
        warnings.push("Entry equity is non-positive; MOIC undefined".into());
        None
    };

    let entry_leverage = input.entry_debt / input.entry_ebitda;
    let exit_net_debt = last.ending_debt - last.ending_cash;
    let exit_leverage = if projection.exit_ebitda.is_zero() {
        warnings.push("Exit EBITDA is zero; exit leverage undefined".into());
        Decimal::ZERO
    } else {
        exit_net_debt / projection.exit_ebitda
    };

    let attribution = match (levered_irr, unlevered_irr) {
        (Some(levered), Some(unlevered)) => Some(decomposition::attribute(
            input,
            projection.exit_ebitda,
            levered,
            unlevered,
        )?),
        _ => {
            warnings.push("IRR unavailable; attribution skipped".into());
            None
        }
    };

    let output = ReturnSummary {
        entry_equity,
        exit_equity,
        levered_irr,
        unlevered_irr,
        moic,
        entry_leverage,
        exit_leverage,
        attribution,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LBO Returns: levered/unlevered IRR and decomposition",
        &serde_json::json!({
            "entry_tev": input.entry_tev.to_string(),
            "entry_debt": input.entry_debt.to_string(),
            "exit_multiple": input.exit_multiple.to_string(),
            "years": input.years,
        }),
        warnings,
        elapsed,
        output,
    ))
}
