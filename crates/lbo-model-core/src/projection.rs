use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LboModelError;
use crate::types::*;
use crate::LboModelResult;

/// What happens to free cash flow left over after debt paydown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowPolicy {
    /// Residual cash accumulates on the balance sheet until exit.
    #[default]
    Retain,
    /// Positive residual cash is paid out to equity holders each year.
    Distribute,
}

/// Entry assumptions for the LBO model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboAssumptions {
    /// Entry-year EBITDA (LTM or projected)
    pub entry_ebitda: Money,
    /// EBITDA compound annual growth rate (decimal, e.g. 0.10 = 10%; may be negative)
    pub ebitda_cagr: Rate,
    /// Total enterprise value at acquisition
    pub entry_tev: Money,
    /// Exit EV/EBITDA multiple
    pub exit_multiple: Multiple,
    /// Acquisition debt drawn at entry
    pub entry_debt: Money,
    /// Corporate tax rate
    pub tax_rate: Rate,
    /// Interest rate on outstanding debt (simple annual)
    pub interest_rate: Rate,
    /// Capital expenditure as percentage of EBITDA
    pub capex_pct: Rate,
    /// Projection horizon in years
    #[serde(default = "default_years")]
    pub years: u32,
    /// Allocation of residual cash after debt paydown
    #[serde(default)]
    pub cash_flow_policy: CashFlowPolicy,
}

fn default_years() -> u32 {
    5
}

/// One year of the projection. Year 0 is the initialization row: all flow
/// fields zero, debt and cash at entry values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: u32,
    pub ebitda: Money,
    pub capex: Money,
    pub ebit: Money,
    pub interest: Money,
    pub ebt: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub free_cash_flow: Money,
    pub beginning_debt: Money,
    pub debt_paydown: Money,
    pub ending_debt: Money,
    pub beginning_cash: Money,
    pub cash_generated: Money,
    pub distribution: Money,
    pub ending_cash: Money,
}

/// Projection engine output: the full schedule plus exit valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    /// Year-by-year records, length `years + 1` (year 0 first)
    pub schedule: Vec<YearRecord>,
    pub exit_ebitda: Money,
    pub exit_tev: Money,
}

pub(crate) fn validate(input: &LboAssumptions) -> LboModelResult<()> {
    if input.entry_ebitda <= Decimal::ZERO {
        return Err(LboModelError::InvalidInput {
            field: "entry_ebitda".into(),
            reason: "Entry EBITDA must be positive".into(),
        });
    }
    if input.entry_tev <= Decimal::ZERO {
        return Err(LboModelError::InvalidInput {
            field: "entry_tev".into(),
            reason: "Entry enterprise value must be positive".into(),
        });
    }
    if input.exit_multiple <= Decimal::ZERO {
        return Err(LboModelError::InvalidInput {
            field: "exit_multiple".into(),
            reason: "Exit multiple must be positive".into(),
        });
    }
    if input.entry_debt < Decimal::ZERO {
        return Err(LboModelError::InvalidInput {
            field: "entry_debt".into(),
            reason: "Entry debt cannot be negative".into(),
        });
    }
    if input.years == 0 {
        return Err(LboModelError::InvalidInput {
            field: "years".into(),
            reason: "Projection horizon must be at least 1 year".into(),
        });
    }
    if input.ebitda_cagr <= -Decimal::ONE {
        return Err(LboModelError::InvalidInput {
            field: "ebitda_cagr".into(),
            reason: "EBITDA CAGR must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Project the income statement and the debt/cash waterfall year by year.
///
/// All free cash flow is offered to debt paydown first; debt amortizes at
/// most to zero. Residual cash follows the configured `CashFlowPolicy`.
/// A year with negative free cash flow leaves debt untouched and carries
/// the shortfall into the cash balance, which may go negative; each such
/// year is reported through the warnings vector.
pub fn project(input: &LboAssumptions) -> LboModelResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;

    let growth_factor = Decimal::ONE + input.ebitda_cagr;

    let mut schedule: Vec<YearRecord> = Vec::with_capacity(input.years as usize + 1);
    schedule.push(YearRecord {
        year: 0,
        ebitda: input.entry_ebitda,
        capex: Decimal::ZERO,
        ebit: Decimal::ZERO,
        interest: Decimal::ZERO,
        ebt: Decimal::ZERO,
        taxes: Decimal::ZERO,
        net_income: Decimal::ZERO,
        free_cash_flow: Decimal::ZERO,
        beginning_debt: input.entry_debt,
        debt_paydown: Decimal::ZERO,
        ending_debt: input.entry_debt,
        beginning_cash: Decimal::ZERO,
        cash_generated: Decimal::ZERO,
        distribution: Decimal::ZERO,
        ending_cash: Decimal::ZERO,
    });

    let mut ebitda = input.entry_ebitda;
    let mut debt_balance = input.entry_debt;
    let mut cash_balance = Decimal::ZERO;

    for year in 1..=input.years {
        ebitda *= growth_factor;

        let capex = ebitda * input.capex_pct;
        // Depreciation is assumed equal to capex, so EBIT carries the full
        // capex charge and net income doubles as free cash flow.
        let ebit = ebitda - capex;

        let beginning_debt = debt_balance;
        let interest = beginning_debt * input.interest_rate;

        let ebt = ebit - interest;
        // Taxes floored at zero: losses carry no value in this model
        let taxes = if ebt > Decimal::ZERO {
            ebt * input.tax_rate
        } else {
            Decimal::ZERO
        };
        let net_income = ebt - taxes;
        let free_cash_flow = net_income;

        let cash_available = free_cash_flow.max(Decimal::ZERO);
        let debt_paydown = cash_available.min(beginning_debt);
        debt_balance = beginning_debt - debt_paydown;

        let remaining = free_cash_flow - debt_paydown;
        let distribution = match input.cash_flow_policy {
            CashFlowPolicy::Retain => Decimal::ZERO,
            CashFlowPolicy::Distribute => remaining.max(Decimal::ZERO),
        };

        let beginning_cash = cash_balance;
        let cash_generated = remaining - distribution;
        cash_balance += cash_generated;

        if cash_balance < Decimal::ZERO {
            warnings.push(format!(
                "Year {year}: funding shortfall, cash balance {cash_balance}"
            ));
        }

        log::debug!(
            "year {year}: ebitda {ebitda}, fcf {free_cash_flow}, paydown {debt_paydown}, \
             ending debt {debt_balance}, ending cash {cash_balance}"
        );

        schedule.push(YearRecord {
            year,
            ebitda,
            capex,
            ebit,
            interest,
            ebt,
            taxes,
            net_income,
            free_cash_flow,
            beginning_debt,
            debt_paydown,
            ending_debt: debt_balance,
            beginning_cash,
            cash_generated,
            distribution,
            ending_cash: cash_balance,
        });
    }

    let exit_ebitda = ebitda;
    let exit_tev = exit_ebitda * input.exit_multiple;

    let output = ProjectionOutput {
        schedule,
        exit_ebitda,
        exit_tev,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LBO Projection: income statement and debt/cash waterfall",
        &serde_json::json!({
            "entry_ebitda": input.entry_ebitda.to_string(),
            "ebitda_cagr": input.ebitda_cagr.to_string(),
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
    use rust_decimal_macros::dec;

    /// Helper: build a standard 5-year assumption set for tests
    fn standard_assumptions() -> LboAssumptions {
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
    fn test_schedule_length_and_year_zero() {
        let input = standard_assumptions();
        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        assert_eq!(schedule.len(), 6);

        let y0 = &schedule[0];
        assert_eq!(y0.year, 0);
        assert_eq!(y0.free_cash_flow, dec!(0));
        assert_eq!(y0.ending_debt, dec!(800));
        assert_eq!(y0.ending_cash, dec!(0));
    }

    #[test]
    fn test_first_year_mechanics() {
        let mut input = standard_assumptions();
        input.ebitda_cagr = dec!(0.0);
        input.years = 1;

        let result = project(&input).unwrap();
        let y1 = &result.result.schedule[1];

        // EBITDA = 100, capex = 10, EBIT = 90
        assert_eq!(y1.ebitda, dec!(100));
        assert_eq!(y1.capex, dec!(10));
        assert_eq!(y1.ebit, dec!(90));
        // Interest = 800 * 0.08 = 64
        assert_eq!(y1.interest, dec!(64));
        // EBT = 90 - 64 = 26, tax = 6.5, FCF = 19.5
        assert_eq!(y1.ebt, dec!(26));
        assert_eq!(y1.taxes, dec!(6.50));
        assert_eq!(y1.free_cash_flow, dec!(19.50));
        // All FCF swept to paydown
        assert_eq!(y1.debt_paydown, dec!(19.50));
        assert_eq!(y1.ending_debt, dec!(780.50));
        assert_eq!(y1.ending_cash, dec!(0));
    }

    #[test]
    fn test_ebitda_compounds() {
        let input = standard_assumptions();
        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        assert_eq!(schedule[1].ebitda, dec!(110.00));
        assert_eq!(schedule[2].ebitda, dec!(121.0000));
        // Exit EBITDA = 100 * 1.1^5
        assert_eq!(result.result.exit_ebitda, schedule[5].ebitda);
        assert_eq!(
            result.result.exit_tev,
            result.result.exit_ebitda * input.exit_multiple
        );
    }

    #[test]
    fn test_debt_never_negative_and_monotonic() {
        let input = standard_assumptions();
        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        for pair in schedule.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            assert_eq!(curr.beginning_debt, prev.ending_debt);
            assert_eq!(curr.beginning_cash, prev.ending_cash);
            assert!(curr.ending_debt >= Decimal::ZERO);
            assert!(curr.ending_debt <= curr.beginning_debt);
            assert_eq!(curr.ending_debt, curr.beginning_debt - curr.debt_paydown);
        }
    }

    #[test]
    fn test_cash_accumulates_after_full_deleveraging() {
        let mut input = standard_assumptions();
        input.entry_debt = dec!(20);

        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        // Year 1 FCF comfortably exceeds 20, so debt dies in year 1
        assert_eq!(schedule[1].ending_debt, dec!(0));
        assert!(schedule[1].ending_cash > Decimal::ZERO);
        // Cash keeps growing thereafter
        for pair in schedule[1..].windows(2) {
            assert!(pair[1].ending_cash > pair[0].ending_cash);
        }
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_paydown_capped_at_balance() {
        let mut input = standard_assumptions();
        input.entry_debt = dec!(10);
        input.years = 1;

        let result = project(&input).unwrap();
        let y1 = &result.result.schedule[1];

        assert_eq!(y1.debt_paydown, dec!(10));
        assert_eq!(y1.ending_debt, dec!(0));
        assert_eq!(y1.ending_cash, y1.free_cash_flow - dec!(10));
    }

    #[test]
    fn test_funding_shortfall_warns_and_cash_goes_negative() {
        let mut input = standard_assumptions();
        input.ebitda_cagr = dec!(0.0);
        input.capex_pct = dec!(0.90); // EBIT = 10, interest = 64 → FCF = -54
        input.years = 2;

        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        assert_eq!(schedule[1].free_cash_flow, dec!(-54));
        assert_eq!(schedule[1].debt_paydown, dec!(0));
        assert_eq!(schedule[1].ending_debt, dec!(800));
        assert_eq!(schedule[1].ending_cash, dec!(-54));
        // No tax refund on the loss
        assert_eq!(schedule[1].taxes, dec!(0));

        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("Year 1: funding shortfall"));
    }

    #[test]
    fn test_distribute_policy_pays_out_residual() {
        let mut input = standard_assumptions();
        input.entry_debt = dec!(0);
        input.cash_flow_policy = CashFlowPolicy::Distribute;

        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;

        for record in &schedule[1..] {
            assert_eq!(record.distribution, record.free_cash_flow);
            assert_eq!(record.ending_cash, dec!(0));
        }
    }

    #[test]
    fn test_negative_cagr_declines() {
        let mut input = standard_assumptions();
        input.ebitda_cagr = dec!(-0.05);

        let result = project(&input).unwrap();
        let schedule = &result.result.schedule;
        assert!(schedule[5].ebitda < input.entry_ebitda);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut input = standard_assumptions();
        input.entry_ebitda = dec!(0);
        assert!(project(&input).is_err());

        let mut input = standard_assumptions();
        input.years = 0;
        assert!(project(&input).is_err());

        let mut input = standard_assumptions();
        input.entry_debt = dec!(-100);
        assert!(project(&input).is_err());

        let mut input = standard_assumptions();
        input.ebitda_cagr = dec!(-1);
        assert!(project(&input).is_err());
    }
}
