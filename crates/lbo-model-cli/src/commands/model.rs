use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use lbo_model_core::model;
use lbo_model_core::projection::{self, CashFlowPolicy, LboAssumptions};
use lbo_model_core::time_value;

use crate::input;

#[derive(Debug, Clone, ValueEnum)]
pub enum PolicyArg {
    /// Residual cash accumulates until exit
    Retain,
    /// Residual cash is distributed to equity each year
    Distribute,
}

impl From<PolicyArg> for CashFlowPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Retain => CashFlowPolicy::Retain,
            PolicyArg::Distribute => CashFlowPolicy::Distribute,
        }
    }
}

/// Entry assumptions, shared by the project and model subcommands
#[derive(Args)]
pub struct AssumptionArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Entry-year EBITDA
    #[arg(long)]
    pub entry_ebitda: Option<Decimal>,

    /// EBITDA CAGR as a decimal (0.10 = 10%)
    #[arg(long, allow_hyphen_values = true)]
    pub ebitda_cagr: Option<Decimal>,

    /// Total enterprise value at entry
    #[arg(long)]
    pub entry_tev: Option<Decimal>,

    /// Exit EV/EBITDA multiple
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,

    /// Acquisition debt at entry
    #[arg(long)]
    pub entry_debt: Option<Decimal>,

    /// Corporate tax rate as a decimal
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Annual interest rate on debt as a decimal
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Capex as a percentage of EBITDA, as a decimal
    #[arg(long)]
    pub capex_pct: Option<Decimal>,

    /// Projection horizon in years
    #[arg(long, default_value_t = 5)]
    pub years: u32,

    /// Residual cash policy
    #[arg(long, value_enum, default_value = "retain")]
    pub policy: PolicyArg,
}

impl AssumptionArgs {
    /// Resolve assumptions from file, piped stdin, or individual flags.
    fn resolve(self) -> Result<LboAssumptions, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            return Ok(input::file::read_json(path)?);
        }
        if let Some(data) = input::stdin::read_stdin()? {
            return Ok(serde_json::from_value(data)?);
        }

        Ok(LboAssumptions {
            entry_ebitda: self
                .entry_ebitda
                .ok_or("--entry-ebitda is required (or provide --input)")?,
            ebitda_cagr: self
                .ebitda_cagr
                .ok_or("--ebitda-cagr is required (or provide --input)")?,
            entry_tev: self
                .entry_tev
                .ok_or("--entry-tev is required (or provide --input)")?,
            exit_multiple: self
                .exit_multiple
                .ok_or("--exit-multiple is required (or provide --input)")?,
            entry_debt: self
                .entry_debt
                .ok_or("--entry-debt is required (or provide --input)")?,
            tax_rate: self
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            interest_rate: self
                .interest_rate
                .ok_or("--interest-rate is required (or provide --input)")?,
            capex_pct: self
                .capex_pct
                .ok_or("--capex-pct is required (or provide --input)")?,
            years: self.years,
            cash_flow_policy: self.policy.into(),
        })
    }
}

/// Arguments for the projection subcommand
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.assumptions.resolve()?;
    let result = projection::project(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the full model subcommand
#[derive(Args)]
pub struct ModelArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

pub fn run_model(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.assumptions.resolve()?;
    let result = model::run_model(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the raw IRR solver
#[derive(Args)]
pub struct IrrArgs {
    /// Cash flow series (comma-separated, e.g. "-1200,0,0,0,0,2494")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Initial guess for the solver
    #[arg(long)]
    pub guess: Option<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let guess = args.guess.unwrap_or(dec!(0.10));
    let irr = time_value::irr(&args.cash_flows, guess)?;
    Ok(serde_json::json!({ "irr": irr }))
}
