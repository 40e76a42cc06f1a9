use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{
    ConfigError, DEFAULT_CONFIG_FILE, DEFAULT_HISTORY_FILE, HistoryEntry, Settings, load_history,
};
use crate::core::{
    GoalEstimate, GoalMethod, GoalStatus, GrowthParams, NewtonConfig, SolverError, crossing_time,
    goal_status, goal_time, goal_time_no_inflation, project,
};
use crate::plot::{PlotConfig, format_currency, format_years, plot_history, plot_projection};
use crate::store::{HistoryStore, StoreError};

mod http;

pub use http::run_http_server;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPlotKind {
    WithPayments,
    NoPayments,
    NoInflation,
    History,
}

/// Which curve pair a calculation races.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SolveMode {
    /// Contributions against the inflation-adjusted target.
    WithPayments,
    /// Plain compounding against the inflation-adjusted target.
    NoPayments,
    /// Contributions against a fixed goal.
    NoInflation,
}

#[derive(Parser, Debug)]
#[command(
    name = "fiautopilot",
    about = "Estimates when savings cross an inflation-adjusted target"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, global = true, default_value = DEFAULT_HISTORY_FILE)]
    history: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Closed-form time at which the stock meets the inflating target, ignoring contributions
    Crossing {
        #[command(flatten)]
        overrides: ParamOverrides,
    },
    /// Time to reach the target with regular contributions
    Goal {
        #[command(flatten)]
        overrides: ParamOverrides,
        #[arg(long, help = "Hold the target fixed in today's currency")]
        no_inflation: bool,
        #[command(flatten)]
        newton: NewtonArgs,
    },
    /// Render a chart to an image file
    Plot {
        #[command(flatten)]
        overrides: ParamOverrides,
        #[arg(long, value_enum, default_value_t = CliPlotKind::WithPayments)]
        kind: CliPlotKind,
        #[arg(long, default_value = "image.png", help = "Output path; .svg selects SVG")]
        output: String,
        #[command(flatten)]
        newton: NewtonArgs,
    },
    /// Copy the principal history file into a SQLite database
    ImportHistory {
        #[arg(long)]
        db: PathBuf,
    },
    /// Serve the JSON API
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Default, Clone)]
struct ParamOverrides {
    #[arg(long, help = "Current investment value; defaults to the latest history entry")]
    principal_stock: Option<f64>,
    #[arg(long, help = "Target in today's currency")]
    principal_inflation: Option<f64>,
    #[arg(long, help = "Nominal annual stock growth rate as a fraction, e.g. 0.08")]
    rate_stock: Option<f64>,
    #[arg(long, help = "Nominal annual inflation rate as a fraction, e.g. 0.03")]
    rate_inflation: Option<f64>,
    #[arg(long)]
    compounds_per_year: Option<u32>,
    #[arg(long)]
    annual_contribution: Option<f64>,
}

#[derive(Args, Debug, Clone, Copy)]
struct NewtonArgs {
    #[arg(long, default_value_t = 1e-5, help = "Convergence tolerance in years")]
    tolerance: f64,
    #[arg(long, default_value_t = 100)]
    max_iterations: u32,
}

impl From<NewtonArgs> for NewtonConfig {
    fn from(value: NewtonArgs) -> Self {
        NewtonConfig {
            tolerance: value.tolerance,
            max_iterations: value.max_iterations,
        }
    }
}

impl ParamOverrides {
    fn apply(&self, settings: &Settings, principal_stock: f64) -> GrowthParams {
        let mut params = settings.params(principal_stock);
        if let Some(v) = self.principal_inflation {
            params.principal_inflation = v;
        }
        if let Some(v) = self.rate_stock {
            params.rate_stock = v;
        }
        if let Some(v) = self.rate_inflation {
            params.rate_inflation = v;
        }
        if let Some(v) = self.compounds_per_year {
            params.compounds_per_year = v;
        }
        if let Some(v) = self.annual_contribution {
            params.annual_contribution = v;
        }
        params
    }
}

/// Solver output together with the parameters the curves were drawn from.
#[derive(Debug, Clone)]
pub(crate) struct ModeSolution {
    pub params: GrowthParams,
    pub estimate: GoalEstimate,
}

pub(crate) fn solve_mode(
    params: &GrowthParams,
    mode: SolveMode,
    config: &NewtonConfig,
) -> Result<ModeSolution, SolverError> {
    match mode {
        SolveMode::WithPayments => Ok(ModeSolution {
            params: *params,
            estimate: goal_time(params, config)?,
        }),
        SolveMode::NoPayments => {
            let params = params.without_contributions();
            Ok(ModeSolution {
                params,
                estimate: closed_form(crossing_time(&params)?),
            })
        }
        SolveMode::NoInflation => {
            let params = params.without_inflation();
            Ok(ModeSolution {
                params,
                estimate: closed_form(goal_time_no_inflation(&params)?),
            })
        }
    }
}

fn closed_form(time_in_years: f64) -> GoalEstimate {
    GoalEstimate {
        time_in_years,
        method: GoalMethod::ClosedForm,
        iterations: Vec::new(),
    }
}

/// Logs to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::load(&cli.config)?;
    info!(config = %cli.config.display(), "loaded settings");

    match cli.command {
        Command::Crossing { overrides } => {
            let params = resolve_params(&settings, &overrides, &cli.history)?;
            let solution = solve_mode(&params, SolveMode::NoPayments, &NewtonConfig::default())?;
            println!("{}", describe_solution(&solution));
        }
        Command::Goal {
            overrides,
            no_inflation,
            newton,
        } => {
            let params = resolve_params(&settings, &overrides, &cli.history)?;
            let mode = if no_inflation {
                SolveMode::NoInflation
            } else {
                SolveMode::WithPayments
            };
            let solution = solve_mode(&params, mode, &newton.into())?;
            println!("{}", describe_solution(&solution));
        }
        Command::Plot {
            overrides,
            kind,
            output,
            newton,
        } => {
            let mode = match kind {
                CliPlotKind::WithPayments => SolveMode::WithPayments,
                CliPlotKind::NoPayments => SolveMode::NoPayments,
                CliPlotKind::NoInflation => SolveMode::NoInflation,
                CliPlotKind::History => {
                    let history = load_history(&cli.history)?;
                    let goal = overrides
                        .principal_inflation
                        .unwrap_or(settings.principal_inflation);
                    plot_history(&history, goal, &output, None)
                        .map_err(|e| AppError::Plot(e.to_string()))?;
                    info!(output = %output, entries = history.len(), "rendered history chart");
                    return Ok(());
                }
            };
            let params = resolve_params(&settings, &overrides, &cli.history)?;
            let solution = solve_mode(&params, mode, &newton.into())?;
            let projection = project(&solution.params, solution.estimate.time_in_years)?;
            let config = match mode {
                SolveMode::NoInflation => PlotConfig::goal_only(),
                SolveMode::WithPayments | SolveMode::NoPayments => PlotConfig::default(),
            };
            plot_projection(&projection, &output, Some(&config))
                .map_err(|e| AppError::Plot(e.to_string()))?;
            info!(output = %output, samples = projection.samples.len(), "rendered projection chart");
            println!("{}", describe_solution(&solution));
        }
        Command::ImportHistory { db } => {
            let history = load_history(&cli.history)?;
            let mut store = HistoryStore::open_path(&db)?;
            let count = store.insert_entries(&history)?;
            info!(db = %db.display(), count, "imported principal history");
        }
        Command::Serve { port } => run_http_server(port, settings).await?,
    }
    Ok(())
}

fn resolve_params(
    settings: &Settings,
    overrides: &ParamOverrides,
    history_path: &std::path::Path,
) -> Result<GrowthParams, AppError> {
    let principal_stock = match overrides.principal_stock {
        Some(v) => v,
        None => {
            let history = load_history(history_path)?;
            latest_principal(&history).ok_or_else(|| {
                AppError::InvalidArgument(
                    "--principal-stock is required when the principal history is empty"
                        .to_string(),
                )
            })?
        }
    };
    Ok(overrides.apply(settings, principal_stock))
}

fn latest_principal(history: &[HistoryEntry]) -> Option<f64> {
    history.last().map(|entry| entry.principal_stock)
}

fn describe_solution(solution: &ModeSolution) -> String {
    let t = solution.estimate.time_in_years;
    let method = match solution.estimate.method {
        GoalMethod::ClosedForm => "closed form".to_string(),
        GoalMethod::Newton => format!(
            "Newton's method, {} iterations",
            solution.estimate.iterations.len()
        ),
    };
    match goal_status(&solution.params, t) {
        GoalStatus::AlreadyReached => {
            warn!(time_in_years = t, "target was already reached");
            format!("Target already reached: stock is at or above the target today ({method})")
        }
        GoalStatus::NeverReached => {
            warn!(time_in_years = t, "target is never reached");
            format!(
                "Target never reached: the curves only met {} ago ({method})",
                format_years(-t)
            )
        }
        GoalStatus::Reached => {
            let value = crate::core::inflation_target(&solution.params, t);
            format!(
                "Target reached in {} at {} ({method})",
                format_years(t),
                format_currency(value)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_settings() -> Settings {
        Settings {
            principal_inflation: 2_000_000.0,
            rate_stock: 0.08,
            rate_inflation: 0.03,
            number_of_compounds_per_year: 12,
            annual_contribution: 24_000.0,
        }
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let overrides = ParamOverrides {
            rate_stock: Some(0.1),
            annual_contribution: Some(0.0),
            ..ParamOverrides::default()
        };
        let params = overrides.apply(&sample_settings(), 250_000.0);
        assert_approx(params.principal_stock, 250_000.0);
        assert_approx(params.principal_inflation, 2_000_000.0);
        assert_approx(params.rate_stock, 0.1);
        assert_approx(params.rate_inflation, 0.03);
        assert_eq!(params.compounds_per_year, 12);
        assert_approx(params.annual_contribution, 0.0);
    }

    #[test]
    fn resolve_params_falls_back_to_latest_history_entry() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_HISTORY_FILE);
        std::fs::write(
            &path,
            r#"{ "principal_stock_history": [
                { "date": "2020-01", "principal_stock": 100000 },
                { "date": "2020-02", "principal_stock": 120000 }
            ] }"#,
        )
        .expect("write history");

        let params = resolve_params(&sample_settings(), &ParamOverrides::default(), &path)
            .expect("history supplies principal");
        assert_approx(params.principal_stock, 120_000.0);
    }

    #[test]
    fn resolve_params_requires_history_without_override() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_HISTORY_FILE);
        let err = resolve_params(&sample_settings(), &ParamOverrides::default(), &path)
            .expect_err("history file is absent");
        assert!(matches!(err, AppError::Config(ConfigError::Missing(_))));
    }

    #[test]
    fn solve_mode_uses_matching_solver() {
        let params = sample_settings().params(250_000.0);
        let config = NewtonConfig::default();

        let with = solve_mode(&params, SolveMode::WithPayments, &config).expect("converges");
        assert_eq!(with.estimate.method, GoalMethod::Newton);

        let without = solve_mode(&params, SolveMode::NoPayments, &config).expect("closed form");
        assert_eq!(without.estimate.method, GoalMethod::ClosedForm);
        assert_approx(without.params.annual_contribution, 0.0);
        assert!(with.estimate.time_in_years < without.estimate.time_in_years);

        let fixed = solve_mode(&params, SolveMode::NoInflation, &config).expect("closed form");
        assert_approx(fixed.params.rate_inflation, 0.0);
        assert!(fixed.estimate.time_in_years < with.estimate.time_in_years);
    }

    #[test]
    fn describe_solution_reports_past_crossing() {
        let params = sample_settings().params(3_000_000.0);
        let solution =
            solve_mode(&params, SolveMode::NoPayments, &NewtonConfig::default()).expect("valid");
        assert!(describe_solution(&solution).starts_with("Target already reached"));
    }

    #[test]
    fn describe_solution_reports_unreachable_target() {
        let mut settings = sample_settings();
        settings.rate_stock = 0.03;
        settings.rate_inflation = 0.08;
        let params = settings.params(250_000.0);
        let solution =
            solve_mode(&params, SolveMode::NoPayments, &NewtonConfig::default()).expect("valid");
        assert!(solution.estimate.time_in_years < 0.0);
        assert!(describe_solution(&solution).starts_with("Target never reached"));
    }

    #[test]
    fn describe_solution_reports_future_crossing() {
        let params = sample_settings().params(250_000.0);
        let solution =
            solve_mode(&params, SolveMode::NoPayments, &NewtonConfig::default()).expect("valid");
        assert!(describe_solution(&solution).starts_with("Target reached in"));
    }

    #[test]
    fn cli_parses_goal_overrides() {
        let cli = Cli::try_parse_from([
            "fiautopilot",
            "--config",
            "cfg.json",
            "goal",
            "--principal-stock",
            "250000",
            "--annual-contribution",
            "12000",
            "--no-inflation",
        ])
        .expect("valid args");
        assert_eq!(cli.config, PathBuf::from("cfg.json"));
        match cli.command {
            Command::Goal {
                overrides,
                no_inflation,
                newton,
            } => {
                assert_eq!(overrides.principal_stock, Some(250_000.0));
                assert_eq!(overrides.annual_contribution, Some(12_000.0));
                assert!(no_inflation);
                assert_eq!(newton.max_iterations, 100);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_serve_port() {
        let cli = Cli::try_parse_from(["fiautopilot", "serve", "9000"]).expect("valid args");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));
        assert_eq!(cli.history, PathBuf::from(DEFAULT_HISTORY_FILE));
    }
}
