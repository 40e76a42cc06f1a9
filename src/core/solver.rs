use tracing::debug;

use super::error::{Result, SolverError};
use super::types::{
    GoalEstimate, GoalMethod, GrowthParams, MAX_NEWTON_ITERATIONS, NewtonConfig, NewtonIteration,
    NewtonSolution,
};

/// Time at which `Ps*(1+rs/n)^(n t)` and `Pi*(1+ri/n)^(n t)` are equal.
///
/// Negative when the stock already passed the target in the past.
pub fn crossing_time(params: &GrowthParams) -> Result<f64> {
    validate_params(params)?;
    if params.rate_stock == params.rate_inflation {
        return Err(SolverError::ParallelCurves {
            rate: params.rate_stock,
        });
    }

    let n = params.n();
    let numerator = (params.principal_stock / params.principal_inflation).ln();
    let denominator = ((n + params.rate_inflation) / (n + params.rate_stock)).ln();
    // Rates closer than f64 resolution after dividing by n.
    if denominator == 0.0 {
        return Err(SolverError::ParallelCurves {
            rate: params.rate_stock,
        });
    }

    Ok(numerator / denominator / n)
}

/// Time at which principal plus regular contributions reaches a fixed goal
/// (`principal_inflation` held constant).
pub fn goal_time_no_inflation(params: &GrowthParams) -> Result<f64> {
    validate_params(params)?;
    validate_contribution(params)?;

    if params.rate_stock == 0.0 {
        return Ok((params.principal_inflation - params.principal_stock) / params.annual_contribution);
    }

    let k = params.period_rate_stock();
    let c = params.regular_contribution();
    let ratio = (k * params.principal_inflation / c + 1.0) / (k * params.principal_stock / c + 1.0);
    let time_in_years = ratio.ln() / (1.0 + k).ln() / params.n();
    if !time_in_years.is_finite() {
        return Err(SolverError::invalid(
            "goal is never reached with the given rate_stock and annual_contribution",
        ));
    }
    Ok(time_in_years)
}

/// Time at which principal plus regular contributions reaches the
/// inflation-adjusted target, found with Newton's method.
///
/// Seeded with half the no-contribution crossing time.
pub fn goal_time_with_contributions(
    params: &GrowthParams,
    config: &NewtonConfig,
) -> Result<NewtonSolution> {
    validate_contribution(params)?;
    let seed = crossing_time(params)? / 2.0;
    refine_goal_time(params, seed, config)
}

/// Runs the Newton iteration from an explicit starting estimate.
pub fn refine_goal_time(
    params: &GrowthParams,
    seed: f64,
    config: &NewtonConfig,
) -> Result<NewtonSolution> {
    validate_params(params)?;
    validate_contribution(params)?;
    validate_stock_growth(params)?;
    validate_newton_config(config)?;
    if !seed.is_finite() {
        return Err(SolverError::invalid("seed must be finite"));
    }

    let race = ContributionRace::new(params);
    let mut estimate = seed;
    let mut iterations = Vec::new();

    for iteration in 1..=config.max_iterations {
        let residual = race.residual(estimate);
        let derivative = race.derivative(estimate);
        if !residual.is_finite() || !derivative.is_finite() || derivative == 0.0 {
            return Err(SolverError::NonConvergence {
                iterations: iteration - 1,
                last_estimate: estimate,
            });
        }

        let next = estimate - residual / derivative;
        debug!(iteration, estimate = next, residual, derivative, "newton step");
        iterations.push(NewtonIteration {
            iteration,
            estimate: next,
            residual,
            derivative,
        });
        if !next.is_finite() {
            return Err(SolverError::NonConvergence {
                iterations: iteration,
                last_estimate: estimate,
            });
        }

        if (next - estimate).abs() < config.tolerance {
            return Ok(NewtonSolution {
                seed,
                time_in_years: next,
                iterations,
            });
        }
        estimate = next;
    }

    Err(SolverError::NonConvergence {
        iterations: config.max_iterations,
        last_estimate: estimate,
    })
}

/// Picks the solver for the inputs: the closed form when nothing is
/// contributed, Newton's method otherwise.
pub fn goal_time(params: &GrowthParams, config: &NewtonConfig) -> Result<GoalEstimate> {
    if params.annual_contribution == 0.0 {
        debug!("annual_contribution is zero; using closed-form crossing time");
        return Ok(GoalEstimate {
            time_in_years: crossing_time(params)?,
            method: GoalMethod::ClosedForm,
            iterations: Vec::new(),
        });
    }

    let solution = goal_time_with_contributions(params, config)?;
    Ok(GoalEstimate {
        time_in_years: solution.time_in_years,
        method: GoalMethod::Newton,
        iterations: solution.iterations,
    })
}

/// Contribution curve minus target, scaled by `k/C` so the annuity term
/// needs no division:
///
/// `f(t) = (k*Ps/C + 1) * a^(n t) - (k*Pi/C) * b^(n t) - 1`
#[derive(Debug, Clone, Copy)]
struct ContributionRace {
    n: f64,
    growth_coeff: f64,
    target_coeff: f64,
    ln_a: f64,
    ln_b: f64,
}

impl ContributionRace {
    fn new(params: &GrowthParams) -> Self {
        let k = params.period_rate_stock();
        let c = params.regular_contribution();
        Self {
            n: params.n(),
            growth_coeff: k * params.principal_stock / c + 1.0,
            target_coeff: k * params.principal_inflation / c,
            ln_a: (1.0 + k).ln(),
            ln_b: (1.0 + params.period_rate_inflation()).ln(),
        }
    }

    fn residual(&self, t: f64) -> f64 {
        self.growth_coeff * (self.n * t * self.ln_a).exp()
            - self.target_coeff * (self.n * t * self.ln_b).exp()
            - 1.0
    }

    fn derivative(&self, t: f64) -> f64 {
        self.n * self.growth_coeff * (self.n * t * self.ln_a).exp() * self.ln_a
            - self.n * self.target_coeff * (self.n * t * self.ln_b).exp() * self.ln_b
    }
}

fn validate_params(params: &GrowthParams) -> Result<()> {
    if !params.principal_stock.is_finite() || params.principal_stock <= 0.0 {
        return Err(SolverError::invalid("principal_stock must be > 0"));
    }
    if !params.principal_inflation.is_finite() || params.principal_inflation <= 0.0 {
        return Err(SolverError::invalid("principal_inflation must be > 0"));
    }
    if params.compounds_per_year == 0 {
        return Err(SolverError::invalid("compounds_per_year must be > 0"));
    }
    let n = params.n();
    if !params.rate_stock.is_finite() || n + params.rate_stock <= 0.0 {
        return Err(SolverError::invalid(
            "rate_stock must be finite and > -compounds_per_year",
        ));
    }
    if !params.rate_inflation.is_finite() || n + params.rate_inflation <= 0.0 {
        return Err(SolverError::invalid(
            "rate_inflation must be finite and > -compounds_per_year",
        ));
    }
    if !params.annual_contribution.is_finite() || params.annual_contribution < 0.0 {
        return Err(SolverError::invalid("annual_contribution must be >= 0"));
    }
    Ok(())
}

fn validate_contribution(params: &GrowthParams) -> Result<()> {
    if params.annual_contribution <= 0.0 {
        return Err(SolverError::invalid(
            "annual_contribution must be > 0 for the contribution solvers",
        ));
    }
    Ok(())
}

/// `k = rs/n` divides the rearranged residual, so Newton needs growth.
fn validate_stock_growth(params: &GrowthParams) -> Result<()> {
    if params.rate_stock == 0.0 {
        return Err(SolverError::invalid(
            "rate_stock must be non-zero for the contribution solver",
        ));
    }
    Ok(())
}

fn validate_newton_config(config: &NewtonConfig) -> Result<()> {
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolverError::invalid("tolerance must be > 0"));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_NEWTON_ITERATIONS {
        return Err(SolverError::invalid(format!(
            "max_iterations must be between 1 and {MAX_NEWTON_ITERATIONS}"
        )));
    }
    Ok(())
}
