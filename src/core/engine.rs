use super::error::{Result, SolverError};
use super::types::{CrossingPoint, GoalStatus, GrowthParams, Projection, ProjectionSample};

/// Sampling step for projected curves, in years.
pub const PROJECTION_STEP_YEARS: f64 = 0.1;

/// Latest crossing time `project` will sample up to.
pub const MAX_PROJECTION_YEARS: f64 = 1_000.0;

/// `Ps*(1+rs/n)^(n t)`
pub fn stock_value(params: &GrowthParams, time_in_years: f64) -> f64 {
    params.principal_stock * params.stock_growth_factor(time_in_years)
}

/// Stock value with the regular contribution added every compounding period.
pub fn stock_value_with_contributions(params: &GrowthParams, time_in_years: f64) -> f64 {
    let base = stock_value(params, time_in_years);
    if params.annual_contribution == 0.0 {
        return base;
    }
    let k = params.period_rate_stock();
    if k == 0.0 {
        return base + params.annual_contribution * time_in_years;
    }
    base + params.regular_contribution() * (params.stock_growth_factor(time_in_years) - 1.0) / k
}

/// `Pi*(1+ri/n)^(n t)`
pub fn inflation_target(params: &GrowthParams, time_in_years: f64) -> f64 {
    params.principal_inflation * params.inflation_growth_factor(time_in_years)
}

/// Classifies a crossing time against where the stock stands today.
///
/// A negative time means the curves met in the past; that is only a success
/// when the stock is still at or above the target now.
pub fn goal_status(params: &GrowthParams, time_in_years: f64) -> GoalStatus {
    if stock_value_with_contributions(params, 0.0) >= inflation_target(params, 0.0) {
        GoalStatus::AlreadyReached
    } else if time_in_years > 0.0 {
        GoalStatus::Reached
    } else {
        GoalStatus::NeverReached
    }
}

/// Samples both curves over `[0, max(t, 0) + 1)` and marks the crossing on
/// the target curve.
///
/// Crossing times beyond [`MAX_PROJECTION_YEARS`] are rejected before any
/// sampling.
pub fn project(params: &GrowthParams, time_in_years: f64) -> Result<Projection> {
    if !time_in_years.is_finite() {
        return Err(SolverError::invalid("time_in_years must be finite"));
    }
    if time_in_years > MAX_PROJECTION_YEARS {
        return Err(SolverError::HorizonTooLong {
            time_in_years,
            limit: MAX_PROJECTION_YEARS,
        });
    }

    let x_length = time_in_years.max(0.0) + 1.0;
    let steps = (x_length / PROJECTION_STEP_YEARS).ceil() as usize;

    let samples = (0..steps)
        .map(|i| i as f64 * PROJECTION_STEP_YEARS)
        .filter(|&years| years < x_length)
        .map(|years| ProjectionSample {
            years,
            stock: stock_value_with_contributions(params, years),
            target: inflation_target(params, years),
        })
        .collect();

    Ok(Projection {
        samples,
        crossing: CrossingPoint {
            time_in_years,
            value: inflation_target(params, time_in_years),
        },
    })
}
