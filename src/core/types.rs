use serde::Serialize;

/// Financial inputs shared by every solver and curve.
///
/// Rates are nominal annual fractions (0.08 = 8%). The annual contribution is
/// split evenly across compounding periods.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GrowthParams {
    pub principal_stock: f64,
    pub principal_inflation: f64,
    pub rate_stock: f64,
    pub rate_inflation: f64,
    pub compounds_per_year: u32,
    pub annual_contribution: f64,
}

impl GrowthParams {
    pub fn n(&self) -> f64 {
        self.compounds_per_year as f64
    }

    pub fn regular_contribution(&self) -> f64 {
        self.annual_contribution / self.n()
    }

    /// Stock rate per compounding period.
    pub fn period_rate_stock(&self) -> f64 {
        self.rate_stock / self.n()
    }

    pub fn period_rate_inflation(&self) -> f64 {
        self.rate_inflation / self.n()
    }

    /// `(1 + rs/n)^(n t)`
    pub fn stock_growth_factor(&self, time_in_years: f64) -> f64 {
        (1.0 + self.period_rate_stock()).powf(self.n() * time_in_years)
    }

    /// `(1 + ri/n)^(n t)`
    pub fn inflation_growth_factor(&self, time_in_years: f64) -> f64 {
        (1.0 + self.period_rate_inflation()).powf(self.n() * time_in_years)
    }

    pub fn without_contributions(self) -> Self {
        Self {
            annual_contribution: 0.0,
            ..self
        }
    }

    /// Treats the target as a fixed goal in today's currency.
    pub fn without_inflation(self) -> Self {
        Self {
            rate_inflation: 0.0,
            ..self
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalMethod {
    ClosedForm,
    Newton,
}

/// Upper bound accepted for `NewtonConfig::max_iterations`.
pub const MAX_NEWTON_ITERATIONS: u32 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct NewtonConfig {
    /// Absolute tolerance on successive estimates, in years.
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewtonIteration {
    pub iteration: u32,
    pub estimate: f64,
    pub residual: f64,
    pub derivative: f64,
}

#[derive(Debug, Clone)]
pub struct NewtonSolution {
    pub seed: f64,
    pub time_in_years: f64,
    pub iterations: Vec<NewtonIteration>,
}

/// Where the stock stands relative to the target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    /// The stock is at or above the target today.
    AlreadyReached,
    /// The stock catches the target at a positive time.
    Reached,
    /// The stock is below the target and the curves only met in the past.
    NeverReached,
}

#[derive(Debug, Clone)]
pub struct GoalEstimate {
    pub time_in_years: f64,
    pub method: GoalMethod,
    pub iterations: Vec<NewtonIteration>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSample {
    pub years: f64,
    pub stock: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossingPoint {
    pub time_in_years: f64,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub samples: Vec<ProjectionSample>,
    pub crossing: CrossingPoint,
}

impl Projection {
    /// End of the sampled domain: one year past the crossing, or past today
    /// when the crossing lies in the past.
    pub fn x_length(&self) -> f64 {
        self.crossing.time_in_years.max(0.0) + 1.0
    }

    pub fn max_value(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.stock.max(s.target))
            .fold(self.crossing.value, f64::max)
    }
}
