use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// An input would make a logarithm or division undefined.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stock and inflation grow at the same rate, so the curves never meet
    /// (or coincide everywhere).
    #[error("Curves are parallel: rate_stock and rate_inflation are both {rate}")]
    ParallelCurves { rate: f64 },

    /// Newton's method hit the iteration cap or produced a non-finite step.
    #[error("Newton's method did not converge after {iterations} iterations (last estimate {last_estimate})")]
    NonConvergence { iterations: u32, last_estimate: f64 },

    /// The crossing lies too far out to sample the curves up to it.
    #[error("Crossing time {time_in_years} years is beyond the {limit}-year projection limit")]
    HorizonTooLong { time_in_years: f64, limit: f64 },
}

impl SolverError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SolverError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure_mode() {
        let err = SolverError::invalid("principal_stock must be > 0");
        assert_eq!(err.to_string(), "Invalid argument: principal_stock must be > 0");

        let err = SolverError::ParallelCurves { rate: 0.05 };
        assert!(err.to_string().contains("parallel"));

        let err = SolverError::NonConvergence {
            iterations: 100,
            last_estimate: 3.5,
        };
        assert!(err.to_string().contains("100 iterations"));

        let err = SolverError::HorizonTooLong {
            time_in_years: 2e7,
            limit: 1000.0,
        };
        assert!(err.to_string().contains("1000-year"));
    }
}
