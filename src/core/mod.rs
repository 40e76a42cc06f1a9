mod engine;
mod error;
mod solver;
mod types;

pub use engine::{
    MAX_PROJECTION_YEARS, PROJECTION_STEP_YEARS, goal_status, inflation_target, project,
    stock_value, stock_value_with_contributions,
};
pub use error::SolverError;
pub use solver::{
    crossing_time, goal_time, goal_time_no_inflation, goal_time_with_contributions,
    refine_goal_time,
};
pub use types::{
    CrossingPoint, GoalEstimate, GoalMethod, GoalStatus, GrowthParams, MAX_NEWTON_ITERATIONS,
    NewtonConfig, NewtonIteration, NewtonSolution, Projection, ProjectionSample,
};
