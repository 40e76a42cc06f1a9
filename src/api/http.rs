use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::{ParamOverrides, SolveMode, solve_mode};
use crate::config::Settings;
use crate::core::{
    GoalMethod, GoalStatus, NewtonConfig, NewtonIteration, ProjectionSample, goal_status, project,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSolveMode {
    #[serde(alias = "withPayments", alias = "with_payments")]
    WithPayments,
    #[serde(alias = "noPayments", alias = "no_payments")]
    NoPayments,
    #[serde(alias = "noInflation", alias = "no_inflation")]
    NoInflation,
}

impl From<ApiSolveMode> for SolveMode {
    fn from(value: ApiSolveMode) -> Self {
        match value {
            ApiSolveMode::WithPayments => SolveMode::WithPayments,
            ApiSolveMode::NoPayments => SolveMode::NoPayments,
            ApiSolveMode::NoInflation => SolveMode::NoInflation,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    principal_stock: Option<f64>,
    principal_inflation: Option<f64>,
    rate_stock: Option<f64>,
    rate_inflation: Option<f64>,
    compounds_per_year: Option<u32>,
    annual_contribution: Option<f64>,
    mode: Option<ApiSolveMode>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    mode: ApiSolveMode,
    method: GoalMethod,
    time_in_years: f64,
    goal_value: f64,
    status: GoalStatus,
    already_reached: bool,
    iterations: Vec<NewtonIteration>,
    samples: Vec<ProjectionSample>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16, settings: Settings) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(settings));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fiautopilot HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/solve");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn solve_get_handler(
    State(settings): State<Arc<Settings>>,
    Query(payload): Query<SolvePayload>,
) -> Response {
    solve_handler_impl(&settings, payload)
}

async fn solve_post_handler(
    State(settings): State<Arc<Settings>>,
    Json(payload): Json<SolvePayload>,
) -> Response {
    solve_handler_impl(&settings, payload)
}

fn solve_handler_impl(settings: &Settings, payload: SolvePayload) -> Response {
    match build_solve_response(settings, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            debug!(error = %msg, "rejected solve request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn build_solve_response(settings: &Settings, payload: SolvePayload) -> Result<SolveResponse, String> {
    let principal_stock = payload
        .principal_stock
        .ok_or_else(|| "principalStock is required".to_string())?;
    let overrides = ParamOverrides {
        principal_stock: Some(principal_stock),
        principal_inflation: payload.principal_inflation,
        rate_stock: payload.rate_stock,
        rate_inflation: payload.rate_inflation,
        compounds_per_year: payload.compounds_per_year,
        annual_contribution: payload.annual_contribution,
    };
    let params = overrides.apply(settings, principal_stock);

    let defaults = NewtonConfig::default();
    let config = NewtonConfig {
        tolerance: payload.tolerance.unwrap_or(defaults.tolerance),
        max_iterations: payload.max_iterations.unwrap_or(defaults.max_iterations),
    };
    let mode = payload.mode.unwrap_or(ApiSolveMode::WithPayments);

    let solution = solve_mode(&params, mode.into(), &config).map_err(|e| e.to_string())?;
    let time_in_years = solution.estimate.time_in_years;
    let projection = project(&solution.params, time_in_years).map_err(|e| e.to_string())?;
    let status = goal_status(&solution.params, time_in_years);

    Ok(SolveResponse {
        mode,
        method: solution.estimate.method,
        time_in_years,
        goal_value: projection.crossing.value,
        status,
        already_reached: status == GoalStatus::AlreadyReached,
        iterations: solution.estimate.iterations,
        samples: projection.samples,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn solve_payload_from_json(json: &str) -> Result<SolvePayload, String> {
    serde_json::from_str::<SolvePayload>(json).map_err(|e| format!("Invalid API JSON payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn payload_parses_camel_case_keys_and_mode_aliases() {
        let payload = solve_payload_from_json(
            r#"{
              "principalStock": 250000,
              "rateInflation": 0.025,
              "compoundsPerYear": 4,
              "mode": "noInflation",
              "maxIterations": 50
            }"#,
        )
        .expect("json should parse");
        assert_eq!(payload.principal_stock, Some(250_000.0));
        assert_eq!(payload.rate_inflation, Some(0.025));
        assert_eq!(payload.compounds_per_year, Some(4));
        assert_eq!(payload.mode, Some(ApiSolveMode::NoInflation));
        assert_eq!(payload.max_iterations, Some(50));
        assert_eq!(payload.rate_stock, None);
    }

    #[test]
    fn response_uses_settings_for_missing_fields() {
        let payload = solve_payload_from_json(r#"{ "principalStock": 250000 }"#).expect("json");
        let response = build_solve_response(&sample_settings(), payload).expect("converges");
        assert_eq!(response.mode, ApiSolveMode::WithPayments);
        assert_eq!(response.method, GoalMethod::Newton);
        assert!(response.time_in_years > 0.0);
        assert!(!response.already_reached);
        assert!(!response.iterations.is_empty());
        assert!((response.samples[0].stock - 250_000.0).abs() < 1e-6);
        let last = response.samples.last().expect("samples");
        assert!(last.years < response.time_in_years + 1.0);
    }

    #[test]
    fn response_requires_principal_stock() {
        let err = build_solve_response(&sample_settings(), SolvePayload::default())
            .expect_err("principal is required");
        assert!(err.contains("principalStock"));
    }

    #[test]
    fn response_reports_solver_errors() {
        let payload = solve_payload_from_json(
            r#"{ "principalStock": 250000, "rateInflation": 0.08, "mode": "no-payments" }"#,
        )
        .expect("json");
        let err = build_solve_response(&sample_settings(), payload).expect_err("parallel curves");
        assert!(err.contains("parallel"));
    }

    #[test]
    fn response_serialization_contains_expected_fields() {
        let payload = solve_payload_from_json(r#"{ "principalStock": 250000 }"#).expect("json");
        let response = build_solve_response(&sample_settings(), payload).expect("converges");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"mode\":\"with-payments\""));
        assert!(json.contains("\"method\":\"newton\""));
        assert!(json.contains("\"timeInYears\""));
        assert!(json.contains("\"goalValue\""));
        assert!(json.contains("\"status\":\"reached\""));
        assert!(json.contains("\"alreadyReached\":false"));
        assert!(json.contains("\"samples\""));
    }

    #[test]
    fn response_rejects_out_of_range_iteration_cap() {
        let payload = solve_payload_from_json(
            r#"{ "principalStock": 250000, "maxIterations": 4000000000 }"#,
        )
        .expect("json");
        let err = build_solve_response(&sample_settings(), payload).expect_err("cap too large");
        assert!(err.contains("max_iterations"));
    }

    #[test]
    fn response_rejects_crossing_beyond_projection_limit() {
        let payload = solve_payload_from_json(
            r#"{ "principalStock": 250000, "rateInflation": 0.0799999, "mode": "no-payments" }"#,
        )
        .expect("json");
        let err = build_solve_response(&sample_settings(), payload).expect_err("too far out");
        assert!(err.contains("projection limit"));
    }

    #[test]
    fn response_flags_target_that_outgrows_stock_as_never_reached() {
        let payload = solve_payload_from_json(
            r#"{ "principalStock": 250000, "rateStock": 0.03, "rateInflation": 0.08, "mode": "no-payments" }"#,
        )
        .expect("json");
        let response = build_solve_response(&sample_settings(), payload).expect("closed form");
        assert!(response.time_in_years < 0.0);
        assert_eq!(response.status, GoalStatus::NeverReached);
        assert!(!response.already_reached);
    }

    #[test]
    fn response_flags_stock_ahead_of_target_as_already_reached() {
        let payload = solve_payload_from_json(
            r#"{ "principalStock": 3000000, "mode": "no-payments" }"#,
        )
        .expect("json");
        let response = build_solve_response(&sample_settings(), payload).expect("closed form");
        assert_eq!(response.status, GoalStatus::AlreadyReached);
        assert!(response.already_reached);
    }
}
