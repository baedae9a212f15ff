use crate::data::{GenerationPayload, Hour};
use crate::solver::{self, SolveError};
use crate::validator;
use axum::extract::Query;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "engine": "Timetable Engine",
        "status": "Online",
        "solver": "HiGHS MIP via good_lp"
    }))
}

/// Validates the payload, runs the engine, and maps each outcome to its
/// status code: 400 for validation failures, 422 when no viable timetable
/// exists, 500 for internal failures.
async fn generate_handler(Json(payload): Json<GenerationPayload>) -> Response {
    let validation_errors = validator::validate(&payload);
    if !validation_errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": { "validation_errors": validation_errors } })),
        )
            .into_response();
    }

    // the solve is CPU-bound for up to its whole budget
    let outcome = tokio::task::spawn_blocking(move || solver::generate(&payload)).await;
    match outcome {
        Ok(Ok(schedule)) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Feasible timetable generated.",
                "total_classes": schedule.len(),
                "schedule": schedule,
            })),
        )
            .into_response(),
        Ok(Err(SolveError::Infeasible(detail))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": detail })),
        )
            .into_response(),
        Ok(Err(SolveError::Internal(detail))) => {
            error!("Internal solver failure: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": detail })),
            )
                .into_response()
        }
        Err(join_error) => {
            error!("Solver task failed: {join_error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": join_error.to_string() })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubstituteQuery {
    time_index: Hour,
    day: String,
}

/// Lists faculty whose shift covers the requested hour. Free-slot filtering
/// against a stored schedule belongs to the persistence layer, not here.
async fn substitute_search(
    Query(query): Query<SubstituteQuery>,
    Json(payload): Json<GenerationPayload>,
) -> Json<serde_json::Value> {
    let available_substitutes: Vec<serde_json::Value> = payload
        .faculty
        .iter()
        .filter(|f| f.shift.contains(&query.time_index))
        .map(|f| {
            json!({
                "faculty_id": f.id,
                "name": f.name,
                "current_load": f.total_target_load(),
                "status": "Available & On Shift",
            })
        })
        .collect();

    Json(json!({
        "query": { "day": query.day, "time": query.time_index },
        "available_substitutes": available_substitutes,
    }))
}

pub async fn run_server() {
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/api/v1/generate", post(generate_handler))
        .route("/api/v1/substitute-search", post(substitute_search))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await.unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
