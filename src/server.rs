use actix_web::{error::InternalError, web, HttpRequest, HttpResponse, Responder};
use log::{info, error, debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, MapsError};
use crate::google_maps::MapsClient;
use crate::recommend::{Filter, QueryOutcome, QueryService, DEFAULT_MIN_RATING};
use crate::static_map::static_map_url;
use crate::utils::clamp_limit;

/// Shared handler state.
pub struct AppState {
    pub queries: QueryService,
    pub maps: MapsClient,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    location: String,
    #[serde(default)]
    cuisine: String,
    min_rating: Option<f64>,
    limit: Option<usize>,
}

impl RecommendationQuery {
    fn filter(&self) -> Filter {
        Filter::new(
            self.location.clone(),
            self.cuisine.clone(),
            self.min_rating.unwrap_or(DEFAULT_MIN_RATING),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    address: String,
}

#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    origin: String,
    destination: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    expected_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Diagnostic {
    kind: &'static str,
    message: String,
}

impl From<&DataError> for Diagnostic {
    fn from(err: &DataError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn request_id() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S%f").to_string()
}

fn expected_format(req: &HttpRequest) -> serde_json::Value {
    match req.path() {
        "/api/geocode" => serde_json::json!({"address": "1600 Amphitheatre Parkway, Mountain View, CA"}),
        "/api/distance" => serde_json::json!({"origin": "San Francisco, CA", "destination": "Los Angeles, CA"}),
        "/api/top" => serde_json::json!({"limit": 5}),
        _ => serde_json::json!({
            "location": "New York",
            "cuisine": "italian",
            "min_rating": DEFAULT_MIN_RATING,
            "limit": 5
        }),
    }
}

fn query_error_handler(err: actix_web::error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    let error_msg = format!("Invalid query parameters: {}", err);
    error!("{} {}: {}", req.method(), req.path(), error_msg);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        error: error_msg,
        expected_format: expected_format(req),
    });
    InternalError::from_response(err, response).into()
}

fn outcome_response(outcome: QueryOutcome) -> HttpResponse {
    let count = outcome.results.len();
    match &outcome.error {
        Some(err) => HttpResponse::Ok().json(serde_json::json!({
            "status": "error",
            "mode": outcome.mode,
            "count": 0,
            "results": outcome.results,
            "error": Diagnostic::from(err),
        })),
        None => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "mode": outcome.mode,
            "count": count,
            "results": outcome.results,
        })),
    }
}

fn maps_error_response(request_id: &str, err: MapsError) -> HttpResponse {
    match err {
        MapsError::MissingApiKey => {
            warn!("Request {}: {}", request_id, err);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "error",
                "error": err.to_string(),
            }))
        }
        other => {
            error!("Request {}: Google Maps call failed: {}", request_id, other);
            HttpResponse::BadGateway().json(serde_json::json!({
                "status": "error",
                "error": other.to_string(),
            }))
        }
    }
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "status": "not_found",
        "message": message,
    }))
}

async fn run_query<F>(state: &web::Data<AppState>, query: F) -> QueryOutcome
where
    F: FnOnce(&QueryService) -> QueryOutcome + Send + 'static,
{
    let service = state.queries.clone();
    match tokio::task::spawn_blocking(move || query(&service)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Query task failed: {}", e);
            QueryOutcome {
                mode: crate::recommend::QueryMode::Top,
                results: Vec::new(),
                error: Some(DataError::DataUnavailable {
                    path: state.queries.data_path().to_path_buf(),
                    reason: format!("query task failed: {e}"),
                }),
            }
        }
    }
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "message": "Server is running"
    }))
}

async fn recommendations(
    query: web::Query<RecommendationQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let request_id = request_id();
    info!("Request {}: Recommendation request received", request_id);
    debug!("Request {}: Query: {:?}", request_id, query);

    let filter = query.filter();
    let limit = clamp_limit(query.limit);
    let outcome = run_query(&state, move |service| service.recommend(&filter, limit)).await;

    info!("Request {}: Returning {} recommendations", request_id, outcome.results.len());
    outcome_response(outcome)
}

async fn top_restaurants(
    query: web::Query<LimitQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let request_id = request_id();
    let limit = clamp_limit(query.limit);
    info!("Request {}: Top {} restaurants requested", request_id, limit);
    outcome_response(run_query(&state, move |service| service.top(limit)).await)
}

async fn heatmap(state: web::Data<AppState>) -> impl Responder {
    let request_id = request_id();
    info!("Request {}: Heatmap requested", request_id);

    let service = state.queries.clone();
    let points = tokio::task::spawn_blocking(move || service.heatmap()).await;
    match points {
        Ok(Ok(points)) => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "count": points.len(),
            "points": points,
        })),
        Ok(Err(e)) => {
            error!("Request {}: Heatmap failed: {}", request_id, e);
            HttpResponse::Ok().json(serde_json::json!({
                "status": "error",
                "count": 0,
                "points": [],
                "error": Diagnostic::from(&e),
            }))
        }
        Err(e) => {
            error!("Request {}: Heatmap task failed: {}", request_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn results_map(
    query: web::Query<RecommendationQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let request_id = request_id();
    info!("Request {}: Results map requested", request_id);

    let Some(api_key) = state.maps.api_key().map(str::to_string) else {
        return maps_error_response(&request_id, MapsError::MissingApiKey);
    };

    let filter = query.filter();
    let limit = clamp_limit(query.limit);
    let outcome = run_query(&state, move |service| service.recommend(&filter, limit)).await;
    if outcome.error.is_some() {
        return outcome_response(outcome);
    }

    match static_map_url(&outcome.results, &api_key) {
        Some(url) => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "map_url": url,
        })),
        None => not_found("No matching restaurant has coordinates"),
    }
}

async fn geocode(query: web::Query<GeocodeQuery>, state: web::Data<AppState>) -> impl Responder {
    let request_id = request_id();
    info!("Request {}: Geocode request for {}", request_id, query.address);

    match state.maps.geocode(&query.address).await {
        Ok(Some(coordinates)) => HttpResponse::Ok().json(coordinates),
        Ok(None) => not_found("Address not found"),
        Err(e) => maps_error_response(&request_id, e),
    }
}

async fn distance(query: web::Query<DistanceQuery>, state: web::Data<AppState>) -> impl Responder {
    let request_id = request_id();
    info!(
        "Request {}: Distance request from {} to {}",
        request_id, query.origin, query.destination
    );

    match state.maps.distance(&query.origin, &query.destination).await {
        Ok(Some(distance)) => HttpResponse::Ok().json(distance),
        Ok(None) => not_found("No route between these locations"),
        Err(e) => maps_error_response(&request_id, e),
    }
}

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/health", web::get().to(health_check))
        .route("/api/recommendations", web::get().to(recommendations))
        .route("/api/top", web::get().to(top_restaurants))
        .route("/api/heatmap", web::get().to(heatmap))
        .route("/api/map", web::get().to(results_map))
        .route("/api/geocode", web::get().to(geocode))
        .route("/api/distance", web::get().to(distance));
}
