use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use validator::Validate;

use crate::core::{DiscoverError, DiscoveryEngine, SwipeError, SwipeMatcher};
use crate::models::{
    DiscoverResponse, ErrorResponse, HealthResponse, MatchListResponse, SwipePayload, UserFilter,
};
use crate::storage::{MatchStore, StoreError, UserStore};

/// Authenticated caller id, injected by the upstream gateway
const USER_ID_HEADER: &str = "X-User-Id";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<SwipeMatcher>,
    pub discovery: Arc<DiscoveryEngine>,
    pub users: Arc<dyn UserStore>,
    pub matches: Arc<dyn MatchStore>,
}

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/swipes", web::post().to(swipe))
        .route("/discover", web::post().to(discover))
        .route("/matches", web::get().to(list_matches));
}

fn error_body(error: &str, message: impl Into<String>, status_code: u16) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code,
    }
}

/// Pull the acting user id out of the gateway-provided header.
fn acting_user_id(req: &HttpRequest) -> Result<String, HttpResponse> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            HttpResponse::BadRequest().json(error_body(
                "missing_user",
                format!("{USER_ID_HEADER} header is required"),
                400,
            ))
        })
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Swipe on a prospect profile
///
/// POST /api/v1/swipes
async fn swipe(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<SwipePayload>,
) -> impl Responder {
    let user_id = match acting_user_id(&req) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if let Err(errors) = payload.validate() {
        return HttpResponse::BadRequest().json(error_body(
            "invalid_payload",
            errors.to_string(),
            400,
        ));
    }

    match state.matcher.swipe(&user_id, &payload).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(SwipeError::ProspectNotFound) => HttpResponse::NotFound().json(error_body(
            "prospect_not_found",
            "prospect profile does not exist",
            404,
        )),
        Err(SwipeError::DuplicateSwipe) => HttpResponse::Conflict().json(error_body(
            "duplicate_swipe",
            "a swipe for this prospect is already recorded",
            409,
        )),
        Err(e) => {
            tracing::error!("swipe failed for {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(error_body(
                "swipe_failed",
                e.to_string(),
                500,
            ))
        }
    }
}

/// Discover candidate profiles for the calling user
///
/// POST /api/v1/discover
async fn discover(
    state: web::Data<AppState>,
    req: HttpRequest,
    filter: web::Json<UserFilter>,
) -> impl Responder {
    let user_id = match acting_user_id(&req) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let viewer = match state.users.get_by_id(&user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return HttpResponse::NotFound().json(error_body(
                "user_not_found",
                "calling user profile does not exist",
                404,
            ))
        }
        Err(e) => {
            tracing::error!("failed to load viewer {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(error_body(
                "discover_failed",
                e.to_string(),
                500,
            ));
        }
    };

    match state.discovery.discover(&viewer, &filter).await {
        Ok(candidates) => {
            let total_results = candidates.len();
            HttpResponse::Ok().json(DiscoverResponse {
                candidates,
                total_results,
            })
        }
        Err(DiscoverError::InvalidFilter(reason)) => {
            HttpResponse::BadRequest().json(error_body("invalid_filter", reason, 400))
        }
        Err(e) => {
            tracing::error!("discover failed for {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(error_body(
                "discover_failed",
                e.to_string(),
                500,
            ))
        }
    }
}

/// List the calling user's matches
///
/// GET /api/v1/matches
async fn list_matches(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user_id = match acting_user_id(&req) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.matches.list_for_user(&user_id).await {
        Ok(matches) => HttpResponse::Ok().json(MatchListResponse { matches }),
        Err(e) => {
            tracing::error!("match listing failed for {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(error_body(
                "match_listing_failed",
                e.to_string(),
                500,
            ))
        }
    }
}
