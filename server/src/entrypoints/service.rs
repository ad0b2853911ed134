use leetcode_leaderboard_server::{
    db::DB,
    types::{HealthResponse, ServiceInfo},
};
use rocket::{fairing::AdHoc, http::Status, serde::json::Json, State};
use tracing::error;

#[utoipa::path(responses(
    (status = 200, description = "Service name and version", body = ServiceInfo)
))]
#[get("/")]
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "LeetCode Leaderboard API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
    })
}

#[utoipa::path(responses(
    (status = 200, description = "Database reachable", body = HealthResponse),
    (status = 503, description = "Database unreachable", body = HealthResponse)
))]
#[get("/health")]
pub async fn health(db: &State<DB>) -> (Status, Json<HealthResponse>) {
    match db.ping().await {
        Ok(()) => (
            Status::Ok,
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "connected".to_string(),
            }),
        ),
        Err(e) => {
            error!("Health check failed: {e}");
            (
                Status::ServiceUnavailable,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    database: "disconnected".to_string(),
                }),
            )
        }
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing service entrypoints", |rocket| async {
        rocket.mount("/", routes![index, health])
    })
}
