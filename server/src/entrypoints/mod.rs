use leetcode_leaderboard_server::{
    config::AdminToken,
    refresh::Outcome,
    types::{
        AccountResponse, BreakdownResponse, CreateAccountRequest, ErrorResponse, HealthResponse,
        LeaderboardEntry, LeaderboardResponse, MessageResponse, ServiceInfo, TierPointsResponse,
    },
};
use rocket::{
    fairing::AdHoc,
    http::Status,
    request::{self, FromRequest},
    serde::json::Json,
    Request,
};
use utoipa::OpenApi;

pub mod admin;
pub mod leaderboard;
pub mod service;
pub mod user;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

pub type ApiError = (Status, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(status: Status, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

/// Request guard for admin routes: the `X-Admin-Token` header must match the
/// configured token.
pub struct Admin;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = &'static str;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(expected) = req.rocket().state::<AdminToken>() else {
            return request::Outcome::Error((
                Status::InternalServerError,
                "Admin token is not configured",
            ));
        };
        match req.headers().get_one(ADMIN_TOKEN_HEADER) {
            Some(token) if !expected.0.is_empty() && token == expected.0 => {
                request::Outcome::Success(Admin)
            }
            _ => request::Outcome::Error((
                Status::Unauthorized,
                "Invalid or missing admin token",
            )),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "LeetCode Leaderboard API"),
    paths(
        service::index,
        service::health,
        leaderboard::get_leaderboard,
        user::get_user,
        user::get_breakdown,
        admin::add_user,
        admin::remove_user,
        admin::update_all,
        admin::update_all_async,
        admin::update_user,
        admin::reset_baseline,
        admin::reset_baseline_all,
    ),
    components(schemas(
        ServiceInfo,
        HealthResponse,
        LeaderboardResponse,
        LeaderboardEntry,
        AccountResponse,
        BreakdownResponse,
        TierPointsResponse,
        CreateAccountRequest,
        MessageResponse,
        ErrorResponse,
        Outcome,
    )),
    tags(
        (name = "Leaderboard", description = "Public leaderboard"),
        (name = "Admin", description = "Requires the X-Admin-Token header"),
    )
)]
pub struct ApiDoc;

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .attach(service::stage())
            .attach(leaderboard::stage())
            .attach(user::stage())
            .attach(admin::stage())
    })
}
