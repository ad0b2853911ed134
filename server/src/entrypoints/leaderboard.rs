use leetcode_leaderboard_server::{
    db::{AccountStore, DB},
    types::{ErrorResponse, LeaderboardResponse},
};
use rocket::{fairing::AdHoc, http::Status, serde::json::Json, State};
use tracing::{error, instrument};

use super::{api_error, ApiResult};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[utoipa::path(tag = "Leaderboard", responses(
    (status = 200, description = "Accounts by score, highest first", body = LeaderboardResponse),
    (status = 400, description = "Invalid paging", body = ErrorResponse)
))]
#[get("/leaderboard?<limit>&<offset>")]
#[instrument(skip(db))]
pub async fn get_leaderboard(
    db: &State<DB>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> ApiResult<LeaderboardResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    let offset = offset.unwrap_or(0);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(api_error(
            Status::BadRequest,
            format!("limit must be between 1 and {MAX_LIMIT}"),
        ));
    }
    if offset < 0 {
        return Err(api_error(Status::BadRequest, "offset must not be negative"));
    }

    let page = async {
        let total = db.count().await?;
        let latest = db.latest_update().await?;
        let accounts = db.leaderboard(limit, offset).await?;
        anyhow::Ok((total, latest, accounts))
    };
    match page.await {
        Ok((total, latest, accounts)) => Ok(Json(LeaderboardResponse::new(
            total, latest, offset, accounts,
        ))),
        Err(e) => {
            error!("Failed to get leaderboard: {e}");
            Err(api_error(
                Status::InternalServerError,
                "Failed to load leaderboard",
            ))
        }
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing leaderboard entrypoints", |rocket| async {
        rocket.mount("/", routes![get_leaderboard])
    })
}
