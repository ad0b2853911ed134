use leetcode_leaderboard_server::{
    db::{types::Account, AccountStore, DB},
    refresh::RefreshOptions,
    types::{AccountResponse, BreakdownResponse, ErrorResponse},
};
use rocket::{fairing::AdHoc, http::Status, serde::json::Json, State};
use tracing::error;

use super::{api_error, ApiError, ApiResult};

pub(super) async fn load_account(db: &DB, id: i32) -> Result<Account, ApiError> {
    match db.find_by_id(id).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(api_error(Status::NotFound, "User not found")),
        Err(e) => {
            error!("Failed to get user {id}: {e}");
            Err(api_error(Status::InternalServerError, "Failed to load user"))
        }
    }
}

#[utoipa::path(tag = "Leaderboard", responses(
    (status = 200, description = "Tracked account with its baseline", body = AccountResponse),
    (status = 404, description = "Unknown account", body = ErrorResponse)
))]
#[get("/user/<id>")]
pub async fn get_user(db: &State<DB>, id: i32) -> ApiResult<AccountResponse> {
    let account = load_account(db, id).await?;
    Ok(Json(account.into()))
}

#[utoipa::path(tag = "Leaderboard", responses(
    (status = 200, description = "Per-tier points behind the score", body = BreakdownResponse),
    (status = 404, description = "Unknown account", body = ErrorResponse)
))]
#[get("/user/<id>/breakdown")]
pub async fn get_breakdown(
    db: &State<DB>,
    options: &State<RefreshOptions>,
    id: i32,
) -> ApiResult<BreakdownResponse> {
    let account = load_account(db, id).await?;
    Ok(Json(BreakdownResponse::new(account, options.mode)))
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing user entrypoints", |rocket| async {
        rocket.mount("/", routes![get_user, get_breakdown])
    })
}
