use std::sync::Arc;

use leetcode_leaderboard_server::{
    db::{AccountStore, DB},
    metrics::{RefreshMetrics, Trigger},
    refresh::{
        create_account, refresh_all, refresh_one, reset_all, reset_one, CreateError, Outcome,
        RefreshOptions, RefreshStatus,
    },
    types::{AccountResponse, CreateAccountRequest, ErrorResponse, MessageResponse},
};
use rocket::{fairing::AdHoc, http::Status, serde::json::Json, State};
use shared::leetcode::LeetCodeClient;
use tracing::{error, info, instrument};

use super::{api_error, Admin, ApiError, ApiResult};

fn status_response(
    status: anyhow::Result<RefreshStatus>,
    done: &str,
) -> ApiResult<MessageResponse> {
    match status {
        Ok(RefreshStatus::Success(_)) => Ok(Json(MessageResponse::new(done))),
        Ok(RefreshStatus::NotFound) => Err(api_error(Status::NotFound, "User not found")),
        Ok(RefreshStatus::FetchFailed) => Err(api_error(
            Status::BadGateway,
            "Failed to fetch stats from LeetCode",
        )),
        Err(e) => {
            error!("Failed to update user: {e}");
            Err(api_error(Status::InternalServerError, "Failed to store stats"))
        }
    }
}

fn create_error(identifier: &str, e: CreateError) -> ApiError {
    match e {
        CreateError::AlreadyExists => api_error(
            Status::BadRequest,
            format!("User with LeetCode username '{identifier}' already exists"),
        ),
        CreateError::FetchFailed => api_error(
            Status::BadGateway,
            format!("Could not fetch stats for LeetCode user '{identifier}'"),
        ),
        CreateError::Storage(e) => {
            error!("Failed to add user {identifier}: {e}");
            api_error(Status::InternalServerError, "Failed to store user")
        }
    }
}

#[utoipa::path(context_path = "/admin", tag = "Admin", request_body = CreateAccountRequest, responses(
    (status = 200, description = "Account is now tracked", body = AccountResponse),
    (status = 400, description = "Invalid or duplicate account", body = ErrorResponse),
    (status = 401, description = "Missing or wrong admin token", body = ErrorResponse),
    (status = 502, description = "Initial stats could not be fetched", body = ErrorResponse)
))]
#[post("/user/add", data = "<request>")]
#[instrument(skip_all)]
pub async fn add_user(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    request: Json<CreateAccountRequest>,
) -> ApiResult<AccountResponse> {
    let (username, identifier) = request
        .validate()
        .map_err(|detail| api_error(Status::BadRequest, detail))?;

    let account = create_account(db.inner(), client.inner().as_ref(), &username, &identifier)
        .await
        .map_err(|e| create_error(&identifier, e))?;
    Ok(Json(account.into()))
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Account removed", body = MessageResponse),
    (status = 404, description = "Unknown account", body = ErrorResponse)
))]
#[delete("/user/<id>")]
#[instrument(skip(_admin, db))]
pub async fn remove_user(_admin: Admin, db: &State<DB>, id: i32) -> ApiResult<MessageResponse> {
    match db.delete(id).await {
        Ok(true) => {
            info!("Stopped tracking account {id}");
            Ok(Json(MessageResponse::new("User removed successfully")))
        }
        Ok(false) => Err(api_error(Status::NotFound, "User not found")),
        Err(e) => {
            error!("Failed to remove user {id}: {e}");
            Err(api_error(Status::InternalServerError, "Failed to remove user"))
        }
    }
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Summary of the completed run", body = Outcome)
))]
#[post("/update_all")]
pub async fn update_all(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    options: &State<RefreshOptions>,
    metrics: &State<RefreshMetrics>,
) -> Json<Outcome> {
    let outcome = refresh_all(db.inner(), client.inner().as_ref(), options).await;
    metrics.observe(Trigger::Manual, &outcome);
    Json(outcome)
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Run started in the background", body = MessageResponse)
))]
#[post("/update_all/async")]
pub async fn update_all_async(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    options: &State<RefreshOptions>,
    metrics: &State<RefreshMetrics>,
) -> Json<MessageResponse> {
    let db = db.inner().clone();
    let client = client.inner().clone();
    let options = options.inner().clone();
    let metrics = metrics.inner().clone();

    // Detached: the run's outcome only reaches the logs and metrics.
    rocket::tokio::spawn(async move {
        let outcome = refresh_all(&db, client.as_ref(), &options).await;
        metrics.observe(Trigger::Background, &outcome);
    });
    Json(MessageResponse::new("Update started in background"))
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Stats refreshed", body = MessageResponse),
    (status = 404, description = "Unknown account", body = ErrorResponse),
    (status = 502, description = "Stats could not be fetched", body = ErrorResponse)
))]
#[post("/update_user/<id>")]
pub async fn update_user(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    options: &State<RefreshOptions>,
    id: i32,
) -> ApiResult<MessageResponse> {
    let status = refresh_one(db.inner(), client.inner().as_ref(), options, id).await;
    status_response(status, "User stats updated successfully")
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Baseline moved to the current counts", body = MessageResponse),
    (status = 404, description = "Unknown account", body = ErrorResponse),
    (status = 502, description = "Stats could not be fetched", body = ErrorResponse)
))]
#[post("/reset_baseline/<id>")]
pub async fn reset_baseline(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    options: &State<RefreshOptions>,
    id: i32,
) -> ApiResult<MessageResponse> {
    let status = reset_one(db.inner(), client.inner().as_ref(), options, id).await;
    status_response(status, "Baseline reset successfully")
}

#[utoipa::path(context_path = "/admin", tag = "Admin", responses(
    (status = 200, description = "Summary of the completed reset", body = Outcome)
))]
#[post("/reset_baseline_all")]
pub async fn reset_baseline_all(
    _admin: Admin,
    db: &State<DB>,
    client: &State<Arc<LeetCodeClient>>,
    options: &State<RefreshOptions>,
    metrics: &State<RefreshMetrics>,
) -> Json<Outcome> {
    let outcome = reset_all(db.inner(), client.inner().as_ref(), options).await;
    metrics.observe(Trigger::Manual, &outcome);
    Json(outcome)
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing admin entrypoints", |rocket| async {
        rocket.mount(
            "/admin",
            routes![
                add_user,
                remove_user,
                update_all,
                update_all_async,
                update_user,
                reset_baseline,
                reset_baseline_all
            ],
        )
    })
}
