#[macro_use]
extern crate rocket;

mod entrypoints;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rocket::http::{Method, Status};
use rocket::serde::json::Json;
use rocket::Request;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use rocket_prometheus::PrometheusMetrics;
use shared::leetcode::LeetCodeClient;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use leetcode_leaderboard_server::{
    config::{AdminToken, Env},
    db,
    metrics::RefreshMetrics,
    scheduler,
    types::ErrorResponse,
};

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorResponse>) {
    let detail = match status.code {
        401 => "Invalid or missing admin token",
        404 => "Not found",
        422 => "Invalid request body",
        _ => status.reason_lossy(),
    };
    (
        status,
        Json(ErrorResponse {
            detail: detail.to_string(),
        }),
    )
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");
    let options = env.refresh_options();
    let client = Arc::new(
        LeetCodeClient::new(env.leetcode_graphql_url.clone(), env.request_timeout())
            .expect("Failed to create LeetCode client"),
    );

    let prometheus = PrometheusMetrics::new();
    let refresh_metrics = RefreshMetrics::new().expect("Failed to create refresh metrics");
    refresh_metrics
        .register(prometheus.registry())
        .expect("Failed to register refresh metrics");

    let cors = {
        let origins = env.cors_origins();
        let allowed_origins = match &origins {
            Some(origins) => AllowedOrigins::some_exact(origins.as_slice()),
            None => AllowedOrigins::all(),
        };
        CorsOptions {
            allowed_origins,
            allowed_methods: [Method::Get, Method::Post, Method::Delete, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
            allowed_headers: AllowedHeaders::all(),
            // Credentials cannot be combined with a wildcard origin.
            allow_credentials: origins.is_some(),
            ..Default::default()
        }
        .to_cors()
        .expect("Failed to build CORS options")
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    let span = tracing::info_span!("Starting Rocket");
    let _enter = span.enter();

    let mut server = rocket::build()
        .manage(AdminToken(env.admin_token.clone()))
        .manage(client.clone())
        .manage(options.clone())
        .manage(refresh_metrics)
        .attach(db::stage())
        .attach(cors)
        .attach(prometheus.clone())
        .mount("/metrics", prometheus)
        .mount(
            "/",
            SwaggerUi::new("/docs/<_..>")
                .url("/api-docs/openapi.json", entrypoints::ApiDoc::openapi()),
        )
        .register("/", catchers![default_catcher]);

    if env.refresh_enabled {
        server = server.attach(scheduler::stage(
            client,
            options,
            env.refresh_interval(),
            running,
        ));
    } else {
        tracing::info!("Scheduled refresh is disabled");
    }

    server
        .attach(rocket::fairing::AdHoc::on_shutdown(
            "Stop refreshing account stats",
            |_| {
                Box::pin(async move {
                    running_clone.store(false, Ordering::Relaxed);
                })
            },
        ))
        .attach(entrypoints::stage())
}
