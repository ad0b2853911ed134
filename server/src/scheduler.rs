use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rocket::{
    fairing::AdHoc,
    tokio::{
        self,
        task::JoinHandle,
        time::{self, MissedTickBehavior},
    },
};
use rocket_db_pools::Database;
use shared::leetcode::LeetCodeClient;
use tracing::{error, info};

use crate::{
    db::DB,
    metrics::{RefreshMetrics, Trigger},
    refresh::{refresh_all, RefreshOptions},
};

/// Runs `task` once per `period` until `running` is cleared. The first run
/// happens one full period after the call.
pub fn spawn_periodic<F, Fut>(
    period: Duration,
    running: Arc<AtomicBool>,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        while running.load(Ordering::Relaxed) {
            interval.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            task().await;
        }
    })
}

/// Refreshes every tracked account each `period` once Rocket has lifted off.
pub fn stage(
    client: Arc<LeetCodeClient>,
    options: RefreshOptions,
    period: Duration,
    running: Arc<AtomicBool>,
) -> AdHoc {
    AdHoc::on_liftoff("Refresh account stats every X minutes", move |rocket| {
        Box::pin(async move {
            let Some(db) = DB::fetch(rocket).cloned() else {
                error!("Database pool is not available, scheduled refresh disabled");
                return;
            };
            let metrics = rocket.state::<RefreshMetrics>().cloned();

            info!("Refreshing account stats every {} seconds", period.as_secs());
            spawn_periodic(period, running, move || {
                let db = db.clone();
                let client = client.clone();
                let options = options.clone();
                let metrics = metrics.clone();
                async move {
                    let outcome = refresh_all(&db, client.as_ref(), &options).await;
                    if let Some(metrics) = metrics {
                        metrics.observe(Trigger::Scheduled, &outcome);
                    }
                }
            });
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_period_until_stopped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let counter = runs.clone();
        let handle = spawn_periodic(Duration::from_secs(60), running.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        running.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        handle.await.unwrap();
    }
}
