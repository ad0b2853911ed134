use std::{collections::HashMap, time::Duration};

use itertools::Itertools;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::{SolvedCounts, StatsResult, Tier};

pub const DEFAULT_GRAPHQL_URL: &str = "https://leetcode.com/graphql";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

const USER_STATS_QUERY: &str = r#"
    query userProblemsSolved($username: String!) {
        matchedUser(username: $username) {
            submitStatsGlobal {
                acSubmissionNum {
                    difficulty
                    count
                }
            }
            profile {
                ranking
            }
        }
    }
"#;

/// Anything that can look up the solved-problem stats of one account.
///
/// Lookups never fail loudly: `None` means no stats were obtained, whatever
/// the cause.
#[async_trait::async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Option<StatsResult>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("GraphQL error: {0}")]
    GraphQl(serde_json::Value),
    #[error("user not found")]
    NotFound,
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<UserData>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserData {
    matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats_global: Option<SubmitStats>,
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    #[serde(default)]
    ac_submission_num: Vec<DifficultyCount>,
}

#[derive(Debug, Deserialize)]
struct DifficultyCount {
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    count: u32,
}

#[derive(Debug, Deserialize)]
struct Profile {
    ranking: Option<u64>,
}

impl GraphQlResponse {
    fn into_stats(self) -> Result<StatsResult, FetchError> {
        if let Some(errors) = self.errors {
            return Err(FetchError::GraphQl(errors));
        }
        let user = self
            .data
            .and_then(|data| data.matched_user)
            .ok_or(FetchError::NotFound)?;

        let mut counts = SolvedCounts::default();
        let mut total_solved = None;
        for stat in user
            .submit_stats_global
            .map(|s| s.ac_submission_num)
            .unwrap_or_default()
        {
            if let Some(tier) = Tier::from_label(&stat.difficulty) {
                counts.set(tier, stat.count);
            } else if stat.difficulty.eq_ignore_ascii_case("all") {
                total_solved = Some(stat.count);
            }
        }

        Ok(StatsResult {
            counts,
            total_solved,
            ranking: user.profile.and_then(|p| p.ranking),
        })
    }
}

/// Client for the public LeetCode GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct LeetCodeClient {
    http: reqwest::Client,
    url: String,
}

impl LeetCodeClient {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }

    #[instrument(skip(self))]
    pub async fn user_stats(&self, username: &str) -> Result<StatsResult, FetchError> {
        let body = json!({
            "query": USER_STATS_QUERY,
            "variables": { "username": username },
        });

        let response = self
            .http
            .post(&self.url)
            .header("Referer", "https://leetcode.com")
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response
            .json::<GraphQlResponse>()
            .await
            .map_err(classify)?
            .into_stats()
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e)
    }
}

#[async_trait::async_trait]
impl StatsSource for LeetCodeClient {
    async fn fetch(&self, identifier: &str) -> Option<StatsResult> {
        match self.user_stats(identifier).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Failed to fetch stats for {identifier}: {e}");
                None
            }
        }
    }
}

/// Looks up every distinct identifier one after another, in input order,
/// sleeping `delay` between consecutive lookups.
///
/// Every distinct identifier gets an entry; `None` marks a failed lookup.
#[instrument(skip(source, identifiers), fields(count = identifiers.len()))]
pub async fn fetch_many<S>(
    source: &S,
    identifiers: &[String],
    delay: Duration,
) -> HashMap<String, Option<StatsResult>>
where
    S: StatsSource + ?Sized,
{
    let identifiers: Vec<&String> = identifiers.iter().unique().collect();
    let mut results = HashMap::with_capacity(identifiers.len());

    for (i, identifier) in identifiers.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let stats = source.fetch(identifier).await;
        results.insert((*identifier).clone(), stats);
    }

    debug!(
        "Fetched stats for {} of {} accounts",
        results.values().filter(|s| s.is_some()).count(),
        results.len()
    );
    results
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    fn parse(body: serde_json::Value) -> Result<StatsResult, FetchError> {
        serde_json::from_value::<GraphQlResponse>(body)
            .expect("valid response shape")
            .into_stats()
    }

    #[test]
    fn parses_difficulty_counts() {
        let stats = parse(json!({
            "data": {
                "matchedUser": {
                    "submitStatsGlobal": {
                        "acSubmissionNum": [
                            { "difficulty": "All", "count": 26 },
                            { "difficulty": "Easy", "count": 12 },
                            { "difficulty": "Medium", "count": 9 },
                            { "difficulty": "Hard", "count": 5 },
                            { "difficulty": "Unrated", "count": 40 }
                        ]
                    },
                    "profile": { "ranking": 123456 }
                }
            }
        }))
        .unwrap();

        assert_eq!(stats.counts, SolvedCounts::new(12, 9, 5));
        assert_eq!(stats.total_solved, Some(26));
        assert_eq!(stats.ranking, Some(123456));
    }

    #[test]
    fn missing_tiers_default_to_zero() {
        let stats = parse(json!({
            "data": {
                "matchedUser": {
                    "submitStatsGlobal": {
                        "acSubmissionNum": [{ "difficulty": "hard", "count": 2 }]
                    },
                    "profile": null
                }
            }
        }))
        .unwrap();

        assert_eq!(stats.counts, SolvedCounts::new(0, 0, 2));
        assert_eq!(stats.total_solved, None);
        assert_eq!(stats.ranking, None);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let result = parse(json!({ "data": { "matchedUser": null } }));
        assert!(matches!(result, Err(FetchError::NotFound)));
    }

    #[test]
    fn error_payload_wins_over_data() {
        let result = parse(json!({
            "data": { "matchedUser": null },
            "errors": [{ "message": "That user does not exist." }]
        }));
        assert!(matches!(result, Err(FetchError::GraphQl(_))));
    }

    struct Scripted {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl StatsSource for Scripted {
        async fn fetch(&self, identifier: &str) -> Option<StatsResult> {
            self.calls.lock().unwrap().push(identifier.to_string());
            (identifier != "ghost").then(|| StatsResult::new(SolvedCounts::new(1, 0, 0)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_many_is_sequential_and_deduplicated() {
        let source = Scripted {
            calls: Mutex::new(vec![]),
        };
        let identifiers: Vec<String> = ["alice", "ghost", "alice", "bob"]
            .into_iter()
            .map(String::from)
            .collect();

        let start = tokio::time::Instant::now();
        let results = fetch_many(&source, &identifiers, Duration::from_secs(1)).await;

        assert_eq!(results.len(), 3);
        assert!(results["alice"].is_some());
        assert!(results["ghost"].is_none());
        assert!(results["bob"].is_some());
        assert_eq!(*source.calls.lock().unwrap(), vec!["alice", "ghost", "bob"]);
        // No delay after the last lookup.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn fetch_many_of_nothing_is_empty() {
        let source = Scripted {
            calls: Mutex::new(vec![]),
        };
        let results = fetch_many(&source, &[], DEFAULT_RATE_LIMIT_DELAY).await;
        assert!(results.is_empty());
    }

    const SERVER_ERROR: &str =
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const NOT_JSON: &str = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 9\r\n\
        connection: close\r\n\r\nnot json!";

    /// Reads one request, headers and body.
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local endpoint answering every request with `response`, or never
    /// answering at all when `response` is `None`.
    async fn serve(response: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    match response {
                        Some(response) => {
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        None => tokio::time::sleep(Duration::from_secs(30)).await,
                    }
                });
            }
        });
        format!("http://{addr}/graphql")
    }

    #[tokio::test]
    async fn error_status_is_absent() {
        let client = LeetCodeClient::new(serve(Some(SERVER_ERROR)).await, DEFAULT_TIMEOUT).unwrap();

        let result = client.user_stats("alice").await;
        assert!(
            matches!(result, Err(FetchError::Status(status)) if status.as_u16() == 500),
            "{result:?}"
        );
        assert!(client.fetch("alice").await.is_none());
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let client = LeetCodeClient::new(serve(None).await, Duration::from_millis(100)).unwrap();

        let result = client.user_stats("alice").await;
        assert!(matches!(result, Err(FetchError::Timeout)), "{result:?}");
        assert!(client.fetch("alice").await.is_none());
    }

    #[tokio::test]
    async fn non_json_body_is_absent() {
        let client = LeetCodeClient::new(serve(Some(NOT_JSON)).await, DEFAULT_TIMEOUT).unwrap();

        let result = client.user_stats("alice").await;
        assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
        assert!(client.fetch("alice").await.is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/graphql");
        let client = LeetCodeClient::new(url, DEFAULT_TIMEOUT).unwrap();
        assert!(client.fetch("alice").await.is_none());
    }
}
