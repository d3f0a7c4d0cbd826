//! Simulated elevator sensors posting readings to the ingestion API.

use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
pub struct SensorArgs {
    /// Base URL of the ingestion API
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPayload {
    pub floor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePayload {
    pub floor: i64,
    pub vacant: bool,
}

/// A payload to post after waiting `wait`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<P> {
    pub wait: Duration,
    pub payload: P,
}

fn schedule<P: Clone>(initial: P, waits: &[u64], next: impl Fn(&P) -> P) -> Vec<Step<P>> {
    let mut steps = vec![Step {
        wait: Duration::ZERO,
        payload: initial,
    }];
    for &secs in waits {
        let payload = next(&steps[steps.len() - 1].payload);
        steps.push(Step {
            wait: Duration::from_secs(secs),
            payload,
        });
    }
    steps
}

/// Floor calls climbing one floor per call.
pub fn demand_schedule() -> Vec<Step<DemandPayload>> {
    schedule(DemandPayload { floor: 5 }, &[5, 10, 15], |prev| DemandPayload {
        floor: prev.floor + 1,
    })
}

/// Elevator moving up one floor per report, occupancy toggling.
pub fn state_schedule() -> Vec<Step<StatePayload>> {
    schedule(
        StatePayload {
            floor: 2,
            vacant: true,
        },
        &[5, 7, 9, 12, 13, 15, 17, 20, 23, 26, 28, 30],
        |prev| StatePayload {
            floor: prev.floor + 1,
            vacant: !prev.vacant,
        },
    )
}

/// Posts `payload` as JSON, a response body that is not JSON yields `None`.
pub async fn post_payload<P: Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
) -> Result<(reqwest::StatusCode, Option<serde_json::Value>), reqwest::Error> {
    let response = client.post(url).json(payload).send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, serde_json::from_str(&body).ok()))
}

/// Replays `steps` against `<base_url>/<path>`, returns the failed posts.
pub async fn run_schedule<P: Serialize>(base_url: &str, path: &str, steps: &[Step<P>]) -> usize {
    let client = reqwest::Client::new();
    let url = format!("{}/{}", base_url.trim_end_matches('/'), path);
    let mut failed = 0;
    for step in steps {
        tokio::time::sleep(step.wait).await;
        match post_payload(&client, &url, &step.payload).await {
            Ok((status, body)) => info!(%status, ?body, "Response"),
            Err(e) => {
                warn!(%e, url, "Post failed");
                failed += 1;
            }
        }
    }
    failed
}

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
