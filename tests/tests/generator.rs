mod utils;
#[allow(unused)]
use utils::*;

use ntest::timeout;
use std::collections::HashSet;
use std::time::Duration;
use volley::core::{Outcome, StatusClass};
use volley::prelude::*;

#[tokio::test]
#[timeout(10_000)]
async fn created_accounts_are_successes() {
    let service = mock_service::spawn().await.unwrap();
    let config = short_config(&service.url("/api/accounts"), "created");

    let raw = HttpGenerator::default().generate(&config).await.unwrap();
    let counts = &raw.stats().counts;

    assert!(counts.success > 0);
    assert_eq!(counts.non_2xx(), 0);
    assert!(counts.sent >= counts.total);
    assert!(counts.total >= counts.status_class_sum());
    assert_eq!(raw.stats().requests.total, Some(counts.status_class_sum() as f64));
    assert!(raw.stats().latency.p99().is_some());
}

#[tokio::test]
#[timeout(10_000)]
async fn missing_username_is_a_client_error() {
    let service = mock_service::spawn().await.unwrap();

    let res = reqwest::Client::new()
        .post(service.url("/api/accounts"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(
        Outcome::from_status(res.status().as_u16()),
        Outcome::Status(StatusClass::ClientError)
    );
    assert!(service.accounts.usernames().is_empty());
}

#[tokio::test]
#[timeout(10_000)]
async fn throttled_responses_are_data() {
    let service = mock_service::spawn().await.unwrap();
    let config = short_config(&service.url("/throttled/5/api/accounts"), "throttled");

    let raw = HttpGenerator::default().generate(&config).await.unwrap();
    let counts = &raw.stats().counts;

    assert!(counts.success > 0);
    assert!(counts.client_error > 0);
    assert_eq!(counts.non_2xx(), counts.client_error);
}

#[tokio::test]
#[timeout(10_000)]
async fn unpipelined_requests_use_unique_usernames() {
    let service = mock_service::spawn().await.unwrap();
    let config = short_config(&service.url("/api/accounts"), "unique");

    let raw = HttpGenerator::default().generate(&config).await.unwrap();

    let usernames = service.accounts.usernames();
    let distinct: HashSet<&String> = usernames.iter().collect();
    assert_eq!(distinct.len(), usernames.len());
    assert!(usernames.len() as u64 >= raw.stats().counts.success);
    assert!(usernames.iter().all(|u| u.starts_with("user_")));
}

#[tokio::test]
#[timeout(10_000)]
async fn pipelined_batches_share_a_username() {
    let service = mock_service::spawn().await.unwrap();
    let config = RunConfig::builder(service.url("/api/accounts"))
        .duration(Duration::from_secs(1))
        .connections(3)
        .pipelining(5)
        .label("pipelined")
        .build()
        .unwrap();

    let raw = HttpGenerator::default().generate(&config).await.unwrap();
    assert!(raw.stats().counts.success > 3);

    let usernames = service.accounts.usernames();
    let distinct: HashSet<&String> = usernames.iter().collect();
    assert_eq!(distinct.len(), 3);
    assert!(usernames.iter().all(|u| u.starts_with("batch_user_")));
}

#[tokio::test]
#[timeout(10_000)]
async fn unreachable_target_is_a_transport_fault() {
    let config = short_config(&refused_url(), "unreachable");

    let err = HttpGenerator::default().generate(&config).await.unwrap_err();
    assert!(err.is_transport_fault(), "{err}");
}

#[tokio::test]
#[timeout(10_000)]
async fn workers_are_combined() {
    let service = mock_service::spawn().await.unwrap();
    let config = RunConfig::builder(service.url("/api/accounts"))
        .duration(Duration::from_secs(1))
        .connections(2)
        .workers(3)
        .label("multi-worker")
        .build()
        .unwrap();

    let results = Orchestrator::new(HttpGenerator::default())
        .run(&config)
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    let success: u64 = results.iter().map(|r| r.stats().counts.success).sum();

    let combined = aggregate(results).unwrap();
    assert_eq!(combined.workers(), 3);
    assert_eq!(combined.stats().counts.success, success);
    assert_eq!(combined.stats().latency.p99(), None);
}

#[tokio::test]
#[timeout(15_000)]
async fn stalled_target_has_no_latency_measurement() {
    let service = mock_service::spawn().await.unwrap();
    let config = short_config(&service.url("/delay/ms/3000/api/accounts"), "stalled");

    let raw = HttpGenerator::default().generate(&config).await.unwrap();
    let stats = raw.stats();

    assert_eq!(stats.counts.status_class_sum(), 0);
    assert_eq!(stats.requests.average, 0.);
    assert!(stats.latency.is_empty());
    assert_eq!(stats.latency.stddev, None);
    assert_eq!(stats.latency.p99(), None);

    let combined = aggregate(vec![raw]).unwrap();
    assert!(combined.to_string().contains("no responses measured"));

    let finished = combined.stats().finish;
    let report = AnalysisReport::new(vec![RunRecord::new("stalled", finished, combined)])
    .unwrap();
    assert!(report.latency_check_skipped());
    assert!(report.render_markdown().contains("latency was not measured"));
}
