mod utils;
#[allow(unused)]
use utils::*;

use ntest::timeout;
use volley::prelude::*;

#[tracing_test::traced_test]
#[tokio::test]
#[timeout(20_000)]
async fn refused_configuration_is_skipped() {
    let service = mock_service::spawn().await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let matrix = SuiteMatrix::from_configs(vec![
        short_config(&refused_url(), "unreachable"),
        short_config(&service.url("/api/accounts"), "healthy"),
    ])
    .unwrap();

    let driver = SuiteDriver::new(
        HttpGenerator::default(),
        FsRunStore::new(dir.path(), "account-creation"),
    );
    let report = driver.run_suite(&matrix).await;

    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()[0].0, "unreachable");
    assert_eq!(report.completed().len(), 1);
    assert!(logs_contain("Configuration `unreachable` failed"));

    let store = driver.store();
    let keys = store.list().await.unwrap();
    assert_eq!(keys.len(), 1);
    let record = store.get(&keys[0]).await.unwrap();
    assert_eq!(record.label(), "healthy");
    assert!(record.result().stats().counts.success > 0);

    let analysis = analyze(store).await.unwrap();
    assert_eq!(analysis.best().label(), "healthy");

    let path = store
        .write_report(&analysis.render_markdown())
        .await
        .unwrap();
    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("| healthy |"));
}
