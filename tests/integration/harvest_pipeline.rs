//! End-to-end pipeline scenarios over in-memory backends

use catalog_harvester::downloader::{DownloadReport, HarvestConfig, Harvester, RateLimiter};
use catalog_harvester::fetcher::EndReason;
use catalog_harvester::shutdown::ShutdownCoordinator;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::common::{body_for, link_for, MemoryCatalog, MemoryTransport};

fn config(dir: &Path) -> HarvestConfig {
    HarvestConfig::default()
        .with_output_dir(dir)
        .with_rate_interval(Duration::from_millis(10))
}

fn files_in(dir: &Path) -> HashSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_popular_entries_are_downloaded() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new(&[&[
        ("obscure", 500),
        ("popular", 1500),
        ("famous", 2000),
    ]]));
    let transport = Arc::new(MemoryTransport::default());

    let summary = Harvester::new(config(temp.path()), catalog.clone(), transport.clone())
        .unwrap()
        .run()
        .await;

    assert_eq!(summary.end, EndReason::EndOfCatalog);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.entries_seen, 3);
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_complete());
    assert_eq!(catalog.requests(), 2, "page 1 then the empty page 2");

    assert_eq!(
        files_in(temp.path()),
        HashSet::from(["popular-1.0.zip".to_string(), "famous-1.0.zip".to_string()])
    );
    assert_eq!(
        std::fs::read(temp.path().join("famous-1.0.zip")).unwrap(),
        body_for("famous")
    );
    assert!(!transport.open_counts().contains_key(&link_for("obscure")));
}

#[tokio::test]
async fn test_first_page_exhausted_downloads_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new(&[&[("popular", 5000)]]).failing(1));
    let transport = Arc::new(MemoryTransport::default());

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        Harvester::new(config(temp.path()), catalog, transport.clone())
            .unwrap()
            .run(),
    )
    .await
    .expect("harvest must terminate after fetch exhaustion");

    assert_eq!(summary.end, EndReason::FetchExhausted { page: 1 });
    assert_eq!(summary.admitted, 0);
    assert_eq!(summary.succeeded + summary.failed, 0);
    assert!(transport.opened().is_empty());
    assert!(files_in(temp.path()).is_empty());
}

#[tokio::test]
async fn test_exhaustion_mid_catalog_drains_admitted_items() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(
        MemoryCatalog::new(&[&[("a", 5000), ("b", 5000)], &[("c", 5000)], &[("d", 5000)]])
            .failing(2),
    );
    let transport = Arc::new(MemoryTransport::default());

    let summary = Harvester::new(config(temp.path()), catalog.clone(), transport)
        .unwrap()
        .run()
        .await;

    assert_eq!(summary.end, EndReason::FetchExhausted { page: 2 });
    assert_eq!(summary.succeeded, 2);
    assert_eq!(catalog.requests(), 2, "no page after the failed one is requested");
    assert_eq!(
        files_in(temp.path()),
        HashSet::from(["a-1.0.zip".to_string(), "b-1.0.zip".to_string()])
    );
}

#[tokio::test]
async fn test_transport_failure_is_isolated() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new(&[
        &[("ok-one", 3000), ("broken", 3000)],
        &[("ok-two", 3000)],
    ]));
    let transport = Arc::new(MemoryTransport::default().refusing("broken"));

    let summary = Harvester::new(config(temp.path()), catalog, transport.clone())
        .unwrap()
        .run()
        .await;

    assert_eq!(summary.end, EndReason::EndOfCatalog);
    assert_eq!(summary.admitted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_complete());
    assert_eq!(
        files_in(temp.path()),
        HashSet::from(["ok-one-1.0.zip".to_string(), "ok-two-1.0.zip".to_string()])
    );
    assert_eq!(transport.open_counts()[&link_for("broken")], 1, "no retry at this layer");
}

#[tokio::test]
async fn test_entry_without_link_is_admitted_and_fails() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(
        MemoryCatalog::new(&[&[("linked", 3000), ("unlinked", 3000), ("quiet", 5)]])
            .without_link("unlinked"),
    );
    let transport = Arc::new(MemoryTransport::default());
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);

    let summary = Harvester::new(config(temp.path()), catalog, transport.clone())
        .unwrap()
        .with_observer(Arc::new(move |report: &DownloadReport| {
            if !report.is_success() {
                sink.lock().unwrap().push(report.slug.clone());
            }
        }))
        .run()
        .await;

    assert_eq!(summary.end, EndReason::EndOfCatalog);
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(*failures.lock().unwrap(), vec!["unlinked".to_string()]);
    assert_eq!(transport.opened().len(), 1, "an empty link is never requested");
    assert_eq!(
        files_in(temp.path()),
        HashSet::from(["linked-1.0.zip".to_string()])
    );
}

#[tokio::test]
async fn test_every_admitted_item_is_downloaded_exactly_once() {
    let temp = tempfile::tempdir().unwrap();
    let slugs: Vec<String> = (0..40).map(|i| format!("item-{i:02}")).collect();
    let pages: Vec<Vec<(&str, u64)>> = slugs
        .chunks(7)
        .map(|chunk| chunk.iter().map(|s| (s.as_str(), 10_000)).collect())
        .collect();
    let page_refs: Vec<&[(&str, u64)]> = pages.iter().map(Vec::as_slice).collect();
    let catalog = Arc::new(MemoryCatalog::new(&page_refs));
    let transport = Arc::new(MemoryTransport::default());

    let config = config(temp.path())
        .with_rate_interval(Duration::from_millis(1))
        .with_queue_capacity(2);
    let summary = Harvester::new(config, catalog, transport.clone())
        .unwrap()
        .run()
        .await;

    assert_eq!(summary.admitted, 40);
    assert_eq!(summary.succeeded, 40);
    let counts = transport.open_counts();
    assert_eq!(counts.len(), 40);
    assert!(counts.values().all(|&n| n == 1));
    assert_eq!(files_in(temp.path()).len(), 40);
}

#[tokio::test]
async fn test_observer_sees_every_report_before_return() {
    let temp = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new(&[&[("x", 2000), ("y", 2000)]]));
    let transport = Arc::new(MemoryTransport::default().refusing("y"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let summary = Harvester::new(config(temp.path()), catalog, transport)
        .unwrap()
        .with_observer(Arc::new(move |report: &DownloadReport| {
            sink.lock().unwrap().push((report.slug.clone(), report.is_success()));
        }))
        .run()
        .await;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec![("x".to_string(), true), ("y".to_string(), false)]);
    assert_eq!(summary.succeeded + summary.failed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_admissions_are_spaced_by_the_interval() {
    let temp = tempfile::tempdir().unwrap();
    let interval = Duration::from_millis(500);
    let catalog = Arc::new(MemoryCatalog::new(&[
        &[("a", 1000), ("b", 1000), ("c", 1000)],
        &[("d", 1000), ("e", 1000)],
    ]));
    let transport = Arc::new(MemoryTransport::default());

    let config = config(temp.path()).with_rate_interval(interval);
    let limiter = RateLimiter::new(interval).unwrap();
    Harvester::new(config, catalog, transport.clone())
        .unwrap()
        .with_limiter(limiter)
        .run()
        .await;

    let mut opened: Vec<_> = transport.opened().into_iter().map(|(_, at)| at).collect();
    opened.sort();
    assert_eq!(opened.len(), 5);
    for pair in opened.windows(2) {
        assert!(
            pair[1] - pair[0] >= interval,
            "admissions {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_admission_clock_starts_with_the_run() {
    let temp = tempfile::tempdir().unwrap();
    let interval = Duration::from_millis(500);
    let catalog = Arc::new(MemoryCatalog::new(&[&[("late", 4000)]]));
    let transport = Arc::new(MemoryTransport::default());

    let harvester = Harvester::new(
        config(temp.path()).with_rate_interval(interval),
        catalog,
        transport.clone(),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let started = tokio::time::Instant::now();
    let summary = harvester.run().await;

    assert_eq!(summary.succeeded, 1);
    let opened = transport.opened();
    assert_eq!(opened.len(), 1);
    assert!(
        opened[0].1 - started >= interval,
        "first admission {:?} after run start",
        opened[0].1 - started
    );
}

#[tokio::test]
async fn test_cancelled_run_terminates() {
    let temp = tempfile::tempdir().unwrap();
    let page: Vec<(String, u64)> = (0..50).map(|i| (format!("slow-{i}"), 5000)).collect();
    let page: Vec<(&str, u64)> = page.iter().map(|(s, p)| (s.as_str(), *p)).collect();
    let catalog = Arc::new(MemoryCatalog::new(&[page.as_slice()]));
    let transport = Arc::new(MemoryTransport::default());
    let shutdown = ShutdownCoordinator::shared();

    let trigger = Arc::clone(&shutdown);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.request_shutdown();
    });

    let config = config(temp.path()).with_rate_interval(Duration::from_millis(20));
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        Harvester::new(config, catalog, transport)
            .unwrap()
            .with_shutdown(shutdown)
            .run(),
    )
    .await
    .expect("cancelled harvest must terminate");

    assert_eq!(summary.end, EndReason::Cancelled);
    assert!(summary.admitted < 50);
    assert_eq!(summary.succeeded + summary.failed, summary.admitted);
}
