use std::collections::HashMap;
use std::io;
use std::time::Duration;

use metrics::Unit;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use recollect::cache::{
    METRIC_CACHE_COALESCED, METRIC_CACHE_FETCH_ERROR, METRIC_CACHE_FETCH_MS, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS, QueryClient,
};
use recollect::infra::telemetry;
use recollect::keys::{cards, decks};

#[tokio::test]
async fn cache_paths_emit_expected_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let client = QueryClient::default();
    let first = decks::detail(1);
    let second = decks::detail(2);
    let failing = cards::detail(3);

    // miss, then hit
    client
        .ensure(first.clone(), || async { Ok::<_, io::Error>(1u32) })
        .await
        .expect("first fetch");
    client
        .ensure(first.clone(), || async { Ok::<_, io::Error>(1u32) })
        .await
        .expect("cached");

    // one miss joined by a second caller
    let slow = || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, io::Error>(2u32)
    };
    let (a, b) = tokio::join!(
        client.ensure(second.clone(), slow),
        client.ensure(second.clone(), slow)
    );
    assert_eq!(a.expect("leader"), b.expect("follower"));

    // a failed fetch
    client
        .ensure::<u32, _, _, _>(failing.clone(), || async {
            Err(io::Error::other("backend down"))
        })
        .await
        .expect_err("fetch fails");

    assert_eq!(client.invalidate(&decks::all()), 2);

    let mut counters = HashMap::new();
    let mut histograms = HashMap::new();
    for (composite_key, unit, _, value) in snapshotter.snapshot().into_vec() {
        let name = composite_key.key().name().to_string();
        match value {
            DebugValue::Counter(count) => {
                counters.insert(name, count);
            }
            DebugValue::Histogram(samples) => {
                histograms.insert(name, (unit, samples.len()));
            }
            DebugValue::Gauge(_) => {}
        }
    }

    let expected = [
        (METRIC_CACHE_MISS, 3),
        (METRIC_CACHE_HIT, 1),
        (METRIC_CACHE_COALESCED, 1),
        (METRIC_CACHE_FETCH_ERROR, 1),
        (METRIC_CACHE_INVALIDATED, 2),
    ];
    for (metric, count) in expected {
        assert_eq!(counters.get(metric), Some(&count), "metric {metric}");
    }

    let (unit, samples) = histograms
        .get(METRIC_CACHE_FETCH_MS)
        .expect("fetch latency recorded");
    assert_eq!(*unit, Some(Unit::Milliseconds));
    assert_eq!(*samples, 3);
}
