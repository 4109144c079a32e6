use corio::task;
use corio::time::{sleep, sleep_until, timeout};
use std::time::{Duration, Instant};

#[corio::test]
async fn test_sleep_basic() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "Sleep should wait at least the specified duration"
    );
}

#[corio::test]
async fn test_sleep_zero_duration() {
    let start = Instant::now();
    sleep(Duration::ZERO).await;

    assert!(
        start.elapsed() < Duration::from_millis(10),
        "Zero duration sleep should be fast"
    );
}

#[corio::test]
async fn test_sleep_until_past_deadline() {
    let deadline = Instant::now();
    let sleep = sleep_until(deadline);

    assert!(sleep.is_elapsed());
    assert_eq!(sleep.deadline(), deadline);
    sleep.await;
}

#[corio::test(worker_threads = 2)]
async fn test_concurrent_sleeps_overlap() {
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| task::spawn(sleep(Duration::from_millis(50))))
        .collect();

    for handle in handles {
        handle.await;
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(
        elapsed < Duration::from_millis(500),
        "Sleeps should run concurrently, took {elapsed:?}"
    );
}

#[corio::test]
async fn test_timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(200), handle).await;

    assert!(
        matches!(result, Ok(v) if v == 123),
        "Timeout should return Ok(123)"
    );
}

#[corio::test]
async fn test_timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(100)).await;
        456
    });
    let result = timeout(Duration::from_millis(20), handle).await;

    assert!(
        result.is_err(),
        "Timeout should return an error when deadline is exceeded"
    );
    assert_eq!(result.unwrap_err().to_string(), "deadline has elapsed");
}

#[corio::test(strategy = "manual")]
async fn test_dropped_sleep_does_not_fire() {
    {
        let abandoned = timeout(Duration::from_millis(5), sleep(Duration::from_millis(50))).await;
        assert!(abandoned.is_err());
    }

    let start = Instant::now();
    sleep(Duration::from_millis(80)).await;
    assert!(start.elapsed() >= Duration::from_millis(80));
}
