use corio::task::{self, Generator};
use corio::time::sleep;
use std::time::Duration;

#[corio::test]
async fn test_generator_yields_in_order() {
    let mut numbers = Generator::new(|y| async move {
        for i in 0..5 {
            y.yield_value(i).await;
        }
    });

    let mut seen = Vec::new();
    while let Some(n) = numbers.next().await {
        seen.push(n);
    }

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert!(numbers.is_finished());
    assert_eq!(numbers.next().await, None);
}

#[corio::test]
async fn test_generator_body_can_sleep() {
    let mut ticks = Generator::new(|y| async move {
        for i in 0..3 {
            sleep(Duration::from_millis(5)).await;
            y.yield_value(i * 10).await;
        }
    });

    assert_eq!(ticks.next().await, Some(0));
    assert_eq!(ticks.next().await, Some(10));
    assert_eq!(ticks.next().await, Some(20));
    assert_eq!(ticks.next().await, None);
}

#[corio::test]
async fn test_generator_is_lazy() {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut lazy = Generator::new(move |y| async move {
        tx.send("started").unwrap();
        y.yield_value(()).await;
    });

    assert!(rx.try_recv().is_err(), "Body should not run before next()");
    assert_eq!(lazy.next().await, Some(()));
    assert_eq!(rx.try_recv(), Ok("started"));
}

#[corio::test(worker_threads = 2)]
async fn test_generator_consumed_in_spawned_task() {
    let handle = task::spawn(async {
        let mut words = Generator::new(|y| async move {
            y.yield_value("alpha".to_owned()).await;
            y.yield_value("beta".to_owned()).await;
        });

        let mut out = Vec::new();
        while let Some(word) = words.next().await {
            out.push(word);
        }
        out
    });

    assert_eq!(handle.await, vec!["alpha", "beta"]);
}
