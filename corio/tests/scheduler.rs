use corio::task::{self, spawn, yield_now};
use corio::time::sleep;
use corio::{Handle, SchedulerBuilder, ThreadStrategy};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn test_single_worker_thread() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();

    let result = scheduler.block_on(async { 42 });
    assert_eq!(result, 42);
}

#[test]
fn test_multiple_worker_threads() {
    let scheduler = SchedulerBuilder::new().worker_threads(4).build().unwrap();

    let result = scheduler.block_on(async { 100 });
    assert_eq!(result, 100);
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_worker_threads_zero_panics() {
    let _ = SchedulerBuilder::new().worker_threads(0).build();
}

#[test]
fn test_worker_threads_stress() {
    let scheduler = SchedulerBuilder::new().worker_threads(8).build().unwrap();

    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();

    scheduler.block_on(async move {
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let counter = counter_clone.clone();
                spawn(async move {
                    *counter.lock().unwrap() += 1;
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(*counter.lock().unwrap(), 100);
}

#[test]
fn test_chain_spawn() {
    let scheduler = SchedulerBuilder::new().worker_threads(4).build().unwrap();

    let result = scheduler.block_on(async {
        let handle1 = spawn(async {
            let handle2 = spawn(async {
                let handle3 = spawn(async { 10 });
                handle3.await + 20
            });
            handle2.await + 30
        });
        handle1.await + 40
    });

    assert_eq!(result, 100);
}

#[test]
fn test_two_threads_run_every_task() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();

    let completed = Arc::new(Mutex::new(HashSet::new()));
    let completed_clone = completed.clone();

    scheduler.block_on(async move {
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let completed = completed_clone.clone();
                spawn(async move {
                    completed.lock().unwrap().insert(i);
                    i
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    let set = completed.lock().unwrap();
    assert_eq!(set.len(), 20);
    for i in 0..20 {
        assert!(set.contains(&i), "Task {} should have completed", i);
    }
}

#[test]
fn test_sequential_schedulers() {
    for n in 1..=4 {
        let scheduler = SchedulerBuilder::new().worker_threads(n).build().unwrap();
        let result = scheduler.block_on(async move { n * 10 });
        assert_eq!(result, n * 10);
        drop(scheduler);
    }
}

#[test]
fn test_schedule_tracks_outstanding_tasks() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();
    assert!(scheduler.is_empty());

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));

    for _ in 0..3 {
        let release_rx = release_rx.clone();
        assert!(scheduler.schedule(async move {
            loop {
                if release_rx.lock().unwrap().try_recv().is_ok() {
                    break;
                }
                sleep(Duration::from_millis(2)).await;
            }
        }));
    }

    assert_eq!(scheduler.size(), 3);
    assert!(!scheduler.is_empty());

    for _ in 0..3 {
        release_tx.send(()).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || scheduler.is_empty()));
}

#[test]
fn test_schedule_rejected_after_shutdown() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();
    scheduler.shutdown();

    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = ran.clone();

    assert!(!scheduler.schedule(async move {
        ran_clone.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(scheduler.spawn(async { 1 }).is_none());
    assert!(scheduler.is_empty());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();
    assert_eq!(scheduler.block_on(async { 1 }), 1);

    scheduler.shutdown();
    scheduler.shutdown();

    assert!(scheduler.handle().is_shutting_down());
}

#[test]
fn test_shutdown_waits_for_scheduled_tasks() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let done = done.clone();
        scheduler.schedule(async move {
            sleep(Duration::from_millis(20)).await;
            done.fetch_add(1, Ordering::SeqCst);
        });
    }

    scheduler.shutdown();

    assert_eq!(done.load(Ordering::SeqCst), 4);
    assert!(scheduler.is_empty());
}

#[test]
fn test_panicking_task_does_not_stop_scheduler() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();

    assert!(scheduler.schedule(async {
        panic!("boom");
    }));

    assert!(wait_until(Duration::from_secs(5), || scheduler.is_empty()));
    assert_eq!(scheduler.block_on(async { 5 }), 5);
}

#[test]
#[should_panic(expected = "joined task panicked")]
fn test_join_handle_propagates_panic() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();

    scheduler.block_on(async {
        let inner = spawn(async {
            panic!("inner task failed");
        });

        inner.await
    });
}

#[test]
fn test_yield_now_lets_other_tasks_progress() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();

    let order = scheduler.block_on(async {
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = order.clone();
            spawn(async move {
                order.lock().unwrap().push("first:start");
                yield_now().await;
                order.lock().unwrap().push("first:end");
            })
        };
        let second = {
            let order = order.clone();
            spawn(async move {
                order.lock().unwrap().push("second");
            })
        };

        first.await;
        second.await;

        Arc::try_unwrap(order).unwrap().into_inner().unwrap()
    });

    assert_eq!(order, vec!["first:start", "second", "first:end"]);
}

#[test]
fn test_handle_current_inside_task() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();

    assert!(Handle::try_current().is_none());

    let size_seen = scheduler.block_on(async {
        let handle = Handle::current();
        handle.size()
    });

    // The block_on task itself is outstanding while it runs.
    assert_eq!(size_seen, 1);
}

#[test]
fn test_manual_strategy_runs_on_caller_thread() {
    let scheduler = SchedulerBuilder::new()
        .thread_strategy(ThreadStrategy::Manual)
        .build()
        .unwrap();
    assert_eq!(scheduler.thread_strategy(), ThreadStrategy::Manual);

    let caller = thread::current().id();
    let ran_on = Arc::new(Mutex::new(None));
    let ran_on_clone = ran_on.clone();

    assert!(scheduler.schedule(async move {
        *ran_on_clone.lock().unwrap() = Some(thread::current().id());
    }));

    // Nothing runs until the caller drives the scheduler.
    thread::sleep(Duration::from_millis(10));
    assert!(ran_on.lock().unwrap().is_none());
    assert_eq!(scheduler.size(), 1);

    let resumed = scheduler.run_once(Some(Duration::ZERO));

    assert_eq!(resumed, 1);
    assert_eq!(*ran_on.lock().unwrap(), Some(caller));
    assert!(scheduler.is_empty());
}

#[test]
fn test_manual_strategy_drives_timers() {
    let scheduler = SchedulerBuilder::new()
        .thread_strategy(ThreadStrategy::Manual)
        .build()
        .unwrap();

    let start = Instant::now();
    let value = scheduler.block_on(async {
        let slow = spawn(async {
            sleep(Duration::from_millis(30)).await;
            2
        });
        sleep(Duration::from_millis(10)).await;
        slow.await * 21
    });

    assert_eq!(value, 42);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_task_spawn_from_handle() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build().unwrap();
    let handle = scheduler.handle();

    let join = handle.spawn(async { "done" }).unwrap();
    let result = scheduler.block_on(join);

    assert_eq!(result, "done");
    assert!(wait_until(Duration::from_secs(5), || handle.is_empty()));
}

#[test]
fn test_join_handle_is_finished() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build().unwrap();

    let join = scheduler.spawn(async { 3 }).unwrap();
    assert!(wait_until(Duration::from_secs(5), || join.is_finished()));

    assert_eq!(scheduler.block_on(join), 3);
}

#[corio::test(worker_threads = 2)]
async fn test_macro_spawns_on_current_scheduler() {
    let handles: Vec<task::JoinHandle<usize>> = (0..5).map(|i| spawn(async move { i })).collect();

    let mut sum = 0;
    for handle in handles {
        sum += handle.await;
    }

    assert_eq!(sum, 10);
}

#[corio::test(strategy = "manual")]
async fn test_macro_manual_strategy() {
    sleep(Duration::from_millis(5)).await;
    assert!(Handle::try_current().is_some());
}
