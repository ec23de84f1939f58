use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use crossbeam_utils::sync::WaitGroup;

use taskpool::{PoolError, PoolMode, TaskOutput, ThreadPool};

#[test]
fn fixed_pool_computes_reference_sums() {
    let mut pool = ThreadPool::new();
    pool.start(4).unwrap();

    let r1 = pool.submit(|| {
        thread::sleep(Duration::from_millis(20));
        1 + 2
    });
    let r2 = pool.submit(|| {
        thread::sleep(Duration::from_millis(20));
        1 + 2 + 3
    });
    let r3 = pool.submit(|| (1..100).sum::<i32>());

    assert_eq!(r1.get().extract::<i32>().unwrap(), 3);
    assert_eq!(r2.get().extract::<i32>().unwrap(), 6);
    assert_eq!(r3.get().extract::<i32>().unwrap(), 4950);

    pool.join();
}

#[test]
fn single_worker_executes_in_submission_order() {
    let mut pool = ThreadPool::new();
    pool.start(1).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..20usize {
        let order = Arc::clone(&order);
        pool.submit(move || order.lock().unwrap().push(i));
    }
    pool.join();

    let order = order.lock().unwrap();
    assert_eq!(*order, (0..20).collect::<Vec<_>>());
}

#[test]
fn sustained_full_queue_rejects_submission() {
    let mut pool = ThreadPool::new();
    pool.set_queue_capacity(1);
    pool.set_submit_timeout(Duration::from_millis(100));
    pool.start(1).unwrap();

    // Wedge the only worker, then occupy the single queue slot.
    let (gate_tx, gate_rx) = channel::unbounded::<()>();
    let blocker_gate = gate_rx.clone();
    let blocker = pool.submit(move || {
        let _ = blocker_gate.recv();
    });
    let filler_gate = gate_rx.clone();
    let filler = pool.submit(move || {
        let _ = filler_gate.recv();
    });

    let rejected = pool.submit(|| 0i32);
    assert!(rejected.is_rejected());

    // A rejected handle resolves immediately, well inside the budget.
    let started = Instant::now();
    assert!(matches!(rejected.get(), TaskOutput::Rejected));
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(matches!(
        rejected.get().extract::<i32>(),
        Err(PoolError::Rejected)
    ));

    drop(gate_tx);
    blocker.get();
    filler.get();
    pool.join();
}

#[test]
fn try_submit_surfaces_queue_full() {
    let mut pool = ThreadPool::new();
    pool.set_queue_capacity(1);
    pool.set_submit_timeout(Duration::from_millis(50));
    pool.start(1).unwrap();

    let (gate_tx, gate_rx) = channel::unbounded::<()>();
    let blocker_gate = gate_rx.clone();
    pool.submit(move || {
        let _ = blocker_gate.recv();
    });
    let filler_gate = gate_rx.clone();
    pool.submit(move || {
        let _ = filler_gate.recv();
    });

    assert!(matches!(pool.try_submit(|| 0i32), Err(PoolError::QueueFull)));

    drop(gate_tx);
    pool.join();
}

#[test]
fn submit_before_start_yields_a_rejected_handle() {
    let pool = ThreadPool::new();
    let handle = pool.submit(|| 1i32);
    assert!(handle.is_rejected());
    assert!(matches!(pool.try_submit(|| 1i32), Err(PoolError::NotRunning)));
}

#[test]
fn elastic_growth_stops_at_the_ceiling() {
    let mut pool = ThreadPool::new();
    pool.set_mode(PoolMode::Elastic);
    pool.set_thread_ceiling(4);
    pool.start(2).unwrap();
    assert_eq!(pool.threads(), 2);

    let (gate_tx, gate_rx) = channel::unbounded::<()>();
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let gate = gate_rx.clone();
            pool.submit(move || {
                let _ = gate.recv();
            })
        })
        .collect();

    // Every worker is wedged and the backlog is deep, so the pool must
    // have grown to exactly the ceiling.
    assert_eq!(pool.threads(), 4);

    drop(gate_tx);
    for handle in handles {
        handle.get();
    }
    assert_eq!(pool.threads(), 4);
    pool.join();
}

#[test]
fn surplus_workers_are_reclaimed_after_the_idle_timeout() {
    let mut pool = ThreadPool::new();
    pool.set_mode(PoolMode::Elastic);
    pool.set_thread_ceiling(4);
    pool.set_idle_timeout(Duration::from_millis(50));
    pool.start(1).unwrap();

    let handles: Vec<_> = (0..12)
        .map(|_| pool.submit(|| thread::sleep(Duration::from_millis(50))))
        .collect();
    assert_eq!(pool.threads(), 4);
    for handle in handles {
        handle.get();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.threads() > 1 {
        assert!(
            Instant::now() < deadline,
            "pool did not shrink back to its initial size"
        );
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(pool.threads(), 1);
    pool.join();
}

#[test]
fn handle_clones_observe_the_identical_value() {
    let mut pool = ThreadPool::new();
    pool.start(2).unwrap();

    let handle = pool.submit(|| String::from("shared result"));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || {
                let output = handle.get();
                output.value().unwrap().downcast::<String>().unwrap()
            })
        })
        .collect();

    let values: Vec<Arc<String>> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    for value in &values {
        assert_eq!(value.as_str(), "shared result");
        assert!(Arc::ptr_eq(value, &values[0]));
    }
    pool.join();
}

#[test]
fn panicking_task_reports_failure_and_pool_survives() {
    let mut pool = ThreadPool::new();
    pool.start(2).unwrap();

    let failed = pool.submit(|| -> i32 { panic!("boom") });
    match failed.get() {
        TaskOutput::Failed(msg) => assert!(msg.contains("boom")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(matches!(
        failed.get().extract::<i32>(),
        Err(PoolError::TaskFailed(_))
    ));

    let ok = pool.submit(|| 7i32);
    assert_eq!(ok.get().extract::<i32>().unwrap(), 7);
    pool.join();
}

#[test]
fn immediate_shutdown_completes_with_no_tasks() {
    let mut pool = ThreadPool::new();
    pool.start(4).unwrap();
    pool.join();
}

#[test]
fn shutdown_drains_queued_tasks() {
    let mut pool = ThreadPool::new();
    pool.start(1).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    pool.join();

    assert_eq!(counter.load(Ordering::SeqCst), 50);
}

#[test]
fn join_timeout_expires_while_a_task_is_wedged() {
    let mut pool = ThreadPool::new();
    pool.start(1).unwrap();

    let (gate_tx, gate_rx) = channel::unbounded::<()>();
    pool.submit(move || {
        let _ = gate_rx.recv();
    });

    assert!(matches!(
        pool.join_timeout(Duration::from_millis(200)),
        Err(PoolError::ShutdownTimedOut)
    ));

    // Unwedge so the detached worker can exit.
    drop(gate_tx);
}

#[test]
fn concurrent_submitters_all_receive_their_results() {
    let mut pool = ThreadPool::new();
    pool.start(4).unwrap();
    let pool = Arc::new(pool);

    let wg = WaitGroup::new();
    for t in 0..8usize {
        let pool = Arc::clone(&pool);
        let wg = wg.clone();
        thread::spawn(move || {
            for i in 0..10usize {
                let n = t * 10 + i;
                let handle = pool.submit(move || n * 2);
                assert_eq!(handle.get().extract::<usize>().unwrap(), n * 2);
            }
            drop(wg);
        });
    }
    wg.wait();
}

#[test]
fn configuration_is_frozen_after_start() {
    let mut pool = ThreadPool::new();
    pool.start(2).unwrap();

    pool.set_mode(PoolMode::Elastic);
    pool.set_queue_capacity(1);
    pool.set_thread_ceiling(1);
    pool.set_submit_timeout(Duration::from_millis(1));

    assert_eq!(pool.mode(), PoolMode::Fixed);
    assert!(pool.is_running());
    assert_eq!(pool.threads(), 2);

    // The frozen 1 s budget still applies: a fast submission succeeds.
    let handle = pool.submit(|| 5i32);
    assert_eq!(handle.get().extract::<i32>().unwrap(), 5);
    pool.join();
}
