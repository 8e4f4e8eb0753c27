//! Integration tests for the bounded scheduler: concurrency ceiling, FIFO
//! restart on completion, and join semantics.

use parallax::scheduler::{Scheduler, SchedulerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Tracks how many tasks are inside their body at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

// ==================== Bound ====================

#[test]
fn test_never_exceeds_max_parallel() {
    for (tasks, parallel) in [(10, 1), (12, 3), (25, 4), (8, 7)] {
        let scheduler = Scheduler::new(parallel);
        let gauge = Arc::new(Gauge::default());

        for i in 0..tasks {
            let gauge = Arc::clone(&gauge);
            scheduler
                .submit(move || {
                    gauge.enter();
                    thread::sleep(Duration::from_millis(1 + (i % 3) as u64));
                    gauge.exit();
                })
                .unwrap();
            assert!(scheduler.running() <= parallel);
        }
        scheduler.join().unwrap();

        assert!(gauge.peak.load(Ordering::SeqCst) <= parallel);
        assert_eq!(gauge.completed.load(Ordering::SeqCst), tasks);
        assert_eq!(scheduler.running(), 0);
        assert_eq!(scheduler.queued(), 0);
    }
}

#[test]
fn test_reaches_max_parallel() {
    let parallel = 3;
    let scheduler = Scheduler::new(parallel);
    let gauge = Arc::new(Gauge::default());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));
    let (entered_tx, entered_rx) = mpsc::channel::<()>();

    for _ in 0..parallel {
        let gauge = Arc::clone(&gauge);
        let release_rx = Arc::clone(&release_rx);
        let entered_tx = entered_tx.clone();
        scheduler
            .submit(move || {
                gauge.enter();
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                gauge.exit();
            })
            .unwrap();
    }

    for _ in 0..parallel {
        entered_rx.recv().unwrap();
    }
    assert_eq!(gauge.current.load(Ordering::SeqCst), parallel);

    for _ in 0..parallel {
        release_tx.send(()).unwrap();
    }
    scheduler.join().unwrap();
}

// ==================== FIFO ====================

#[test]
fn test_freed_slot_takes_next_in_submission_order() {
    let scheduler = Scheduler::new(2);
    let started = Arc::new(Mutex::new(Vec::new()));
    let (release_t2, hold_t2) = mpsc::channel::<()>();
    let (t5_done_tx, t5_done_rx) = mpsc::channel::<()>();

    // T2 holds its slot until T5 has run, so T3..T5 share T1's freed slot
    let log = Arc::clone(&started);
    scheduler
        .submit(move || log.lock().unwrap().push(1))
        .unwrap();

    let log = Arc::clone(&started);
    scheduler
        .submit(move || {
            log.lock().unwrap().push(2);
            hold_t2.recv().unwrap();
        })
        .unwrap();

    for id in 3..=5 {
        let log = Arc::clone(&started);
        let t5_done_tx = t5_done_tx.clone();
        scheduler
            .submit(move || {
                log.lock().unwrap().push(id);
                if id == 5 {
                    t5_done_tx.send(()).unwrap();
                }
            })
            .unwrap();
    }

    t5_done_rx.recv().unwrap();
    release_t2.send(()).unwrap();
    scheduler.join().unwrap();

    let order = started.lock().unwrap().clone();
    let position = |id: i32| order.iter().position(|&x| x == id).unwrap();
    assert_eq!(order.len(), 5);
    assert!(position(1) < position(3));
    assert!(position(3) < position(4));
    assert!(position(4) < position(5));
}

// ==================== Join ====================

#[test]
fn test_join_waits_for_slow_tasks() {
    let scheduler = Scheduler::new(2);
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let done = Arc::clone(&done);
        scheduler
            .submit(move || {
                thread::sleep(Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    scheduler.join().unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 4);
}

#[test]
fn test_scheduler_reusable_after_join() {
    let scheduler = Scheduler::new(2);
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        for _ in 0..3 {
            let done = Arc::clone(&done);
            scheduler
                .submit(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        scheduler.join().unwrap();
    }
    assert_eq!(done.load(Ordering::SeqCst), 6);
    assert_eq!(scheduler.completed(), 6);
}

// ==================== Panics ====================

#[test]
fn test_panics_surface_at_join() {
    let scheduler = Scheduler::new(3);
    for i in 0..6 {
        scheduler
            .submit(move || {
                if i % 2 == 0 {
                    panic!("task {} failed", i);
                }
            })
            .unwrap();
    }

    let err = scheduler.join().unwrap_err();
    match &err {
        SchedulerError::TasksPanicked { count, messages } => {
            assert_eq!(*count, 3);
            let mut messages = messages.clone();
            messages.sort();
            assert_eq!(messages, vec!["task 0 failed", "task 2 failed", "task 4 failed"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().starts_with("3 task(s) panicked"));
    assert_eq!(scheduler.completed(), 6);
}
