use super::*;

use std::sync::atomic::AtomicU32;

#[test]
fn ten_thousand_increments_are_counted_exactly_once() {
    let pool = TaskScheduler::new(4).unwrap();
    let counter = Arc::new(AtomicU32::new(0));
    let handles = (0..10_000)
        .map(|_| {
            let counter = Arc::clone(&counter);
            pool.request(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect::<Vec<_>>();
    for h in handles {
        assert!(h.join().is_some());
    }
    assert_eq!(counter.load(Ordering::Relaxed), 10_000);
}

#[test]
fn terminate_drains_queued_jobs() {
    let pool = TaskScheduler::new(2).unwrap();
    let counter = Arc::new(AtomicU32::new(0));
    for _ in 0..500 {
        let counter = Arc::clone(&counter);
        pool.spawn(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
    }
    pool.terminate();
    assert_eq!(counter.load(Ordering::Relaxed), 500);
}

#[test]
fn zero_workers_run_inline_on_caller() {
    let pool = TaskScheduler::new(0).unwrap();
    assert_eq!(pool.worker_count(), 0);
    let caller = std::thread::current().id();
    let h = pool.request(move |tid| (tid, std::thread::current().id() == caller));
    assert!(h.is_done());
    assert_eq!(h.join(), Some((0, true)));
}

#[test]
fn jobs_observe_worker_thread_flag() {
    let pool = Arc::new(TaskScheduler::new(2).unwrap());
    assert!(!pool.on_worker_thread());
    let inner = Arc::clone(&pool);
    let h = pool.request(move |tid| (tid, inner.on_worker_thread()));
    let (tid, on_worker) = h.join().unwrap();
    assert!((1..=2).contains(&tid));
    assert!(on_worker);

    let other = TaskScheduler::new(1).unwrap();
    let pool2 = Arc::clone(&pool);
    let h = other.request(move |_| pool2.on_worker_thread());
    assert_eq!(h.join(), Some(false));
}

#[test]
fn single_queue_is_fifo() {
    let pool = TaskScheduler::new(1).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handles = (0..64)
        .map(|i| {
            let seen = Arc::clone(&seen);
            pool.request(move |_| seen.lock().unwrap().push(i))
        })
        .collect::<Vec<_>>();
    for h in handles {
        h.join();
    }
    assert_eq!(*seen.lock().unwrap(), (0..64).collect::<Vec<_>>());
}

#[test]
fn panicking_job_yields_none_and_pool_survives() {
    let pool = TaskScheduler::new(1).unwrap();
    let bad = pool.request(|_| -> u32 { panic!("job failure") });
    assert_eq!(bad.join(), None);
    let good = pool.request(|_| 7u32);
    assert_eq!(good.join(), Some(7));
}

#[test]
fn submissions_after_terminate_run_inline() {
    let pool = TaskScheduler::new(2).unwrap();
    pool.terminate();
    let h = pool.request(|tid| tid);
    assert_eq!(h.join(), Some(0));
}

#[test]
fn spawns_racing_terminate_all_run() {
    for _ in 0..20 {
        let pool = Arc::new(TaskScheduler::new(3).unwrap());
        let counter = Arc::new(AtomicU32::new(0));
        let submitters = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        let counter = Arc::clone(&counter);
                        pool.spawn(move |_| {
                            counter.fetch_add(1, Ordering::Relaxed);
                        });
                    }
                })
            })
            .collect::<Vec<_>>();
        pool.terminate();
        for s in submitters {
            s.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
    }
}

#[test]
fn completed_queue_hands_jobs_back() {
    let queue = TaskQueue::new();
    queue.complete();
    let ran = Arc::new(AtomicU32::new(0));
    let r = Arc::clone(&ran);
    let job: Job = Box::new(move |_| {
        r.fetch_add(1, Ordering::Relaxed);
    });
    let back = queue.push(job).err().unwrap();
    let back = queue.try_push(back).err().unwrap();
    back(0);
    assert_eq!(ran.load(Ordering::Relaxed), 1);
    assert!(queue.pop().is_none());
}
