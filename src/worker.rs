//! Worker thread implementation.
//!
//! Each worker owns one deque and runs the same loop for the pool's whole
//! lifetime: pop local work, steal from a peer when the local deque runs
//! dry, then sleep until a push arrives. Jobs execute synchronously on the
//! worker thread; a panicking job is reported and the loop continues.

use crate::deque::JobDeque;
use crate::job::Job;
use crate::parking::WaitWord;
use crate::rng::fast_random;
use core_affinity::CoreId;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared state of one worker: its deque plus the wake word that `push`
/// bumps and the idle loop sleeps on.
pub(crate) struct Worker {
    deque: JobDeque,
    wake: WaitWord,
}

impl Worker {
    pub(crate) fn new() -> Self {
        Worker {
            deque: JobDeque::new(),
            wake: WaitWord::new(0),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.deque.is_full()
    }

    /// Pushes a job into this worker's deque and wakes the worker if it is
    /// sleeping. Callers must have checked [`is_full`](Self::is_full).
    pub(crate) fn push(&self, job: Job) {
        self.deque.push(job);
        self.wake.fetch_add(1, Ordering::Release);
        self.wake.wake_one();
    }

    /// Releases the worker from its sleep without handing it a job, so it
    /// can observe the stop flag and exit.
    pub(crate) fn interrupt(&self) {
        self.wake.fetch_add(1, Ordering::Release);
        self.wake.wake_all();
    }
}

/// Spawns the thread driving `workers[index]`.
pub(crate) fn spawn(
    workers: Arc<Vec<Worker>>,
    index: usize,
    stop: Arc<AtomicBool>,
    core_id: Option<CoreId>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("forgepool-worker-{index}"))
        .spawn(move || {
            // Pin to the assigned core for cache locality if requested.
            if let Some(core_id) = core_id {
                core_affinity::set_for_current(core_id);
            }
            run(&workers, index, &stop);
        })
        .expect("failed to spawn worker thread")
}

/// Main execution loop: local pop, steal pass, sleep handshake.
fn run(workers: &[Worker], index: usize, stop: &AtomicBool) {
    let me = &workers[index];
    let pool_size = workers.len();
    log_debug!("worker {} started", index);

    while !stop.load(Ordering::Relaxed) {
        // 1. Local queue, newest first.
        if let Some(job) = me.deque.pop_back() {
            execute(job);
            continue;
        }

        // 2. Steal from peers; each visited at most once per pass, scan
        // origin randomized so idle workers do not gang up on one victim.
        if pool_size > 1 {
            let offset = fast_random() as usize % pool_size;
            let mut stole = false;
            for step in 0..pool_size {
                let victim = (offset + step) % pool_size;
                if victim == index {
                    continue;
                }
                if let Some(job) = workers[victim].deque.pop_front() {
                    log_trace!("worker {} stole a job from worker {}", index, victim);
                    execute(job);
                    stole = true;
                    break;
                }
            }
            if stole {
                continue;
            }
        }

        // 3. Sleep handshake. The wake sequence is read before the empty
        // snapshot: a push or interrupt landing after either read bumps the
        // sequence, so the wait below falls through instead of losing it.
        let sequence = me.wake.load(Ordering::Acquire);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if !me.deque.is_empty() {
            continue;
        }
        me.wake.wait(sequence);
    }

    log_debug!("worker {} stopping", index);
}

/// Runs one job, isolating panics so the worker thread survives. The job
/// has already left the deque and no lock is held here.
fn execute(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.execute())) {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "unknown panic payload"
        };
        eprintln!("forgepool: job panicked: {}", msg);
    }
}
