use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use cadence_core::time::wall_clock;
use chrono::Utc;
use tracing::{debug, error};

use crate::scheduler::events::SchedulerEvent;
use crate::scheduler::task::SchedulerError;
use crate::scheduler::types::LoopPhase;

use super::core::Scheduler;
use super::execution::run_loop;

impl Scheduler {
    /// Spawn the control thread. No-op if the scheduler is already running.
    ///
    /// If a `stop()` is in progress, blocks until it completes and then starts
    /// a fresh loop. Tasks registered while stopped and never activated become
    /// ready at the start instant. Must not be called from inside task work.
    ///
    /// A loop that was terminated by a panicking task is reaped first, and its
    /// `SchedulerStopped` event is emitted before the new `SchedulerStarted`.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut inner = self
            .shared
            .signal
            .wait_while(self.shared.lock(), |s| s.phase == LoopPhase::ShuttingDown)
            .unwrap_or_else(PoisonError::into_inner);
        if inner.phase == LoopPhase::Running {
            debug!("start ignored, scheduler already running");
            return Ok(());
        }

        if let Some(dead) = inner.worker.take() {
            reap(dead);
            self.shared.emit(SchedulerEvent::SchedulerStopped { at: Utc::now() });
        }

        let now = Instant::now();
        inner.registry.rebase_unstarted(now);
        inner.phase = LoopPhase::Running;
        inner.wake_pending = false;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.config.thread_name.clone())
            .spawn(move || run_loop(&shared));

        match spawned {
            Ok(handle) => {
                debug!(tasks = inner.registry.len(), "scheduler thread spawned");
                inner.worker = Some(handle);
                self.shared.emit(SchedulerEvent::SchedulerStarted {
                    at: wall_clock(now),
                });
                Ok(())
            }
            Err(e) => {
                inner.phase = LoopPhase::Stopped;
                Err(SchedulerError::Spawn(e))
            }
        }
    }

    /// Request shutdown and block until the control thread has exited.
    ///
    /// Waits for an in-flight task to finish. Calling it before `start()` or
    /// repeatedly is a no-op. Must not be called from inside task work.
    pub fn stop(&self) {
        let handle = {
            let mut inner = self.shared.lock();
            let phase = inner.phase;
            match phase {
                LoopPhase::Running => {
                    inner.phase = LoopPhase::ShuttingDown;
                    self.shared.signal.notify_all();
                    inner.worker.take()
                }
                LoopPhase::ShuttingDown => {
                    // Another caller owns the join; wait for it to finish.
                    let _inner = self
                        .shared
                        .signal
                        .wait_while(inner, |s| s.phase == LoopPhase::ShuttingDown)
                        .unwrap_or_else(PoisonError::into_inner);
                    return;
                }
                LoopPhase::Stopped => inner.worker.take(),
            }
        };

        let Some(handle) = handle else {
            return;
        };
        reap(handle);

        let mut inner = self.shared.lock();
        inner.phase = LoopPhase::Stopped;
        self.shared.emit(SchedulerEvent::SchedulerStopped { at: Utc::now() });
        drop(inner);
        self.shared.signal.notify_all();
    }
}

fn reap(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Scheduler thread terminated by a panicking task");
    }
}
