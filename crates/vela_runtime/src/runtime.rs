//! Vela Runtime
//!
//! Pairs the reactive graph with the job scheduler that batches its effects.

use vela_core::{ReactiveGraph, ReactiveStats};

use crate::scheduler::Scheduler;

/// The reactive graph plus the scheduler its component effects queue into
#[derive(Clone, Debug)]
pub struct Runtime {
    pub reactive: ReactiveGraph,
    pub scheduler: Scheduler,
}

impl Runtime {
    /// A runtime with its own graph and scheduler, isolated from the shared one
    pub fn new() -> Self {
        Self {
            reactive: ReactiveGraph::new(),
            scheduler: Scheduler::new(),
        }
    }

    /// The calling thread's shared graph and scheduler
    pub fn shared() -> Self {
        Self {
            reactive: ReactiveGraph::shared(),
            scheduler: Scheduler::shared(),
        }
    }

    /// Get statistics about the runtime
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            reactive: self.reactive.stats(),
            queued_jobs: self.scheduler.queued_jobs(),
            flush_pending: self.scheduler.is_flush_pending(),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the runtime
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    pub reactive: ReactiveStats,
    pub queued_jobs: usize,
    pub flush_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Job;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_runtime_integration() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let renders = Rc::new(Cell::new(0));

        let c = count.clone();
        let r = renders.clone();
        let job = Job::new(move || r.set(c.get_untracked()));

        let c = count.clone();
        let scheduler = runtime.scheduler.clone();
        let effect = vela_core::ReactiveEffect::with_scheduler(
            &runtime.reactive,
            move || {
                let _ = c.get();
            },
            move || scheduler.queue_job(job.clone()),
        );
        effect.run();

        count.set(1);
        count.set(2);
        assert_eq!(runtime.stats().queued_jobs, 1);
        assert!(runtime.stats().flush_pending);

        runtime.scheduler.flush();
        assert_eq!(renders.get(), 2);
        assert_eq!(runtime.stats().reactive.effect_count, 1);
    }
}
