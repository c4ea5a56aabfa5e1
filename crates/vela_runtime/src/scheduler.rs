//! Job scheduler
//!
//! Batches effect reruns into one deferred flush. Effects do not rerun
//! component renders directly: their scheduler callback queues the owning
//! component's update job here, and the host event loop calls
//! [`Scheduler::flush`] once the current synchronous work has unwound.
//!
//! - A job is queued at most once per flush (identity comparison)
//! - A flush runs a snapshot of the queue; jobs queued while it runs belong
//!   to the next flush
//! - Post-flush callbacks run after the job snapshot, in the same flush
//!
//! The scheduler has no event loop of its own. Install a waker with
//! [`Scheduler::set_waker`] to learn when a flush becomes pending.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work, compared by identity
#[derive(Clone)]
pub struct Job(Rc<dyn Fn()>);

impl Job {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Job(Rc::new(f))
    }

    pub fn run(&self) {
        (self.0)()
    }

    /// Whether both handles are the same job
    pub fn ptr_eq(&self, other: &Job) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Callback that wakes the host event loop when a flush becomes pending
pub type WakeCallback = Rc<dyn Fn()>;

struct SchedulerInner {
    queue: RefCell<Vec<Job>>,
    post_flush: RefCell<Vec<Job>>,
    /// Jobs of the running flush that were invalidated before their turn
    invalidated: RefCell<Vec<Job>>,
    flush_pending: Cell<bool>,
    flushing: Cell<bool>,
    waker: RefCell<Option<WakeCallback>>,
}

/// Deduplicating job queue with a deferred flush (cheap to clone)
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

thread_local! {
    static SHARED_SCHEDULER: Scheduler = Scheduler::new();
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(Vec::new()),
                post_flush: RefCell::new(Vec::new()),
                invalidated: RefCell::new(Vec::new()),
                flush_pending: Cell::new(false),
                flushing: Cell::new(false),
                waker: RefCell::new(None),
            }),
        }
    }

    /// The calling thread's default scheduler
    pub fn shared() -> Scheduler {
        SHARED_SCHEDULER.with(Scheduler::clone)
    }

    /// Set a callback invoked whenever a flush becomes pending.
    ///
    /// Use this to wake the host event loop; the callback must not flush
    /// synchronously.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + 'static,
    {
        *self.inner.waker.borrow_mut() = Some(Rc::new(waker));
    }

    /// Queue `job` for the next flush unless it is already queued
    pub fn queue_job(&self, job: Job) {
        {
            let mut queue = self.inner.queue.borrow_mut();
            if queue.iter().any(|queued| queued.ptr_eq(&job)) {
                return;
            }
            queue.push(job);
        }
        self.queue_flush();
    }

    /// Queue a callback to run after the jobs of the next flush
    pub fn queue_post_flush_cb(&self, cb: Job) {
        {
            let mut post = self.inner.post_flush.borrow_mut();
            if post.iter().any(|queued| queued.ptr_eq(&cb)) {
                return;
            }
            post.push(cb);
        }
        self.queue_flush();
    }

    /// Remove a queued job; a running flush also skips it if it has not run yet
    pub fn invalidate_job(&self, job: &Job) {
        self.inner.queue.borrow_mut().retain(|queued| !queued.ptr_eq(job));
        if self.inner.flushing.get() {
            self.inner.invalidated.borrow_mut().push(job.clone());
        }
    }

    fn is_invalidated(&self, job: &Job) -> bool {
        self.inner
            .invalidated
            .borrow()
            .iter()
            .any(|invalidated| invalidated.ptr_eq(job))
    }

    fn queue_flush(&self) {
        if self.inner.flush_pending.replace(true) {
            return;
        }
        tracing::trace!("flush scheduled");
        let waker = self.inner.waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    /// Whether a flush has been scheduled and not yet run
    pub fn is_flush_pending(&self) -> bool {
        self.inner.flush_pending.get()
    }

    /// Whether any job or post-flush callback is queued
    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty() || !self.inner.post_flush.borrow().is_empty()
    }

    pub fn queued_jobs(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Run every job queued so far, then the post-flush callbacks.
    ///
    /// Returns the number of jobs and callbacks executed. A reentrant call
    /// from inside a running flush does nothing.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            tracing::warn!("flush requested while a flush is running");
            return 0;
        }
        let _guard = FlushGuard { inner: &self.inner };
        self.inner.flush_pending.set(false);

        let jobs = std::mem::take(&mut *self.inner.queue.borrow_mut());
        let mut executed = 0;
        for job in &jobs {
            if self.is_invalidated(job) {
                continue;
            }
            job.run();
            executed += 1;
        }
        self.inner.invalidated.borrow_mut().clear();

        let post = std::mem::take(&mut *self.inner.post_flush.borrow_mut());
        for cb in &post {
            cb.run();
            executed += 1;
        }

        tracing::trace!(
            jobs = jobs.len(),
            post_flush = post.len(),
            "flush complete"
        );
        executed
    }
}

/// Ends a flush on every exit path, including a panicking job
struct FlushGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.invalidated.borrow_mut().clear();
        self.inner.flushing.set(false);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.inner.queue.borrow().len())
            .field("post_flush", &self.inner.post_flush.borrow().len())
            .field("flush_pending", &self.inner.flush_pending.get())
            .finish()
    }
}
