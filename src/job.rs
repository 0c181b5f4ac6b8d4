//! Job definitions and execution.
//!
//! A job is an opaque pair: a plain function pointer and an untyped context
//! pointer. The pool never looks inside the context and does not own it;
//! the submitter keeps it alive until the job has executed.

/// A unit of work executed by exactly one worker.
///
/// Jobs are plain values. They are copied into and out of the per-worker
/// ring buffers, so they carry no allocation and no destructor.
#[derive(Clone, Copy)]
pub struct Job {
    func: fn(*mut ()),
    context: *mut (),
}

impl Job {
    /// Creates a job from a function pointer and its context.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `context` remains valid until the job
    /// has executed, and that `func` may be called with it from any thread.
    pub unsafe fn new(func: fn(*mut ()), context: *mut ()) -> Self {
        Job { func, context }
    }

    /// The context pointer this job was created with.
    pub fn context(&self) -> *mut () {
        self.context
    }

    /// Runs the job on the calling thread.
    pub fn execute(self) {
        (self.func)(self.context);
    }
}

// SAFETY: the context pointer crosses threads under the contract of
// `Job::new`; the pool itself never dereferences it.
unsafe impl Send for Job {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn set_flag(context: *mut ()) {
        let flag = unsafe { &*(context as *const AtomicBool) };
        flag.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_job_execution() {
        let executed = AtomicBool::new(false);
        let job = unsafe { Job::new(set_flag, &executed as *const _ as *mut ()) };

        job.execute();
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_job_context_accessor() {
        let mut value = 7u32;
        let context = &mut value as *mut u32 as *mut ();

        fn noop(_context: *mut ()) {}
        let job = unsafe { Job::new(noop, context) };
        assert_eq!(job.context(), context);
    }
}
