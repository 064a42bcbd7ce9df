use std::rc::Rc;
use std::time::Duration;

pub type Task = Box<dyn FnOnce()>;

/// Runs deferred callbacks on the same cooperative loop that drives the
/// switcher. Nothing here blocks; `after` only enqueues.
pub trait Scheduler {
    fn after(&self, delay: Duration, task: Task);
}

pub type SchedulerRef = Rc<dyn Scheduler>;
