use std::ffi::c_void;
use std::time::Duration;

use dispatchr::queue::{self, Unmanaged};
use dispatchr::time::Time;

use crate::switcher::schedule::{Scheduler, Task};

unsafe extern "C" {
    pub fn dispatch_after_f(
        when: Time,
        queue: *const Unmanaged,
        context: *mut c_void,
        work: extern "C" fn(*mut c_void),
    );
}

pub trait DispatchExt {
    fn after_f(&self, when: Time, context: *mut c_void, work: extern "C" fn(*mut c_void));
}

impl DispatchExt for Unmanaged {
    fn after_f(&self, when: Time, context: *mut c_void, work: extern "C" fn(*mut c_void)) {
        unsafe { dispatch_after_f(when, self, context, work) }
    }
}

/// Runs tasks on the main queue, which the main run loop drains between
/// events. Every task therefore runs on the thread that owns the switcher.
#[derive(Default)]
pub struct MainQueueScheduler;

extern "C" fn run_task(ctx: *mut c_void) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: `ctx` came from `Box::into_raw` in `after` and is run once.
    let task = unsafe { Box::from_raw(ctx as *mut Task) };
    task();
}

impl Scheduler for MainQueueScheduler {
    fn after(&self, delay: Duration, task: Task) {
        let nanos = i64::try_from(delay.as_nanos()).unwrap_or(i64::MAX);
        let ctx: Box<Task> = Box::new(task);
        queue::main().after_f(Time::NOW.new_after(nanos), Box::into_raw(ctx) as *mut c_void, run_task);
    }
}
