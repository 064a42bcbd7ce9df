//! Helpers for managing run loops.

use std::ffi::c_void;
use std::mem;

use objc2_core_foundation::{
    CFIndex, CFRetained, CFRunLoop, CFRunLoopSource, CFRunLoopSourceContext, kCFRunLoopCommonModes,
};

/// A manual run loop source used to wake code that blocks on a run loop.
#[derive(Clone, PartialEq)]
pub struct WakeupHandle(CFRetained<CFRunLoopSource>, CFRetained<CFRunLoop>);

// SAFETY: only `wake` is exposed, which signals the source and wakes its run
// loop; both calls are documented as thread safe.
unsafe impl Send for WakeupHandle {}
unsafe impl Sync for WakeupHandle {}

struct Handler<F> {
    ref_count: isize,
    func: F,
}

impl WakeupHandle {
    /// Adds a source to the current thread's run loop that calls `handler`
    /// (in all common modes) after [`WakeupHandle::wake`].
    pub fn for_current_thread<F: Fn() + 'static>(order: CFIndex, handler: F) -> Option<Self> {
        let handler = Box::into_raw(Box::new(Handler { ref_count: 0, func: handler }));

        unsafe extern "C-unwind" fn perform<F: Fn() + 'static>(info: *mut c_void) {
            // SAFETY: only the owning thread calls back into the handler.
            let handler = unsafe { &*(info as *const Handler<F>) };
            (handler.func)();
        }
        unsafe extern "C-unwind" fn retain<F>(info: *const c_void) -> *const c_void {
            let handler = unsafe { &mut *(info as *mut Handler<F>) };
            handler.ref_count += 1;
            info
        }
        unsafe extern "C-unwind" fn release<F>(info: *const c_void) {
            let handler = unsafe { &mut *(info as *mut Handler<F>) };
            handler.ref_count -= 1;
            if handler.ref_count == 0 {
                mem::drop(unsafe { Box::from_raw(info as *mut Handler<F>) });
            }
        }

        let mut context = CFRunLoopSourceContext {
            version: 0,
            info: handler as *mut c_void,
            retain: Some(retain::<F>),
            release: Some(release::<F>),
            copyDescription: None,
            equal: None,
            hash: None,
            schedule: None,
            cancel: None,
            perform: Some(perform::<F>),
        };

        let source = unsafe { CFRunLoopSource::new(None, order, &mut context) }?;
        let run_loop = CFRunLoop::current()?;
        unsafe { run_loop.add_source(Some(&source), kCFRunLoopCommonModes) };

        Some(WakeupHandle(source, run_loop))
    }

    /// Schedules the handler on the owning run loop. Signals may coalesce.
    pub fn wake(&self) {
        self.0.signal();
        self.1.wake_up();
    }
}
