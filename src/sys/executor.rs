//! Drives one future on the main thread from inside the AppKit run loop.
//!
//! The future is polled by a run loop source, so AppKit events, event taps,
//! dispatch tasks and the switcher actor all share a single thread.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::{Context, Poll, Wake};

use objc2::MainThreadMarker;
use objc2_app_kit::NSApp;
use tracing::error;

use super::run_loop::WakeupHandle;

thread_local! {
    static HANDLE: Handle = Handle::new();
}

pub struct Executor;

impl Executor {
    /// Runs `task` under `NSApplication::run` until it completes.
    pub fn run_main(mtm: MainThreadMarker, task: impl Future<Output = ()> + 'static) {
        let task: Pin<Box<dyn Future<Output = ()> + 'static>> = Box::pin(task);

        HANDLE.with(move |handle| {
            struct Guard;
            impl Drop for Guard {
                fn drop(&mut self) {
                    HANDLE.with(|handle| {
                        handle.0.borrow_mut().main_task.take();
                    })
                }
            }
            let _guard = Guard;

            {
                let mut state = handle.0.borrow_mut();
                let Some(wakeup) = state.wakeup.clone() else {
                    error!("could not install the executor run loop source");
                    return;
                };
                state.main_task.replace(task);
                wakeup.wake_by_ref();
            }

            while handle.0.borrow().main_task.is_some() {
                NSApp(mtm).run();
            }
        })
    }
}

struct Handle(Rc<RefCell<State>>);

impl Handle {
    fn new() -> Self {
        Handle(Rc::new_cyclic(|weak: &Weak<RefCell<State>>| {
            let weak = weak.clone();
            let wakeup = WakeupHandle::for_current_thread(0, move || {
                if let Some(this) = weak.upgrade() {
                    this.borrow_mut().process_tasks();
                }
            });
            RefCell::new(State {
                wakeup: wakeup.map(|w| Arc::new(WakerImpl(w))),
                main_task: None,
            })
        }))
    }
}

struct State {
    wakeup: Option<Arc<WakerImpl>>,
    main_task: Option<Pin<Box<dyn Future<Output = ()> + 'static>>>,
}

impl State {
    fn process_tasks(&mut self) {
        let (Some(wakeup), Some(task)) = (self.wakeup.clone(), self.main_task.as_mut()) else {
            return;
        };
        let waker = wakeup.into();
        let mut context = Context::from_waker(&waker);

        if task.as_mut().poll(&mut context) == Poll::Ready(()) {
            self.main_task.take();
            if let Some(mtm) = MainThreadMarker::new() {
                NSApp(mtm).stop(None);
            }
        }
    }
}

struct WakerImpl(WakeupHandle);

impl Wake for WakerImpl {
    fn wake(self: Arc<Self>) { self.0.wake(); }
}
