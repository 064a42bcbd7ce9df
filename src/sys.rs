//! Bindings to the macOS APIs the switcher sits on.

pub mod accessibility;
pub mod app;
pub mod axuielement;
pub mod bitmap;
pub mod dispatch;
pub mod event_tap;
pub mod executor;
pub mod run_loop;
pub mod skylight;
pub mod window_server;
