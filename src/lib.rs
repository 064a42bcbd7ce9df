#![allow(non_upper_case_globals)]

pub mod actor;
pub mod common;
pub mod model;
pub mod switcher;
#[cfg(target_os = "macos")]
pub mod sys;
pub mod ui;
