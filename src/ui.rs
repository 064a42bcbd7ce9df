pub mod layout;
#[cfg(target_os = "macos")]
pub mod overlay;
