pub mod collections;
pub mod config;
pub mod hotkey;
pub mod log;
pub mod raster;
