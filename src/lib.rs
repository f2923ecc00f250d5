#[cfg(feature = "desktop")]
pub mod app;
#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod fps;
pub mod osc;
pub mod pose;
pub mod render;
