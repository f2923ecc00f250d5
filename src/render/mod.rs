pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::Canvas;
pub use skeleton::{visible_segments, SKELETON_CONNECTIONS};
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;
