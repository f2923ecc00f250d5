pub mod capture;

pub use capture::{probe, OpenCvCamera};
