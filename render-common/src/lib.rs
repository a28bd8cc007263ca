//! Render Common Types
//!
//! Wire types shared by the render service, its CLI and its tests.

pub mod quality;
pub mod types;

pub use quality::{ParseQualityError, Quality};
pub use types::*;
