#![forbid(unsafe_code)]

//! Core: grid geometry and logging shared by the layout engine crates.

pub mod geometry;
pub mod logging;

pub use geometry::GridRect;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, info_span, trace, warn};
