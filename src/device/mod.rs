//! Device abstraction consumed by the frame graph.
//!
//! The traits here define the boundary between the scheduler core and the
//! GPU: the frame graph decides *what* happens and in *which order*, the
//! device records and submits it.

pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;
