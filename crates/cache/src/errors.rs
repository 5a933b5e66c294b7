//! Error handling for the disk cache
//!
//! Every error carries a recovery hint so operators can tell a corrupted
//! cache directory apart from a transient I/O failure.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
