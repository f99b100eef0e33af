//! Jumpdiff: streaming binary diff and patch.
//!
//! The crate provides:
//! - The differencing engine (`diff`): rolling-hash sampled source
//!   index, verified match table, lookahead search
//! - The patch stream codec and applier (`patch`)
//! - Byte-addressed windowed input (`input`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use jumpdiff::{apply_bytes, diff_bytes, DiffOptions};
//!
//! let source = b"hello old world";
//! let dest = b"hello new world";
//!
//! let patch = diff_bytes(source, dest, &DiffOptions::default()).unwrap();
//! let rebuilt = apply_bytes(source, &patch).unwrap();
//! assert_eq!(rebuilt, dest);
//! ```

pub mod config;
pub mod diff;
pub mod hash;
pub mod input;
pub mod io;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{DiffOptions, ScanMode};
pub use diff::{diff_bytes, DiffError, DiffReport, Differ};
pub use patch::{apply, apply_bytes, ApplyError, BinarySink, ListingSink, PatchSink};
