// Hash-based source indexing for the differencing engine.
//
// Three layers:
//   - `rolling`: incremental sample hash with equal-tail perturbation
//   - `index`: lossy prime-sized table of (hash, position) samples
//   - `matching`: table of candidate equal regions fed by index hits

pub mod index;
pub mod matching;
pub mod rolling;

pub use index::SourceIndex;
pub use matching::{MatchTable, Verdict};
pub use rolling::RollingHash;

/// Hash word. 32-bit by default; the `large-sample` feature widens it
/// to 64 bits (and the samples to 64 bytes).
#[cfg(feature = "large-sample")]
pub type HashKey = u64;
#[cfg(not(feature = "large-sample"))]
pub type HashKey = u32;

/// Sample width in bytes: one byte per bit of the hash word, so the
/// lowest bit of the oldest sample byte still reaches the highest hash
/// bit after shifting.
pub const SAMPLE_SIZE: i64 = (std::mem::size_of::<HashKey>() * 8) as i64;
