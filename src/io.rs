// File-level helpers for diffing and patching.
//
// `diff_file()` and `apply_file()` wrap the engine with buffered file
// I/O and return statistics. When the `file-io` feature is enabled,
// `apply_file()` also computes a streaming SHA-256 of the reconstructed
// output.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::DiffOptions;
use crate::diff::{DiffError, DiffReport, Differ};
use crate::input::{AheadReader, Input, InputError};
use crate::patch::{apply, ApplyError, BinarySink, SinkStats};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `diff_file()`.
#[derive(Debug, Clone)]
pub struct DiffStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Destination file size in bytes.
    pub dest_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Whether any data bytes were emitted (the inputs differ).
    pub differences: bool,
    /// Patch byte accounting.
    pub sink: SinkStats,
    /// Engine counters.
    pub report: DiffReport,
    /// Seeks performed on the source.
    pub source_seeks: u64,
    /// Seeks performed on the destination.
    pub dest_seeks: u64,
}

/// Statistics returned by `apply_file()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the output (`file-io` feature only).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for the file helpers.
#[derive(Debug)]
pub enum IoError {
    /// File open / metadata / write error.
    Io(io::Error),
    /// Reader construction or windowed-read failure.
    Input(InputError),
    /// Diff engine error.
    Diff(DiffError),
    /// Patch application error.
    Apply(ApplyError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Input(e) => write!(f, "input error: {e}"),
            Self::Diff(e) => write!(f, "diff error: {e}"),
            Self::Apply(e) => write!(f, "apply error: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Input(e) => Some(e),
            Self::Diff(e) => Some(e),
            Self::Apply(e) => Some(e),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<InputError> for IoError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<DiffError> for IoError {
    fn from(e: DiffError) -> Self {
        Self::Diff(e)
    }
}

impl From<ApplyError> for IoError {
    fn from(e: ApplyError) -> Self {
        Self::Apply(e)
    }
}

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

const OUT_BUF_SIZE: usize = 64 * 1024;

/// Diff `source_path` against `dest_path`, writing the patch to
/// `patch_path`.
pub fn diff_file(
    source_path: &Path,
    dest_path: &Path,
    patch_path: &Path,
    opts: DiffOptions,
) -> Result<DiffStats, IoError> {
    let opts = opts.normalized();

    let source_file = File::open(source_path)?;
    let source_size = source_file.metadata()?.len();
    let mut src = AheadReader::new(source_file, opts.buf_src, opts.block_size, opts.sequential_src)?;

    let dest_file = File::open(dest_path)?;
    let dest_size = dest_file.metadata()?.len();
    let mut dst = AheadReader::new(dest_file, opts.buf_dst, opts.block_size, opts.sequential_dst)?;

    let patch_file = File::create(patch_path)?;
    let writer = BufWriter::with_capacity(OUT_BUF_SIZE, patch_file);
    let mut sink = BinarySink::new(writer);

    let report = Differ::new(opts).run(&mut src, &mut dst, &mut sink)?;

    let differences = sink.differences();
    let stats = sink.stats().clone();
    let patch_size = sink
        .into_inner()
        .into_inner()
        .map_err(|e| IoError::Io(e.into_error()))?
        .metadata()?
        .len();

    Ok(DiffStats {
        source_size,
        dest_size,
        patch_size,
        differences,
        sink: stats,
        report,
        source_seeks: src.seek_count(),
        dest_seeks: dst.seek_count(),
    })
}

/// Diff into an arbitrary sink (used by the CLI for listings and for
/// writing to stdout).
pub fn diff_file_to<O: crate::patch::PatchSink>(
    source_path: &Path,
    dest_path: &Path,
    out: &mut O,
    opts: DiffOptions,
) -> Result<DiffReport, IoError> {
    let opts = opts.normalized();

    let source_file = File::open(source_path)?;
    let mut src = AheadReader::new(source_file, opts.buf_src, opts.block_size, opts.sequential_src)?;

    let dest_file = File::open(dest_path)?;
    let mut dst = AheadReader::new(dest_file, opts.buf_dst, opts.block_size, opts.sequential_dst)?;

    Ok(Differ::new(opts).run(&mut src, &mut dst, out)?)
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Apply `patch_path` to `source_path`, writing the reconstruction to
/// `output_path`.
pub fn apply_file(
    source_path: &Path,
    patch_path: &Path,
    output_path: &Path,
) -> Result<ApplyStats, IoError> {
    let source_file = File::open(source_path)?;
    let source_size = source_file.metadata()?.len();
    // The patch addresses the source with backtracks, so it goes
    // through the windowed reader; the patch itself is a plain stream.
    let mut src = AheadReader::new(source_file, 1 << 20, 32 * 1024, false)?;

    let patch_file = File::open(patch_path)?;
    let patch_size = patch_file.metadata()?.len();
    let mut patch = BufReader::with_capacity(OUT_BUF_SIZE, patch_file);

    let output_file = File::create(output_path)?;
    let mut writer = BufWriter::with_capacity(OUT_BUF_SIZE, output_file);

    #[cfg(feature = "file-io")]
    let (output_size, output_sha256) = {
        use sha2::Digest;
        let mut hasher = sha2::Sha256::new();
        let mut hashing = HashingWriter {
            inner: &mut writer,
            hasher: &mut hasher,
        };
        let n = apply(&mut src, &mut patch, &mut hashing)?;
        (n, Some(hasher.finalize().into()))
    };

    #[cfg(not(feature = "file-io"))]
    let (output_size, output_sha256): (u64, Option<[u8; 32]>) =
        (apply(&mut src, &mut patch, &mut writer)?, None);

    writer.flush()?;

    Ok(ApplyStats {
        source_size,
        patch_size,
        output_size,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Hashing writer (file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        use sha2::Digest;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
