// Command-line interface for jumpdiff.
//
// Two subcommands: `diff` emits a patch, `patch` applies one. Exit
// codes for `diff`: 0 = no differences, 1 = differences found; error
// classes get distinct codes above 2.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{DiffOptions, ScanMode};
use crate::io::{apply_file, diff_file, diff_file_to};
use crate::patch::ListingSink;

// Exit codes.
const EXIT_OK: i32 = 0;
const EXIT_DIFFERENCES: i32 = 1;
const EXIT_OPEN: i32 = 4;
const EXIT_OPEN_OUTPUT: i32 = 6;
const EXIT_SEEK: i32 = 7;
const EXIT_READ: i32 = 8;
const EXIT_WRITE: i32 = 9;
const EXIT_ERROR: i32 = 20;

fn parse_kib(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    n.checked_mul(1024).ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap definitions
// ---------------------------------------------------------------------------

/// Binary diff and patch with a rolling-hash sampled source index.
#[derive(Parser, Debug)]
#[command(name = "jumpdiff", version, about, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Verbose output (repeat for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch that turns SOURCE into DEST.
    Diff(DiffArgs),
    /// Apply a patch to SOURCE, reconstructing the original DEST.
    Patch(PatchArgs),
}

#[derive(Args, Debug)]
struct DiffArgs {
    source: PathBuf,
    dest: PathBuf,
    /// Patch output file.
    patch: PathBuf,

    /// Index table size in MiB.
    #[arg(short = 'i', long = "index-size", default_value_t = 32)]
    index_size: usize,

    /// Search buffer size in KiB.
    #[arg(short = 'm', long = "buffer-size", value_parser = parse_kib, default_value = "1024")]
    buffer_size: usize,

    /// Read block size in bytes.
    #[arg(short = 'k', long = "block-size", default_value_t = 32 * 1024)]
    block_size: usize,

    /// Search window in KiB (0 = derive from the buffer size).
    #[arg(short = 'a', long = "search-size", value_parser = parse_kib, default_value = "0")]
    search_size: usize,

    /// Minimum number of matches to search before choosing one.
    #[arg(short = 'n', long = "search-min", default_value_t = 2)]
    search_min: usize,

    /// Maximum number of matches to search before choosing one.
    #[arg(short = 'x', long = "search-max", default_value_t = 128)]
    search_max: usize,

    /// Use more memory and search harder (repeatable).
    #[arg(short = 'b', long = "better", action = ArgAction::Count)]
    better: u8,

    /// Stay within the buffers: no out-of-buffer compares. Twice also
    /// disables the full source prescan.
    #[arg(short = 'f', long = "lazy", action = ArgAction::Count)]
    lazy: u8,

    /// Treat the source as sequential (disables prescan and backtrack).
    #[arg(short = 'p', long = "sequential-source")]
    sequential_source: bool,

    /// Treat the destination as sequential.
    #[arg(short = 'q', long = "sequential-dest")]
    sequential_dest: bool,

    /// Write a grouped human-readable listing instead of a patch.
    #[arg(short = 'l', long = "listing")]
    listing: bool,
}

#[derive(Args, Debug)]
struct PatchArgs {
    source: PathBuf,
    patch: PathBuf,
    /// Reconstructed output file.
    dest: PathBuf,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse arguments and run; returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Cmd::Diff(args) => run_diff(args, cli.verbose),
        Cmd::Patch(args) => run_patch(args, cli.verbose),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn build_options(args: &DiffArgs) -> DiffOptions {
    let mut opts = DiffOptions {
        index_mb: args.index_size.max(1),
        match_max: if args.search_max == 0 { 1024 } else { args.search_max },
        match_min: args.search_min,
        ahead_max: args.search_size as i64,
        buf_src: args.buffer_size,
        buf_dst: args.buffer_size,
        block_size: args.block_size,
        sequential_src: args.sequential_source,
        sequential_dst: args.sequential_dest,
        ..Default::default()
    };
    for _ in 0..args.better {
        opts = opts.better();
    }
    match args.lazy {
        0 => {}
        1 => opts = opts.lazy(),
        _ => opts = opts.lazier(),
    }
    if args.sequential_source {
        opts.scan = ScanMode::Incremental;
    }
    opts
}

fn run_diff(args: DiffArgs, verbose: u8) -> i32 {
    let opts = build_options(&args);

    if args.listing {
        let out = match std::fs::File::create(&args.patch) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("jumpdiff: cannot create {}: {e}", args.patch.display());
                return EXIT_OPEN_OUTPUT;
            }
        };
        let mut sink = ListingSink::new(BufWriter::new(out));
        return match diff_file_to(&args.source, &args.dest, &mut sink, opts) {
            Ok(_) => {
                if sink.differences() {
                    EXIT_DIFFERENCES
                } else {
                    EXIT_OK
                }
            }
            Err(e) => report_error("diff", &e),
        };
    }

    match diff_file(&args.source, &args.dest, &args.patch, opts) {
        Ok(stats) => {
            if verbose > 0 {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "source      bytes = {}", stats.source_size);
                let _ = writeln!(err, "destination bytes = {}", stats.dest_size);
                let _ = writeln!(err, "patch       bytes = {}", stats.patch_size);
                let _ = writeln!(err, "equal       bytes = {}", stats.sink.eql);
                let _ = writeln!(err, "data        bytes = {}", stats.sink.data);
                let _ = writeln!(
                    err,
                    "control     bytes = {}",
                    stats.sink.ctl + stats.sink.esc
                );
            }
            if verbose > 1 {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "index hits        = {}", stats.report.index_hits);
                let _ = writeln!(err, "index repairs     = {}", stats.report.repairs);
                let _ = writeln!(err, "index overload    = {}", stats.report.overload);
                let _ = writeln!(err, "reliability       = {}", stats.report.reliability);
                let _ = writeln!(err, "inaccurate finds  = {}", stats.report.inaccurate);
                let _ = writeln!(err, "source seeks      = {}", stats.source_seeks);
                let _ = writeln!(err, "destination seeks = {}", stats.dest_seeks);
            }
            if stats.differences {
                EXIT_DIFFERENCES
            } else {
                EXIT_OK
            }
        }
        Err(e) => report_error("diff", &e),
    }
}

fn run_patch(args: PatchArgs, verbose: u8) -> i32 {
    match apply_file(&args.source, &args.patch, &args.dest) {
        Ok(stats) => {
            if verbose > 0 {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "source bytes = {}", stats.source_size);
                let _ = writeln!(err, "patch  bytes = {}", stats.patch_size);
                let _ = writeln!(err, "output bytes = {}", stats.output_size);
                if let Some(sha) = stats.output_sha256 {
                    let _ = write!(err, "output sha256 = ");
                    for b in sha {
                        let _ = write!(err, "{b:02x}");
                    }
                    let _ = writeln!(err);
                }
            }
            EXIT_OK
        }
        Err(e) => report_error("patch", &e),
    }
}

fn report_error(what: &str, e: &crate::io::IoError) -> i32 {
    use crate::input::InputError;
    use crate::io::IoError;
    eprintln!("jumpdiff: {what}: {e}");
    match e {
        IoError::Io(err) if err.kind() == io::ErrorKind::NotFound => EXIT_OPEN,
        IoError::Io(_) => EXIT_WRITE,
        IoError::Input(InputError::SeekUnsupported { .. }) => EXIT_SEEK,
        IoError::Input(InputError::Seek(_)) => EXIT_SEEK,
        IoError::Input(InputError::Read(_)) => EXIT_READ,
        IoError::Diff(_) => EXIT_ERROR,
        IoError::Apply(_) => EXIT_ERROR,
    }
}
