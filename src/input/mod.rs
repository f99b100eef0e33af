// Byte-addressed input abstraction.
//
// The engine reads by absolute position while mostly streaming forward;
// this module translates between the two views. `AheadReader` is the
// only implementation that performs real I/O — everything above it
// consumes bytes and positions.

pub mod ahead;

pub use ahead::AheadReader;

// ---------------------------------------------------------------------------
// Read modes and fetch results
// ---------------------------------------------------------------------------

/// Read discipline for [`Input::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Normal read: seeks and reads as needed, never reports `Eob`.
    Read,
    /// Ahead read: may extend the window forward, discarding old data,
    /// but reports `Eob` instead of seeking backward on a sequential
    /// stream.
    HardAhead,
    /// Buffered ahead read: reports `Eob` whenever the position is not
    /// serviceable from the current window.
    SoftAhead,
}

/// Outcome of a byte fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Byte(u8),
    /// Past the end of the stream.
    Eof,
    /// Outside the window under a soft/hard-ahead discipline. Not an
    /// error: it tells the caller that a result is only partial.
    Eob,
}

impl Fetch {
    #[inline]
    pub fn is_byte(self) -> bool {
        matches!(self, Fetch::Byte(_))
    }

    #[inline]
    pub fn byte(self) -> Option<u8> {
        match self {
            Fetch::Byte(b) => Some(b),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// I/O failures surfaced by a reader. `Eof`/`Eob` are not errors and
/// are reported through [`Fetch`] instead.
#[derive(Debug)]
pub enum InputError {
    /// A backward seek was required on a sequential stream.
    SeekUnsupported { pos: i64 },
    /// The underlying seek failed.
    Seek(std::io::Error),
    /// The underlying read failed, or a scrollback found the stream
    /// truncated under it.
    Read(std::io::Error),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeekUnsupported { pos } => {
                write!(f, "backward seek to {pos} on a sequential stream")
            }
            Self::Seek(e) => write!(f, "seek error: {e}"),
            Self::Read(e) => write!(f, "read error: {e}"),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SeekUnsupported { .. } => None,
            Self::Seek(e) | Self::Read(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// The input trait
// ---------------------------------------------------------------------------

/// A byte-addressable input with forward streaming, bounded scrollback
/// and a soft-read discipline.
pub trait Input {
    /// Read the byte at `pos` under the given discipline.
    fn get(&mut self, pos: i64, mode: ReadMode) -> Result<Fetch, InputError>;

    /// Contiguous buffered slice starting at `pos` (reading as needed).
    /// `None` means `pos` is at or past end of stream.
    fn getbuf(&mut self, pos: i64) -> Result<Option<&[u8]>, InputError>;

    /// Soft reads past `base + buffer - block` fail with `Eob` until
    /// the base is advanced.
    fn set_lookahead_base(&mut self, base: i64);

    /// First position currently held in the window.
    fn buf_pos(&self) -> i64;

    /// Window size in bytes.
    fn buf_size(&self) -> i64;

    /// Total stream length, when established (seekable inputs probe it
    /// at construction; sequential ones learn it at EOF).
    fn known_len(&self) -> Option<i64>;

    /// Whether backward seeks are forbidden.
    fn is_sequential(&self) -> bool;

    /// Number of real seek operations performed so far.
    fn seek_count(&self) -> u64;
}
