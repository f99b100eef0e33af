// Patch application: reconstruct the destination from source + patch.
//
// The patch is consumed as a forward-only byte stream; the source goes
// through the addressable reader because BKT rewinds it. Equal regions
// are copied through `getbuf` slices rather than byte by byte.

use std::io::{self, Read, Write};

use super::{length, Op, ESC};
use crate::input::{AheadReader, Input, InputError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while applying a patch.
#[derive(Debug)]
pub enum ApplyError {
    /// Reading the patch stream failed.
    Patch(io::Error),
    /// Writing the output failed.
    Write(io::Error),
    /// The source reader failed.
    Source(InputError),
    /// The patch ended inside a record.
    Truncated,
    /// The patch addressed source data that does not exist.
    SourceExhausted { pos: i64 },
    /// A BKT rewound the source before position zero.
    BacktrackUnderflow { pos: i64 },
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch(e) => write!(f, "patch read error: {e}"),
            Self::Write(e) => write!(f, "output write error: {e}"),
            Self::Source(e) => write!(f, "source error: {e}"),
            Self::Truncated => write!(f, "patch truncated mid-record"),
            Self::SourceExhausted { pos } => {
                write!(f, "patch addresses source position {pos} past end")
            }
            Self::BacktrackUnderflow { pos } => {
                write!(f, "backtrack to negative source position {pos}")
            }
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Patch(e) | Self::Write(e) => Some(e),
            Self::Source(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InputError> for ApplyError {
    fn from(e: InputError) -> Self {
        Self::Source(e)
    }
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Apply `patch` to `src`, writing the reconstructed destination to
/// `out`. Returns the number of bytes written.
pub fn apply<S, P, W>(src: &mut S, patch: &mut P, out: &mut W) -> Result<u64, ApplyError>
where
    S: Input,
    P: Read,
    W: Write,
{
    Applier {
        src,
        patch,
        out,
        pos_org: 0,
        pos_out: 0,
    }
    .run()
}

/// In-memory convenience wrapper around [`apply`].
pub fn apply_bytes(source: &[u8], patch: &[u8]) -> Result<Vec<u8>, ApplyError> {
    let mut src = AheadReader::new(io::Cursor::new(source), 256 * 1024, 4096, false)
        .map_err(ApplyError::Source)?;
    let mut rdr = patch;
    let mut out = Vec::new();
    apply(&mut src, &mut rdr, &mut out)?;
    Ok(out)
}

struct Applier<'a, S, P, W> {
    src: &'a mut S,
    patch: &'a mut P,
    out: &'a mut W,
    pos_org: i64,
    pos_out: i64,
}

/// What a data run ended with.
enum RunEnd {
    Op(Op),
    Terminator,
    Eof,
}

impl<S: Input, P: Read, W: Write> Applier<'_, S, P, W> {
    fn run(&mut self) -> Result<u64, ApplyError> {
        let mut op: Option<Op> = None;
        loop {
            // Pending bytes that turned out to be data of an implicit
            // leading MOD.
            let mut pending: Option<(u8, Option<u8>)> = None;

            if op.is_none() {
                let first = match self.next_byte()? {
                    Some(b) => b,
                    None => break,
                };
                if first == ESC {
                    let second = match self.next_byte()? {
                        Some(b) => b,
                        None => return Err(ApplyError::Truncated),
                    };
                    match Op::from_byte(second) {
                        Some(Op::Esc) => {
                            // ESC ESC at record start: implicit MOD with
                            // one literal escape byte.
                            op = Some(Op::Mod);
                            pending = Some((ESC, Some(ESC)));
                        }
                        Some(o) => op = Some(o),
                        None if second == 0x00 => break, // terminator
                        None => {
                            // ESC then a non-operator byte: two literal
                            // data bytes of an implicit MOD.
                            op = Some(Op::Mod);
                            pending = Some((ESC, Some(second)));
                        }
                    }
                } else {
                    op = Some(Op::Mod);
                    pending = Some((first, None));
                }
            }

            match op.take() {
                Some(o @ (Op::Mod | Op::Ins)) => match self.copy_data(o, pending)? {
                    RunEnd::Op(next) => op = Some(next),
                    RunEnd::Terminator | RunEnd::Eof => break,
                },
                Some(Op::Eql) => {
                    let len = self.read_len()?;
                    self.copy_source(len)?;
                    self.pos_org += len as i64;
                    self.pos_out += len as i64;
                }
                Some(Op::Del) => {
                    let len = self.read_len()?;
                    self.pos_org += len as i64;
                }
                Some(Op::Bkt) => {
                    let len = self.read_len()?;
                    self.pos_org -= len as i64;
                    if self.pos_org < 0 {
                        return Err(ApplyError::BacktrackUnderflow { pos: self.pos_org });
                    }
                }
                Some(Op::Esc) | None => break,
            }
        }
        self.out.flush().map_err(ApplyError::Write)?;
        Ok(self.pos_out as u64)
    }

    /// Copy a MOD/INS byte run until the next operator, the terminator
    /// or EOF. MOD consumes source positions, INS does not.
    fn copy_data(&mut self, op: Op, pending: Option<(u8, Option<u8>)>) -> Result<RunEnd, ApplyError> {
        if let Some((first, second)) = pending {
            self.put_data(op, first)?;
            // ESC ESC decodes to a single escape byte; anything else
            // after ESC is two literal bytes.
            if let Some(b) = second {
                if !(first == ESC && b == ESC) {
                    self.put_data(op, b)?;
                }
            }
        }

        loop {
            let b = match self.next_byte()? {
                Some(b) => b,
                None => return Ok(RunEnd::Eof),
            };
            if b != ESC {
                self.put_data(op, b)?;
                continue;
            }
            let next = match self.next_byte()? {
                Some(b) => b,
                None => return Err(ApplyError::Truncated),
            };
            match Op::from_byte(next) {
                Some(Op::Esc) => {
                    // Doubled escape: one literal ESC.
                    self.put_data(op, ESC)?;
                }
                Some(o) if o == op => {
                    // ESC MOD inside a MOD run (or INS inside INS) is
                    // meaningless as an operator: literal data.
                    self.put_data(op, ESC)?;
                    self.put_data(op, next)?;
                }
                Some(o) => return Ok(RunEnd::Op(o)),
                None if next == 0x00 => return Ok(RunEnd::Terminator),
                None => {
                    // Escaped non-operator: both bytes are data.
                    self.put_data(op, ESC)?;
                    self.put_data(op, next)?;
                }
            }
        }
    }

    fn put_data(&mut self, op: Op, b: u8) -> Result<(), ApplyError> {
        self.out.write_all(&[b]).map_err(ApplyError::Write)?;
        if op == Op::Mod {
            self.pos_org += 1;
        }
        self.pos_out += 1;
        Ok(())
    }

    /// Copy `len` source bytes at the current source position via
    /// buffered slices.
    fn copy_source(&mut self, len: u64) -> Result<(), ApplyError> {
        let mut pos = self.pos_org;
        let mut remaining = len as i64;
        while remaining > 0 {
            let slice = self
                .src
                .getbuf(pos)?
                .ok_or(ApplyError::SourceExhausted { pos })?;
            let take = (slice.len() as i64).min(remaining) as usize;
            self.out
                .write_all(&slice[..take])
                .map_err(ApplyError::Write)?;
            pos += take as i64;
            remaining -= take as i64;
        }
        Ok(())
    }

    fn read_len(&mut self) -> Result<u64, ApplyError> {
        length::read(self.patch).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ApplyError::Truncated
            } else {
                ApplyError::Patch(e)
            }
        })
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ApplyError> {
        let mut b = [0u8; 1];
        loop {
            match self.patch.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ApplyError::Patch(e)),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
