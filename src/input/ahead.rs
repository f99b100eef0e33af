// Circular read-ahead window with bounded scrollback.
//
// Access pattern served here: the engine reads ahead to find equal
// regions, then comes back near the base position for the byte-by-byte
// compare. Appends are cheap; a backward jump within one window scrolls
// the window block-by-block instead of discarding it; everything else
// resets the window around the requested block.
//
// Window invariant: the buffered range is [pos_inp - used, pos_inp),
// and the byte at stream position p maps to buffer index
// (inp - (pos_inp - p)) mod W, where `inp` is the write index of
// `pos_inp`.

use std::io::{Read, Seek, SeekFrom};

use super::{Fetch, Input, InputError, ReadMode};

enum Located {
    At { idx: i64, avail: i64 },
    Eof,
    Eob,
}

enum SeekOp {
    Append,
    Reset,
    Scrollback,
}

/// Buffered byte-addressed reader over any `Read + Seek` stream.
pub struct AheadReader<R> {
    inner: R,
    buf: Vec<u8>,
    buf_size: i64,
    blk_size: i64,
    /// Bytes currently valid in the window.
    used: i64,
    /// Buffer index corresponding to `pos_inp`.
    inp: i64,
    /// Stream position one past the newest buffered byte.
    pos_inp: i64,
    /// Base position for the soft-read discipline.
    pos_base: i64,
    /// EOF position; `i64::MAX` until discovered.
    pos_eof: i64,
    sequential: bool,
    seeks: u64,
    /// Where the underlying stream cursor actually is.
    sys_pos: i64,
    // Fast-path read cache: the contiguous run following the last byte
    // served.
    pos_red: i64,
    red_idx: i64,
    red_len: i64,
}

impl<R: Read + Seek> AheadReader<R> {
    /// Wrap a stream in a window of `buf_size` bytes read in blocks of
    /// `blk_size`. Sizes are floored and aligned. A non-`sequential`
    /// reader probes the stream length up front; if the probe fails the
    /// reader silently degrades to sequential mode.
    pub fn new(
        mut inner: R,
        buf_size: usize,
        blk_size: usize,
        sequential: bool,
    ) -> Result<Self, InputError> {
        let blk = blk_size.max(1) as i64;
        let mut buf = buf_size as i64;
        buf -= buf % blk;
        if buf == 0 {
            buf = blk;
        }

        let mut sequential = sequential;
        let mut pos_eof = i64::MAX;
        if !sequential {
            match inner.seek(SeekFrom::End(0)) {
                Ok(n) => {
                    pos_eof = n as i64;
                    inner.seek(SeekFrom::Start(0)).map_err(InputError::Seek)?;
                }
                Err(_) => sequential = true,
            }
        }

        Ok(Self {
            inner,
            buf: vec![0; buf as usize],
            buf_size: buf,
            blk_size: blk,
            used: 0,
            inp: 0,
            pos_inp: 0,
            pos_base: 0,
            pos_eof,
            sequential,
            seeks: 0,
            sys_pos: 0,
            pos_red: -1,
            red_idx: 0,
            red_len: 0,
        })
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn invalidate_cache(&mut self) {
        self.pos_red = -1;
        self.red_len = 0;
    }

    fn seek_to(&mut self, pos: i64) -> Result<(), InputError> {
        if pos != self.sys_pos {
            self.inner
                .seek(SeekFrom::Start(pos as u64))
                .map_err(InputError::Seek)?;
            self.seeks += 1;
            self.sys_pos = pos;
        }
        Ok(())
    }

    /// Read block-sized chunks from the stream into the window until
    /// the stream position passes `end_incl`. Returns the updated
    /// `(write_index, stream_pos)` and whether `end_incl` lies at or
    /// past EOF.
    fn read_blocks(
        &mut self,
        mut w: i64,
        mut from: i64,
        end_incl: i64,
    ) -> Result<(i64, i64, bool), InputError> {
        while from <= end_incl {
            let mut todo = self.blk_size;
            if w == self.buf_size {
                w = 0;
            } else if self.buf_size - w < todo {
                todo = self.buf_size - w;
            }
            let n = read_full(
                &mut self.inner,
                &mut self.buf[w as usize..(w + todo) as usize],
            )
            .map_err(InputError::Read)? as i64;
            w += n;
            from += n;
            self.used += n;
            self.sys_pos += n;
            if n < todo {
                // Short read loop only ends at true EOF.
                self.pos_eof = from;
                if self.used > self.buf_size {
                    self.used = self.buf_size;
                }
                return Ok((w, from, end_incl >= self.pos_eof));
            }
        }
        if self.used > self.buf_size {
            self.used = self.buf_size;
        }
        Ok((w, from, false))
    }

    /// Bring `pos` into the window (append, reset or scrollback).
    fn fetch(&mut self, pos: i64, mode: ReadMode) -> Result<Option<Located>, InputError> {
        let win_start = self.pos_inp - self.used;
        let op = if pos < win_start {
            // Reading before the window start.
            if mode == ReadMode::SoftAhead {
                return Ok(Some(Located::Eob));
            }
            if self.sequential {
                if mode == ReadMode::HardAhead {
                    return Ok(Some(Located::Eob));
                }
                return Err(InputError::SeekUnsupported { pos });
            }
            if pos + self.buf_size - self.blk_size > win_start {
                SeekOp::Scrollback
            } else {
                SeekOp::Reset
            }
        } else if pos >= self.pos_inp + self.buf_size {
            // Jumping forward by more than one window.
            if mode == ReadMode::SoftAhead {
                return Ok(Some(Located::Eob));
            }
            SeekOp::Reset
        } else {
            if mode == ReadMode::SoftAhead && pos > self.pos_base + self.buf_size - self.blk_size {
                return Ok(Some(Located::Eob));
            }
            SeekOp::Append
        };

        match op {
            SeekOp::Reset => {
                self.pos_inp = if self.sequential {
                    // Jump forward but keep the window as full as
                    // possible behind `pos`.
                    (pos - self.buf_size + self.blk_size) / self.blk_size * self.blk_size
                } else {
                    pos / self.blk_size * self.blk_size
                };
                self.inp = 0;
                self.pos_base = self.pos_inp;
                self.used = 0;
                self.seek_to(self.pos_inp)?;
                let (w, from, eof) = self.read_blocks(self.inp, self.pos_inp, pos)?;
                self.inp = w;
                self.pos_inp = from;
                if eof {
                    return Ok(Some(Located::Eof));
                }
            }
            SeekOp::Append => {
                self.seek_to(self.pos_inp)?;
                let (w, from, eof) = self.read_blocks(self.inp, self.pos_inp, pos)?;
                self.inp = w;
                self.pos_inp = from;
                if eof {
                    return Ok(Some(Located::Eof));
                }
            }
            SeekOp::Scrollback => {
                let target = pos / self.blk_size * self.blk_size;
                let span = self.pos_inp - target;
                if span > self.buf_size {
                    // Drop the newest bytes to make room.
                    let excess = span - self.buf_size;
                    self.used -= excess;
                    self.pos_inp -= excess;
                    self.inp -= excess % self.buf_size;
                    if self.inp < 0 {
                        self.inp += self.buf_size;
                    }
                }
                let mut w = self.inp - (self.pos_inp - target);
                while w < 0 {
                    w += self.buf_size;
                }
                self.seek_to(target)?;
                let (_, _, eof) = self.read_blocks(w, target, win_start - 1)?;
                if eof {
                    // A scrollback only hits EOF when the stream was
                    // truncated underneath us.
                    return Err(InputError::Read(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "stream truncated during scrollback",
                    )));
                }
                self.seek_to(self.pos_inp)?;
            }
        }
        Ok(None)
    }

    /// Locate `pos` in the window, fetching it first if necessary.
    fn locate(&mut self, pos: i64, mode: ReadMode) -> Result<Located, InputError> {
        if pos >= self.pos_eof {
            return Ok(Located::Eof);
        }
        if !(pos < self.pos_inp && pos >= self.pos_inp - self.used) {
            if let Some(out) = self.fetch(pos, mode)? {
                return Ok(out);
            }
        }
        let dist = self.pos_inp - pos;
        let (idx, avail) = if dist <= self.inp {
            (self.inp - dist, dist)
        } else {
            let idx = self.inp + self.buf_size - dist;
            (idx, self.buf_size - idx)
        };
        Ok(Located::At { idx, avail })
    }

    fn get_slow(&mut self, pos: i64, mode: ReadMode) -> Result<Fetch, InputError> {
        match self.locate(pos, mode)? {
            Located::At { idx, avail } => {
                self.pos_red = pos + 1;
                self.red_len = avail - 1;
                self.red_idx = idx + 1;
                if self.red_idx == self.buf_size {
                    self.red_idx = 0;
                }
                Ok(Fetch::Byte(self.buf[idx as usize]))
            }
            Located::Eof => {
                self.invalidate_cache();
                Ok(Fetch::Eof)
            }
            Located::Eob => {
                self.invalidate_cache();
                Ok(Fetch::Eob)
            }
        }
    }
}

impl<R: Read + Seek> Input for AheadReader<R> {
    #[inline]
    fn get(&mut self, pos: i64, mode: ReadMode) -> Result<Fetch, InputError> {
        if pos == self.pos_red && self.red_len > 0 {
            let b = self.buf[self.red_idx as usize];
            self.pos_red += 1;
            self.red_len -= 1;
            self.red_idx += 1;
            if self.red_idx == self.buf_size {
                self.red_idx = 0;
            }
            Ok(Fetch::Byte(b))
        } else {
            self.get_slow(pos, mode)
        }
    }

    fn getbuf(&mut self, pos: i64) -> Result<Option<&[u8]>, InputError> {
        // The window may move; the byte cache would go stale with it.
        self.invalidate_cache();
        match self.locate(pos, ReadMode::Read)? {
            Located::At { idx, avail } => {
                Ok(Some(&self.buf[idx as usize..(idx + avail) as usize]))
            }
            _ => Ok(None),
        }
    }

    fn set_lookahead_base(&mut self, base: i64) {
        self.pos_base = base;
    }

    fn buf_pos(&self) -> i64 {
        self.pos_inp - self.used
    }

    fn buf_size(&self) -> i64 {
        self.buf_size
    }

    fn known_len(&self) -> Option<i64> {
        if self.pos_eof == i64::MAX {
            None
        } else {
            Some(self.pos_eof)
        }
    }

    fn is_sequential(&self) -> bool {
        self.sequential
    }

    fn seek_count(&self) -> u64 {
        self.seeks
    }
}

/// Read until `buf` is full or the stream ends. A plain `read` may
/// return short without being at EOF.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut done = 0;
    while done < buf.len() {
        match r.read(&mut buf[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(done)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
