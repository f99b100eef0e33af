// Human-readable region listing.
//
// A sink that groups consecutive operators and prints one line per
// region with the source/destination positions and the length. Byte
// accounting mirrors the binary sink so the summary numbers match what
// a binary patch would have cost.

use std::io::{self, Write};

use super::{length, Op, ESC};
use crate::patch::encoder::{PatchSink, SinkStats};

/// Grouped listing writer, for patch inspection.
pub struct ListingSink<W> {
    out: W,
    cur: Option<Op>,
    cnt: u64,
    stats: SinkStats,
}

impl<W: Write> ListingSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cur: None,
            cnt: 0,
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    pub fn differences(&self) -> bool {
        self.stats.data > 0
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_group(&mut self, pos_org: i64, pos_new: i64) -> io::Result<()> {
        let cnt = self.cnt as i64;
        match self.cur {
            Some(Op::Mod) => {
                self.stats.ctl += 2;
                self.stats.data += self.cnt;
                writeln!(self.out, "{:>12} {:>12} MOD {}", pos_org - cnt, pos_new - cnt, cnt)?;
            }
            Some(Op::Ins) => {
                self.stats.ctl += 2;
                self.stats.data += self.cnt;
                writeln!(self.out, "{:>12} {:>12} INS {}", pos_org, pos_new - cnt, cnt)?;
            }
            Some(Op::Del) => {
                self.stats.ctl += 2 + length::sizeof(self.cnt) as u64;
                self.stats.del += self.cnt;
                writeln!(self.out, "{:>12} {:>12} DEL {}", pos_org - cnt, pos_new, cnt)?;
            }
            Some(Op::Bkt) => {
                self.stats.ctl += 2 + length::sizeof(self.cnt) as u64;
                self.stats.bkt += self.cnt;
                writeln!(self.out, "{:>12} {:>12} BKT {}", pos_org + cnt, pos_new, cnt)?;
            }
            Some(Op::Eql) => {
                self.stats.ctl += 2 + length::sizeof(self.cnt) as u64;
                self.stats.eql += self.cnt;
                writeln!(self.out, "{:>12} {:>12} EQL {}", pos_org - cnt, pos_new - cnt, cnt)?;
            }
            Some(Op::Esc) | None => {}
        }
        self.cnt = 0;
        Ok(())
    }
}

impl<W: Write> PatchSink for ListingSink<W> {
    fn put(
        &mut self,
        op: Op,
        len: u64,
        _org: u8,
        new: u8,
        pos_org: i64,
        pos_new: i64,
    ) -> io::Result<bool> {
        if self.cur != Some(op) {
            self.close_group(pos_org, pos_new)?;
            self.cur = Some(op);
        }
        match op {
            Op::Mod | Op::Ins => {
                if new == ESC {
                    self.stats.esc += 1;
                }
                self.cnt += len;
            }
            Op::Del | Op::Eql | Op::Bkt => {
                self.cnt += len;
            }
            Op::Esc => {
                self.stats.ctl += 2;
                self.out.flush()?;
            }
        }
        // A listing never needs per-byte feedback; report counting mode
        // immediately so the driver uses its fast path.
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
