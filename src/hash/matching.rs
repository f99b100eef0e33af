// Candidate match table.
//
// Index hits are statistical twice over: the index retains only a
// sample of source positions, and equal hash words do not imply equal
// bytes. The table therefore accumulates candidate equal regions during
// a search pass, verifies them with byte compares, and elects the
// nearest usable region at the end of the pass.
//
// Two candidate families:
//   - colliding: constant delta = org - new; the same shifted region
//     confirmed by several hits
//   - gliding: constant org while the destination hit position moves;
//     the signature of a long byte run in the source
//
// Records are pooled and never freed; aging moves them between a "new"
// list (touched this pass) and an "old" list (reusable when stale). The
// intrusive links are pool indices with u32::MAX as nil.

use tracing::trace;

use super::SAMPLE_SIZE;
use crate::config::lower_prime;
use crate::input::{Fetch, Input, InputError, ReadMode};

// Runs of EQLSZE equal bytes are worth jumping to; EQLMIN is the
// shortest run check() reports; EQLMAX caps one verification.
pub(crate) const EQLSZE: i64 = 8;
pub(crate) const EQLMIN: i64 = 4;
pub(crate) const EQLMAX: i64 = 256;

/// Compare-distance budget clamp.
const MAXDST: i64 = 2 * 1024 * 1024;
const MINDST: i64 = 1024;

/// Fuzz margin when comparing candidate end positions.
const FZY: i64 = 0;

// Compare codes stored in `cmp`: positive = verified run length.
const CMPINV: i64 = -1;
const CMPSKP: i64 = -2;
const CMPEOB: i64 = -3;

const NIL: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Records and results
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Rec {
    /// Aging-list link.
    next: u32,
    /// Colliding-chain link (keyed by |delta| mod prime).
    col: u32,
    /// Gliding-chain link (keyed by org mod prime).
    gld_next: u32,
    /// Confirming hits.
    cnt: i64,
    /// 0 = colliding; > 0 = approximate stride of a gliding match.
    gld: i64,
    /// First destination hit.
    beg: i64,
    /// Most recent destination hit.
    new: i64,
    /// Source position of the hits.
    org: i64,
    /// org - new at the time of the first hit.
    dlt: i64,
    /// Destination position of the last compare.
    tst: i64,
    /// Result of the last compare (see compare codes).
    cmp: i64,
}

const EMPTY: Rec = Rec {
    next: NIL,
    col: NIL,
    gld_next: NIL,
    cnt: 0,
    gld: 0,
    beg: 0,
    new: 0,
    org: 0,
    dlt: 0,
    tst: -1,
    cmp: 0,
};

/// Outcome of feeding or sweeping the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No free record and nothing reusable; the search must stop.
    Full,
    /// An existing candidate was refreshed.
    Enlarged,
    /// The candidate does not point at a usable equality.
    Invalid,
    /// A usable candidate exists.
    Valid,
    /// A candidate with a verified run of at least EQLSZE bytes exists
    /// at the current read position.
    Good,
    /// As Good with the verification saturated (EQLMAX).
    Best,
}

// ---------------------------------------------------------------------------
// The table
// ---------------------------------------------------------------------------

/// Table of candidate equal regions between source and destination.
pub struct MatchTable {
    pool: Vec<Rec>,
    /// Records `pool[..free]` have never been handed out.
    free: usize,
    prime: usize,
    col_heads: Vec<u32>,
    gld_heads: Vec<u32>,
    old_head: u32,
    new_head: u32,
    new_tail: u32,
    best: u32,
    best_org: i64,
    best_new: i64,
    best_cmp: i64,
    /// Destination position before which records no longer contribute.
    old_limit: i64,
    /// Reliability distance cached from the index at cleanup time.
    rlb: i64,
    cmp_all: bool,
    repairs: u64,
}

impl MatchTable {
    /// A table of `size` records (floored at 13) verifying candidates
    /// beyond the buffered window iff `cmp_all`.
    pub fn new(size: usize, cmp_all: bool) -> Self {
        let size = size.max(13);
        let prime = lower_prime(size * 2);
        Self {
            pool: vec![EMPTY; size],
            free: size,
            prime,
            col_heads: vec![NIL; prime],
            gld_heads: vec![NIL; prime],
            old_head: NIL,
            new_head: NIL,
            new_tail: NIL,
            best: NIL,
            best_org: 0,
            best_new: 0,
            best_cmp: 0,
            old_limit: 0,
            rlb: SAMPLE_SIZE + SAMPLE_SIZE / 2,
            cmp_all,
            repairs: 0,
        }
    }

    /// Hash hits disproved by byte compare.
    pub fn repairs(&self) -> u64 {
        self.repairs
    }

    // -- chains -------------------------------------------------------------

    fn col_slot(&self, dlt: i64) -> usize {
        (dlt.unsigned_abs() % self.prime as u64) as usize
    }

    fn gld_slot(&self, org: i64) -> usize {
        (org.unsigned_abs() % self.prime as u64) as usize
    }

    fn find_col(&self, slot: usize, dlt: i64) -> u32 {
        let mut p = self.col_heads[slot];
        while p != NIL {
            if self.pool[p as usize].dlt == dlt {
                return p;
            }
            p = self.pool[p as usize].col;
        }
        NIL
    }

    fn find_gld(&self, slot: usize, org: i64) -> u32 {
        let mut p = self.gld_heads[slot];
        while p != NIL {
            if self.pool[p as usize].org == org {
                return p;
            }
            p = self.pool[p as usize].gld_next;
        }
        NIL
    }

    fn del_col(&mut self, rec: u32) {
        let slot = self.col_slot(self.pool[rec as usize].dlt);
        let mut p = self.col_heads[slot];
        if p == rec {
            self.col_heads[slot] = self.pool[rec as usize].col;
            return;
        }
        while p != NIL {
            let next = self.pool[p as usize].col;
            if next == rec {
                self.pool[p as usize].col = self.pool[rec as usize].col;
                return;
            }
            p = next;
        }
    }

    fn del_gld(&mut self, rec: u32) {
        let slot = self.gld_slot(self.pool[rec as usize].org);
        let mut p = self.gld_heads[slot];
        if p == rec {
            self.gld_heads[slot] = self.pool[rec as usize].gld_next;
            return;
        }
        while p != NIL {
            let next = self.pool[p as usize].gld_next;
            if next == rec {
                self.pool[p as usize].gld_next = self.pool[rec as usize].gld_next;
                return;
            }
            p = next;
        }
    }

    // -- aging lists --------------------------------------------------------

    fn add_new(&mut self, rec: u32) {
        self.pool[rec as usize].next = NIL;
        if self.new_head == NIL {
            self.new_head = rec;
        } else {
            self.pool[self.new_tail as usize].next = rec;
        }
        self.new_tail = rec;
    }

    /// Join the new list in front of the old list.
    fn join_lists(&mut self) {
        if self.new_head != NIL {
            self.pool[self.new_tail as usize].next = self.old_head;
            self.old_head = self.new_head;
            self.new_head = NIL;
            self.new_tail = NIL;
        }
    }

    // -- public operations --------------------------------------------------

    /// Feed one index hit `(fnd_org, fnd_new)` observed while the read
    /// position was `red_new`.
    pub fn add<S: Input, D: Input>(
        &mut self,
        src: &mut S,
        dst: &mut D,
        fnd_org: i64,
        fnd_new: i64,
        red_new: i64,
    ) -> Result<Verdict, InputError> {
        let dlt = fnd_org - fnd_new;
        let col_slot = self.col_slot(dlt);
        let gld_slot = self.gld_slot(fnd_org);

        // Merge into a colliding family first, else a gliding one.
        let mut cur = self.find_col(col_slot, dlt);
        if cur != NIL {
            if self.pool[cur as usize].cnt == 1 {
                self.del_gld(cur);
            }
            let r = &mut self.pool[cur as usize];
            r.cnt += 1;
            r.new = fnd_new;
        } else {
            cur = self.find_gld(gld_slot, fnd_org);
            if cur != NIL {
                if self.pool[cur as usize].cnt == 1 {
                    self.del_col(cur);
                }
                let r = &mut self.pool[cur as usize];
                r.cnt += 1;
                r.new = fnd_new;
                if r.gld == 0 {
                    r.gld = if fnd_new <= r.beg + SAMPLE_SIZE {
                        fnd_new - r.beg
                    } else {
                        SAMPLE_SIZE
                    };
                }
            }
        }

        // A refreshed record sitting at the old-list head is fresh
        // again: move it to the new list.
        if cur != NIL && self.old_head == cur {
            self.old_head = self.pool[cur as usize].next;
            self.next_old(red_new);
            self.add_new(cur);
        }

        if cur == NIL {
            // Allocate: free pool first, then the prepared old head.
            if self.free > 0 {
                self.free -= 1;
                cur = self.free as u32;
            } else if self.old_head != NIL {
                cur = self.old_head;
                self.old_head = self.pool[cur as usize].next;
                self.next_old(red_new);
                let (cnt, gld) = {
                    let r = &self.pool[cur as usize];
                    (r.cnt, r.gld)
                };
                if cnt == 1 || gld == 0 {
                    self.del_col(cur);
                }
                if cnt == 1 || gld != 0 {
                    self.del_gld(cur);
                }
            } else {
                return Ok(Verdict::Full);
            }

            let col_head = self.col_heads[col_slot];
            let gld_head = self.gld_heads[gld_slot];
            let r = &mut self.pool[cur as usize];
            r.org = fnd_org;
            r.new = fnd_new;
            r.beg = fnd_new;
            r.dlt = dlt;
            r.cnt = 1;
            r.gld = 0;
            r.cmp = 0;
            r.tst = -1;
            r.col = col_head;
            r.gld_next = gld_head;
            self.col_heads[col_slot] = cur;
            self.gld_heads[gld_slot] = cur;
        }

        // Evaluate new records immediately; reactivate skipped ones.
        let mut ret = Verdict::Enlarged;
        let (cnt, cmp) = {
            let r = &self.pool[cur as usize];
            (r.cnt, r.cmp)
        };
        if cnt == 1 || cmp == CMPSKP {
            if cmp == CMPSKP {
                self.pool[cur as usize].cmp = 0;
            }
            ret = self.is_good_or_best(src, dst, red_new, cur)?;
            match ret {
                Verdict::Invalid => {
                    let (tst, new_pos, cnt) = {
                        let r = &self.pool[cur as usize];
                        (r.tst, r.new, r.cnt)
                    };
                    if tst >= new_pos {
                        // Disproved by compare: mark for prompt reuse
                        // at the front of the new list.
                        self.repairs += 1;
                        self.pool[cur as usize].cmp = CMPINV;
                        if cnt == 1 {
                            if self.new_head == NIL {
                                self.new_tail = cur;
                            }
                            self.pool[cur as usize].next = self.new_head;
                            self.new_head = cur;
                        }
                    } else if cnt == 1 {
                        // Incompletely evaluated: keep as a normal new
                        // entry.
                        self.add_new(cur);
                    }
                }
                Verdict::Valid | Verdict::Good | Verdict::Best => {
                    if self.pool[cur as usize].cnt == 1 {
                        self.add_new(cur);
                    }
                }
                Verdict::Full | Verdict::Enlarged => {}
            }
        }

        if self.free == 0 && self.old_head == NIL {
            Ok(Verdict::Full)
        } else {
            Ok(ret)
        }
    }

    /// Sweep before a search pass: age, re-evaluate, prepare reuse.
    /// `rlb` is the index's current reliability distance.
    pub fn cleanup<S: Input, D: Input>(
        &mut self,
        src: &mut S,
        dst: &mut D,
        _base_org: i64,
        red_new: i64,
        rlb: i64,
    ) -> Result<Verdict, InputError> {
        self.rlb = rlb;
        self.join_lists();
        self.best = NIL;
        self.old_limit = red_new;

        let mut p = self.old_head;
        while p != NIL {
            if self.is_old_to_skip(p, red_new) {
                self.pool[p as usize].cmp = CMPSKP;
            } else {
                self.is_good_or_best(src, dst, red_new, p)?;
            }
            p = self.pool[p as usize].next;
        }

        self.next_old(red_new);

        Ok(if self.old_head == NIL && self.free == 0 {
            Verdict::Full
        } else if self.best == NIL {
            Verdict::Invalid
        } else if self.best_new != red_new {
            Verdict::Valid
        } else if self.best_cmp >= EQLMAX {
            Verdict::Best
        } else if self.best_cmp >= EQLSZE {
            Verdict::Good
        } else {
            Verdict::Valid
        })
    }

    /// The elected best region, as `(org, new)` positions, after
    /// rescoring end-of-buffer candidates whose hits kept arriving.
    pub fn getbest(&mut self, red_new: i64) -> Option<(i64, i64)> {
        if !self.cmp_all {
            // EOB candidates were scored from hit counts; hits that
            // arrived after their evaluation may change the election.
            self.join_lists();
            let mut rescored_best = false;
            let mut p = self.old_head;
            while p != NIL {
                let r = self.pool[p as usize];
                if p != self.best && r.cmp <= CMPEOB && r.new > r.tst {
                    if self.is_best(p, red_new, 0, r.tst, r.cmp) {
                        rescored_best = true;
                    }
                }
                p = self.pool[p as usize].next;
            }
            if rescored_best && self.best_org == 0 {
                let mut org = 0;
                let mut new = self.best_new;
                self.calc_pos_org(self.best, &mut org, &mut new);
                self.best_org = org;
                self.best_new = new;
            }
        }
        if self.best != NIL {
            Some((self.best_org, self.best_new))
        } else {
            None
        }
    }

    // -- evaluation ---------------------------------------------------------

    /// Map the current read position onto the candidate: gliding
    /// records anchor the source at `org` once inside the run; others
    /// apply the delta, clamped so the source never goes negative.
    /// Returns whether the gliding rule applied.
    fn calc_pos_org(&self, rec: u32, tst_org: &mut i64, tst_new: &mut i64) -> bool {
        let r = &self.pool[rec as usize];
        if r.gld > 0 && *tst_new >= r.beg {
            *tst_org = r.org;
            true
        } else {
            if *tst_new + r.dlt >= 0 {
                *tst_org = *tst_new + r.dlt;
            } else {
                *tst_new = -r.dlt;
                *tst_org = 0;
            }
            false
        }
    }

    /// Evaluate one candidate against the current read position,
    /// reusing previous compare results where they still apply.
    fn is_good_or_best<S: Input, D: Input>(
        &mut self,
        src: &mut S,
        dst: &mut D,
        red_new: i64,
        cur: u32,
    ) -> Result<Verdict, InputError> {
        let mut tst_new = red_new;
        let mut tst_org = 0;
        let gld = self.calc_pos_org(cur, &mut tst_org, &mut tst_new);
        let r = self.pool[cur as usize];

        let mut cur_cmp;
        if tst_new <= r.tst {
            // Still at or before the previous result: reuse it.
            cur_cmp = r.cmp;
            if cur_cmp == CMPSKP || cur_cmp == CMPINV {
                cur_cmp = 0;
            }
            if gld {
                tst_new = r.tst;
                tst_org = r.org;
            } else {
                tst_org += r.tst - tst_new;
                tst_new = r.tst;
            }
        } else if !gld && r.cmp > 0 && r.tst - tst_new + r.cmp > EQLMIN {
            // Inside the previously verified run: report the remainder.
            cur_cmp = r.tst - tst_new + r.cmp;
        } else {
            let dist = (r.beg - tst_new).clamp(MINDST, MAXDST);
            let mode = if self.cmp_all {
                ReadMode::HardAhead
            } else {
                ReadMode::SoftAhead
            };
            cur_cmp = check(
                src,
                dst,
                &mut tst_org,
                &mut tst_new,
                dist,
                if gld { r.gld } else { 0 },
                mode,
            )?;
            let rr = &mut self.pool[cur as usize];
            rr.tst = tst_new;
            if !(rr.cmp == CMPINV && cur_cmp <= 0) {
                rr.cmp = cur_cmp;
            }
        }

        // A saturated compare almost certainly extends to the last hit.
        let r = self.pool[cur as usize];
        if r.cmp >= EQLMAX && r.new > tst_new + cur_cmp {
            cur_cmp += r.new - tst_new;
        }

        self.is_best(cur, red_new, tst_org, tst_new, cur_cmp);

        Ok(if cur_cmp == 0 {
            Verdict::Invalid
        } else if tst_new != red_new {
            Verdict::Valid
        } else if cur_cmp >= EQLMAX {
            Verdict::Best
        } else if cur_cmp >= EQLSZE {
            Verdict::Good
        } else {
            Verdict::Valid
        })
    }

    /// Election. EOB candidates get a virtual score derived from hit
    /// counts before competing. Returns whether `cur` is now best.
    fn is_best(
        &mut self,
        cur: u32,
        red_new: i64,
        mut tst_org: i64,
        mut tst_new: i64,
        mut cur_cmp: i64,
    ) -> bool {
        let r = self.pool[cur as usize];
        let mut cur_cnt: i64 = -1;

        if cur_cmp <= CMPEOB {
            // No bytes to compare: rely on what the index reported.
            cur_cnt = if r.gld > 0 { 1 + r.cnt / 2 } else { r.cnt };
            if tst_new <= r.beg {
                // Before the first hit: the region starts there.
                cur_cmp = cur_cnt;
                tst_new = r.beg;
                tst_org = r.org;
            } else if tst_new <= r.new + self.rlb {
                // Between first and last hit: estimate the distance to
                // an equality from the reliability range.
                cur_cmp = cur_cnt;
                let d = 1 + self.rlb - self.rlb.min(r.cnt);
                tst_new += d;
                tst_org += d;
            } else {
                // Aging: decay the score with the distance.
                cur_cmp = cur_cnt - 1 - (tst_new - r.new) / (self.rlb / 8);
                let d = cur_cnt - cur_cmp;
                tst_new += d;
                tst_org += d;
            }
            if cur_cmp < 1 {
                cur_cmp = 1;
            } else {
                // Halve so real compares still beat hash-only scores.
                cur_cmp = 1 + EQLMAX.min(cur_cmp) / 2;
            }
            if cur_cmp > 3 {
                self.pool[cur as usize].cmp = -cur_cmp;
            }
        }

        if cur_cmp > 0 {
            let mut take = false;
            if self.best == NIL {
                take = true;
            } else if cur_cmp < 2 && self.best_cmp > 4 {
                // Keep a real match over a hash-only rumor.
            } else if self.best_cmp < 2 && cur_cmp > 4 {
                take = true;
            } else if tst_new + FZY < self.best_new {
                take = true;
            } else if tst_new <= self.best_new + FZY {
                let cur_start = tst_new - cur_cmp;
                let best_start = self.best_new - self.best_cmp;
                if cur_start < best_start {
                    take = true;
                } else if cur_start == best_start {
                    if cur_cnt < 0 {
                        cur_cnt = if r.gld > 0 { r.cnt / 2 } else { r.cnt };
                    }
                    let b = self.pool[self.best as usize];
                    let best_cnt = if b.gld > 0 { b.cnt / 2 } else { b.cnt };
                    if cur_cnt > best_cnt {
                        take = true;
                    }
                }
            }
            if take {
                self.best = cur;
                self.best_org = tst_org;
                self.best_new = tst_new;
                self.best_cmp = cur_cmp;
                // The elected run covers up to tst + cmp; candidates
                // entirely before that minus the reliability margin are
                // no longer useful.
                let rc = self.pool[cur as usize];
                self.old_limit = (rc.tst + rc.cmp.min(0) - self.rlb).max(red_new);
                trace!(
                    org = self.best_org,
                    new = self.best_new,
                    cmp = self.best_cmp,
                    "best candidate"
                );
            }
        }

        self.best == cur
    }

    // -- aging --------------------------------------------------------------

    /// Records so stale that re-evaluating them each pass is wasted
    /// work. A later hit can resurrect them.
    fn is_old_to_skip(&self, rec: u32, red_new: i64) -> bool {
        let r = &self.pool[rec as usize];
        match r.cmp {
            CMPSKP => true,
            CMPINV | 0 => r.new + MAXDST <= red_new,
            _ => r.new + MAXDST <= red_new && r.tst + r.cmp.abs() < red_new,
        }
    }

    /// Records whose slot may be overwritten by a new candidate.
    fn is_old_to_reuse(&self, rec: u32) -> bool {
        let r = &self.pool[rec as usize];
        match r.cmp {
            CMPSKP | CMPINV => true,
            CMPEOB => rec != self.best && r.new < self.old_limit,
            0 => r.new < r.tst || r.new < self.old_limit,
            _ => {
                rec != self.best
                    && r.new < self.old_limit
                    && r.tst + r.cmp.abs() < self.old_limit
            }
        }
    }

    /// Walk the old list until a reusable head is in place, migrating
    /// still-live records back to the new list. When the old list runs
    /// dry, pull invalid records off the new list, resurrecting
    /// enlarged ones on the way.
    fn next_old(&mut self, _red_new: i64) {
        loop {
            let h = self.old_head;
            if h == NIL || self.is_old_to_reuse(h) {
                break;
            }
            self.old_head = self.pool[h as usize].next;
            self.add_new(h);
        }

        if self.old_head == NIL && self.new_head != NIL {
            let mut p = self.new_head;
            while p != NIL && self.pool[p as usize].cmp == CMPINV {
                let next = self.pool[p as usize].next;
                self.new_head = next;
                if next == NIL {
                    self.new_tail = NIL;
                }
                let r = self.pool[p as usize];
                if r.cnt > 1 && r.new > r.tst {
                    // Hits arrived after the disproof: try it again.
                    self.pool[p as usize].cmp = 0;
                    self.add_new(p);
                    p = next;
                } else {
                    self.pool[p as usize].next = NIL;
                    self.old_head = p;
                    break;
                }
            }
        }
    }

    /// List/pool accounting, for the table invariant
    /// `new + old + free == size`.
    #[cfg(test)]
    fn counts(&self) -> (usize, usize, usize) {
        let mut new = 0;
        let mut p = self.new_head;
        while p != NIL {
            new += 1;
            p = self.pool[p as usize].next;
        }
        let mut old = 0;
        let mut p = self.old_head;
        while p != NIL {
            old += 1;
            p = self.pool[p as usize].next;
        }
        (new, old, self.free)
    }
}

// ---------------------------------------------------------------------------
// Byte-level verification
// ---------------------------------------------------------------------------

/// Search for a run of equal bytes at `(pos_org, pos_new)`.
///
/// Scans forward, allowing up to `len` mismatched destination bytes; on
/// a mismatch a colliding probe advances the source in lockstep while a
/// gliding probe (gld != 0) rewinds it to stay anchored. Accumulation
/// stops at EQLMAX.
///
/// Returns the run length (> EQLMIN) with both positions rewound to the
/// start of the run, CMPEOB if a soft read ran out of window first, or
/// 0 when nothing was found.
fn check<S: Input, D: Input>(
    src: &mut S,
    dst: &mut D,
    pos_org: &mut i64,
    pos_new: &mut i64,
    mut len: i64,
    gld: i64,
    mode: ReadMode,
) -> Result<i64, InputError> {
    let mut eql: i64 = 0;
    let mut hit_eob = false;

    while eql < EQLMAX {
        let co = match src.get(*pos_org, mode)? {
            Fetch::Byte(b) => b,
            Fetch::Eob => {
                hit_eob = true;
                break;
            }
            Fetch::Eof => break,
        };
        let cn = match dst.get(*pos_new, mode)? {
            Fetch::Byte(b) => b,
            Fetch::Eob => {
                hit_eob = true;
                break;
            }
            Fetch::Eof => break,
        };
        if co == cn {
            *pos_org += 1;
            *pos_new += 1;
            eql += 1;
        } else if eql >= EQLSZE {
            break;
        } else if len <= 0 {
            break;
        } else {
            *pos_new += 1;
            if gld != 0 {
                *pos_org -= eql;
            } else {
                *pos_org += 1;
            }
            eql = 0;
        }
        len -= 1;
    }

    if eql > EQLMIN {
        *pos_org -= eql;
        *pos_new -= eql;
        Ok(eql)
    } else if hit_eob {
        Ok(CMPEOB)
    } else {
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
