// Patch stream model.
//
// A patch is a sequence of escape-introduced operator records:
//
//   <patch>     ::= ( <op> )* ESC 0x00
//   <op>        ::= ESC <MOD|INS> <byte-run> | ESC <DEL|EQL|BKT> <length>
//   <byte-run>  ::= ( <byte except ESC> | ESC ESC )*
//
// The leading ESC MOD of the first record may be omitted; a decoder
// seeing anything but ESC at the start assumes MOD.

pub mod decoder;
pub mod encoder;
pub mod length;
pub mod listing;

pub use decoder::{apply, apply_bytes, ApplyError};
pub use encoder::{BinarySink, PatchSink, SinkStats};
pub use listing::ListingSink;

// ---------------------------------------------------------------------------
// Operator bytes
// ---------------------------------------------------------------------------

/// Escape: introduces every operator, doubled to represent itself in
/// data runs, and `ESC 0x00` terminates the patch.
pub const ESC: u8 = 0xA7;
/// Modify: replace source bytes with the bytes that follow.
pub const MOD: u8 = 0xA6;
/// Insert: emit the bytes that follow without consuming source.
pub const INS: u8 = 0xA5;
/// Delete: skip a length of source bytes.
pub const DEL: u8 = 0xA4;
/// Equal: copy a length of source bytes.
pub const EQL: u8 = 0xA3;
/// Backtrack: rewind the source cursor by a length.
pub const BKT: u8 = 0xA2;

/// Edit operator handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Esc,
    Mod,
    Ins,
    Del,
    Eql,
    Bkt,
}

impl Op {
    /// Wire byte of this operator.
    pub fn byte(self) -> u8 {
        match self {
            Op::Esc => ESC,
            Op::Mod => MOD,
            Op::Ins => INS,
            Op::Del => DEL,
            Op::Eql => EQL,
            Op::Bkt => BKT,
        }
    }

    /// Operator for a wire byte, if it is one.
    pub fn from_byte(b: u8) -> Option<Op> {
        match b {
            ESC => Some(Op::Esc),
            MOD => Some(Op::Mod),
            INS => Some(Op::Ins),
            DEL => Some(Op::Del),
            EQL => Some(Op::Eql),
            BKT => Some(Op::Bkt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_bytes_are_contiguous() {
        assert_eq!(ESC, 0xA7);
        assert_eq!(MOD, 0xA6);
        assert_eq!(INS, 0xA5);
        assert_eq!(DEL, 0xA4);
        assert_eq!(EQL, 0xA3);
        assert_eq!(BKT, 0xA2);
    }

    #[test]
    fn byte_roundtrip() {
        for op in [Op::Esc, Op::Mod, Op::Ins, Op::Del, Op::Eql, Op::Bkt] {
            assert_eq!(Op::from_byte(op.byte()), Some(op));
        }
        assert_eq!(Op::from_byte(0x00), None);
        assert_eq!(Op::from_byte(0xA1), None);
    }
}
