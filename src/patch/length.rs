// Variable-width length encoding, big-endian for multi-byte forms.
//
//   first byte   extra   decoded value
//   0..=251      0       first + 1          (1..=252)
//   252          1       253 + next         (253..=508)
//   253          2       raw 16-bit value
//   254          4       raw 32-bit value
//   255          8       raw 64-bit value
//
// The encoder always emits the shortest form.

use std::io::{self, Read, Write};

/// Maximum encoded size: marker byte plus a 64-bit value.
pub const MAX_LEN_BYTES: usize = 9;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `len` (>= 1) into `buf`, returning the number of bytes used.
#[inline]
pub fn encode(len: u64, buf: &mut [u8; MAX_LEN_BYTES]) -> usize {
    debug_assert!(len >= 1);
    if len <= 252 {
        buf[0] = (len - 1) as u8;
        1
    } else if len <= 508 {
        buf[0] = 252;
        buf[1] = (len - 253) as u8;
        2
    } else if len <= 0xFFFF {
        buf[0] = 253;
        buf[1..3].copy_from_slice(&(len as u16).to_be_bytes());
        3
    } else if len <= 0xFFFF_FFFF {
        buf[0] = 254;
        buf[1..5].copy_from_slice(&(len as u32).to_be_bytes());
        5
    } else {
        buf[0] = 255;
        buf[1..9].copy_from_slice(&len.to_be_bytes());
        9
    }
}

/// Encode `len` directly into a writer.
pub fn write<W: Write>(w: &mut W, len: u64) -> io::Result<usize> {
    let mut buf = [0u8; MAX_LEN_BYTES];
    let n = encode(len, &mut buf);
    w.write_all(&buf[..n])?;
    Ok(n)
}

/// Encoded size of `len` without encoding it.
#[inline]
pub fn sizeof(len: u64) -> usize {
    if len <= 252 {
        1
    } else if len <= 508 {
        2
    } else if len <= 0xFFFF {
        3
    } else if len <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read one encoded length from a streaming source.
pub fn read<R: Read>(r: &mut R) -> io::Result<u64> {
    let first = read_byte(r)?;
    match first {
        0..=251 => Ok(first as u64 + 1),
        252 => Ok(253 + read_byte(r)? as u64),
        253 => {
            let mut b = [0u8; 2];
            r.read_exact(&mut b)?;
            Ok(u16::from_be_bytes(b) as u64)
        }
        254 => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            Ok(u32::from_be_bytes(b) as u64)
        }
        255 => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Ok(u64::from_be_bytes(b))
        }
    }
}

fn read_byte<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(len: u64) -> Vec<u8> {
        let mut buf = [0u8; MAX_LEN_BYTES];
        let n = encode(len, &mut buf);
        buf[..n].to_vec()
    }

    #[test]
    fn single_byte_forms() {
        assert_eq!(enc(1), [0x00]);
        assert_eq!(enc(8), [0x07]);
        assert_eq!(enc(252), [0xFB]);
    }

    #[test]
    fn two_byte_forms() {
        assert_eq!(enc(253), [0xFC, 0x00]);
        assert_eq!(enc(508), [0xFC, 0xFF]);
    }

    #[test]
    fn sixteen_bit_form_is_raw_big_endian() {
        assert_eq!(enc(509), [0xFD, 0x01, 0xFD]);
        assert_eq!(enc(0xFFFF), [0xFD, 0xFF, 0xFF]);
    }

    #[test]
    fn wide_forms() {
        assert_eq!(enc(0x1_0000), [0xFE, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(enc(0xFFFF_FFFF), [0xFE, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            enc(0x1_0000_0000),
            [0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn roundtrip_boundaries() {
        let cases: &[u64] = &[
            1,
            2,
            251,
            252,
            253,
            254,
            507,
            508,
            509,
            510,
            0xFFFF,
            0x1_0000,
            0xFFFF_FFFF,
            0x1_0000_0000,
            u64::MAX,
        ];
        for &len in cases {
            let bytes = enc(len);
            assert_eq!(bytes.len(), sizeof(len), "sizeof mismatch for {len}");
            let mut cur = std::io::Cursor::new(&bytes);
            assert_eq!(read(&mut cur).unwrap(), len, "roundtrip failed for {len}");
            assert_eq!(cur.position() as usize, bytes.len());
        }
    }

    #[test]
    fn truncated_input_errors() {
        let mut cur = std::io::Cursor::new(&[0xFDu8, 0x01][..]);
        assert!(read(&mut cur).is_err());
        let mut cur = std::io::Cursor::new(&[][..]);
        assert!(read(&mut cur).is_err());
    }

    #[test]
    fn write_matches_encode() {
        let mut out = Vec::new();
        let n = write(&mut out, 509).unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, enc(509));
    }
}
