use crate::{MspErr, Protocol};
use std::io::Read;

const SEGMENT_BITS: u64 = 0x7F;
const CHECKER_BIT: u8 = 0x80;
/// VarInts are never longer than 5 bytes, so decoding stops once 35 bits are consumed.
const MAX_BIT_OFFSET: u32 = 35;
const MAX_VARINT_LEN: usize = 5;

/// Encode the given number as a [VarInt](https://wiki.vg/Protocol#VarInt_and_VarLong).
///
/// Only non-negative lengths are written by this crate, so the input is unsigned.
pub fn encode_varint(num: u64) -> Vec<u8> {
    let mut num = num;
    let mut result = Vec::<u8>::with_capacity(MAX_VARINT_LEN);

    loop {
        if (num & !SEGMENT_BITS) == 0 {
            result.push(num as u8);

            return result;
        }

        result.push(((num & SEGMENT_BITS) as u8) | CHECKER_BIT);
        num >>= 7;
    }
}

/// Decode a VarInt from the front of `bufs`.
///
/// Returns the value and the number of bytes it occupied. Bytes after the
/// terminating byte are left untouched.
///
/// VarInts only frame the modern status protocol, so every error here is a
/// status error: running out of bytes mid-VarInt is
/// `ResponseTooShort(Protocol::Status)`.
pub fn decode_varint(bufs: &[u8]) -> Result<(u64, usize), MspErr> {
    let mut result = 0u64;
    let mut bit_offset = 0u32;

    for (idx, &buf) in bufs.iter().enumerate() {
        if bit_offset == MAX_BIT_OFFSET {
            return Err(MspErr::VarIntTooLarge);
        }

        result |= (buf as u64 & SEGMENT_BITS) << bit_offset;

        if buf & CHECKER_BIT == 0 {
            return Ok((result, idx + 1));
        }

        bit_offset += 7;
    }

    // Ran out of bytes while the continuation bit was still set.
    Err(MspErr::ResponseTooShort(Protocol::Status))
}

/// Read a VarInt one byte at a time, stopping at the first byte without the
/// continuation bit.
pub fn decode_varint_from_reader<R: Read>(reader: &mut R) -> Result<u64, MspErr> {
    let mut bufs = Vec::<u8>::with_capacity(MAX_VARINT_LEN + 1);
    let mut temp_buf = [0u8; 1];

    loop {
        reader.read_exact(&mut temp_buf)?;
        bufs.push(temp_buf[0]);

        if temp_buf[0] & CHECKER_BIT == 0 {
            break;
        }

        // One byte past the limit is enough to know it is invalid.
        if bufs.len() > MAX_VARINT_LEN {
            return Err(MspErr::VarIntTooLarge);
        }
    }

    tracing::trace!(?bufs, "read varint");

    Ok(decode_varint(&bufs)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(1), vec![0x01]);
        assert_eq!(encode_varint(127), vec![0x7F]);
        assert_eq!(encode_varint(128), vec![0x80, 0x01]);
        assert_eq!(encode_varint(255), vec![0xFF, 0x01]);
        assert_eq!(encode_varint(25565), vec![0xDD, 0xC7, 0x01]);
        assert_eq!(encode_varint(2097151), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(encode_varint(2147483647), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
    }

    #[test]
    fn decodes_what_it_encodes_up_to_35_bits() {
        let samples = [
            0u64,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            2_097_151,
            268_435_455,
            268_435_456,
            (1 << 32) + 7,
            (1 << 35) - 1,
        ];

        for n in samples {
            let encoded = encode_varint(n);
            assert!(encoded.len() <= 5, "{} took {} bytes", n, encoded.len());
            assert_eq!(decode_varint(&encoded).unwrap(), (n, encoded.len()));
        }
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        assert_eq!(decode_varint(&[0xAC, 0x02, 0x7B, 0x22]).unwrap(), (300, 2));
    }

    #[test]
    fn six_byte_varint_is_too_large() {
        let bufs = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];

        assert!(matches!(decode_varint(&bufs), Err(MspErr::VarIntTooLarge)));
        assert!(matches!(
            decode_varint(&[0xFF; 8]),
            Err(MspErr::VarIntTooLarge)
        ));
    }

    #[test]
    fn unterminated_varint_is_too_short() {
        assert!(matches!(
            decode_varint(&[0x80, 0x80]),
            Err(MspErr::ResponseTooShort(Protocol::Status))
        ));
        assert!(matches!(
            decode_varint(&[]),
            Err(MspErr::ResponseTooShort(_))
        ));
    }

    #[test]
    fn reads_varint_from_stream_byte_by_byte() {
        let mut reader = std::io::Cursor::new(vec![0xDD, 0xC7, 0x01, 0x42]);

        assert_eq!(decode_varint_from_reader(&mut reader).unwrap(), 25565);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn stream_varint_stops_after_limit() {
        let mut reader = std::io::Cursor::new(vec![0x80; 32]);

        assert!(matches!(
            decode_varint_from_reader(&mut reader),
            Err(MspErr::VarIntTooLarge)
        ));
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn stream_varint_eof_is_io_error() {
        let mut reader = std::io::Cursor::new(vec![0x80]);

        assert!(matches!(
            decode_varint_from_reader(&mut reader),
            Err(MspErr::IoErr(_))
        ));
    }
}
