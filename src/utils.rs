use byteorder::{ByteOrder, LE};

/// Magic bytes at the start of every patch.
pub const MAGIC: &[u8; 8] = b"BSDIFF40";

/// Size of the patch header: magic, three length fields and the SHA-256 of
/// the source data.
pub const HEADER_SIZE: usize = 64;

/// Single bsdiff control instruction.
#[derive(Debug)]
pub struct Control {
    pub add: u64,
    pub copy: u64,
    pub seek: i64,
}

/// Decodes a sign/magnitude integer: the top bit of byte 7 is the sign, the
/// remaining 63 bits are the magnitude. Not two's complement; the negative
/// zero pattern decodes to zero.
#[inline]
pub fn decode_int(b: &[u8]) -> i64 {
    let x = LE::read_u64(b);
    let magnitude = (x & 0x7fff_ffff_ffff_ffff) as i64;
    if x >> 63 == 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Encodes a sign/magnitude integer.
#[inline]
pub fn encode_int(x: i64, b: &mut [u8]) {
    if x < 0 {
        LE::write_u64(b, x.wrapping_neg() as u64 | 0x8000_0000_0000_0000);
    } else {
        LE::write_u64(b, x as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_int, encode_int};

    #[test]
    fn codec_round_trip() {
        let samples: &[i64] = &[
            0,
            1,
            -1,
            8,
            -8,
            255,
            256,
            -256,
            9001,
            0x7fff_ffff,
            -0x7fff_ffff,
            i64::MAX,
            -i64::MAX,
        ];
        let mut buf = [0u8; 8];
        for &x in samples {
            encode_int(x, &mut buf);
            assert_eq!(decode_int(&buf), x, "round trip of {}", x);
        }
    }

    #[test]
    fn negative_zero_decodes_to_zero() {
        let buf = [0, 0, 0, 0, 0, 0, 0, 0x80];
        assert_eq!(decode_int(&buf), 0);

        let mut enc = [0xffu8; 8];
        encode_int(0, &mut enc);
        assert_eq!(enc, [0u8; 8]);
    }

    #[test]
    fn sign_bit_is_not_twos_complement() {
        let mut buf = [0u8; 8];
        encode_int(-1, &mut buf);
        assert_eq!(buf, [1, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_ne!(buf, (-1i64).to_le_bytes());
    }
}
