#![allow(unused)]

use bzip2::read::BzDecoder;
use rand::distributions::uniform::{SampleUniform, Uniform};
use rand::prelude::*;
use std::io;
use std::io::prelude::*;

pub fn diff(s: &[u8], t: &[u8]) -> io::Result<Vec<u8>> {
    bsdelta::diff_bytes(s, t)
}

pub fn apply(s: &[u8], p: &[u8]) -> io::Result<Vec<u8>> {
    bsdelta::patch_bytes(s, p)
}

/// A patch file pulled apart into its header fields and decompressed
/// streams.
pub struct PatchParts {
    pub ctrl_len: i64,
    pub delta_len: i64,
    pub target_len: i64,
    pub checksum: [u8; 32],
    pub ctrls: Vec<(i64, i64, i64)>,
    pub delta: Vec<u8>,
    pub extra: Vec<u8>,
}

/// Re-parse a patch the way an applier would, keeping every intermediate
/// piece for inspection. Panics on malformed input: tests feed it patches
/// they just produced.
pub fn dissect(p: &[u8]) -> PatchParts {
    assert!(p.len() >= 64, "patch shorter than its header");
    assert_eq!(&p[..8], b"BSDIFF40");

    let ctrl_len = decode_off(&p[8..16]);
    let delta_len = decode_off(&p[16..24]);
    let target_len = decode_off(&p[24..32]);
    assert!(ctrl_len >= 0 && delta_len >= 0 && target_len >= 0);

    let mut checksum = [0u8; 32];
    checksum.copy_from_slice(&p[32..64]);

    let body = &p[64..];
    let (bz_ctrl, rest) = body.split_at(ctrl_len as usize);
    let (bz_delta, bz_extra) = rest.split_at(delta_len as usize);

    let ctrl_bytes = decompress(bz_ctrl);
    assert_eq!(ctrl_bytes.len() % 24, 0, "control stream not triple-aligned");
    let ctrls = ctrl_bytes
        .chunks(24)
        .map(|c| (decode_off(&c[0..8]), decode_off(&c[8..16]), decode_off(&c[16..24])))
        .collect();

    PatchParts {
        ctrl_len,
        delta_len,
        target_len,
        checksum,
        ctrls,
        delta: decompress(bz_delta),
        extra: decompress(bz_extra),
    }
}

/// Sign/magnitude decoding of a header or control field.
pub fn decode_off(b: &[u8]) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(b);
    let x = u64::from_le_bytes(raw);
    let magnitude = (x & 0x7fff_ffff_ffff_ffff) as i64;
    if x >> 63 == 0 {
        magnitude
    } else {
        -magnitude
    }
}

fn decompress(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    BzDecoder::new(frame)
        .read_to_end(&mut out)
        .expect("stream does not decompress");
    out
}

pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    let mut bytes = Vec::with_capacity(n);
    for _ in 0..n {
        bytes.push(rng.gen());
    }
    bytes
}

/// Generate a target resembling `source`: runs borrowed from random source
/// offsets with per-byte mutations, interleaved with fresh junk. `similar`
/// in `[0, 1]` steers how much survives.
pub fn distort(source: &[u8], similar: f64) -> Vec<u8> {
    let mut rng = thread_rng();
    if source.is_empty() {
        return random_bytes(64);
    }

    let tsize = random_between(source.len() * 3 / 4, source.len() * 5 / 4 + 1);
    let mut target = Vec::with_capacity(tsize);
    while target.len() < tsize {
        let remain = tsize - target.len();
        let n = Ord::min(remain, random_between(1, Ord::max(2, source.len() / 4)));
        let off = random_between(0, source.len() - Ord::min(n, source.len()));
        for &x in source[off..Ord::min(off + n, source.len())].iter() {
            if target.len() >= tsize {
                break;
            }
            if random_decide(similar) {
                target.push(x);
            } else {
                target.push(rng.gen());
            }
        }

        if !random_decide(similar) {
            let splice = random_between(0, Ord::min(tsize - target.len(), 32));
            for _ in 0..splice {
                target.push(rng.gen());
            }
        }
    }
    target
}

pub fn random_decide(rate: f64) -> bool {
    random_between(0.0, 1.0) <= rate
}

pub fn random_between<X: SampleUniform>(lo: X, hi: X) -> X {
    let mut rng = thread_rng();
    Uniform::new_inclusive(lo, hi).sample(&mut rng)
}
