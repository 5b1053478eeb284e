#![forbid(unsafe_code)]
use super::search::SuffixArray;
use super::utils::*;
use bzip2::write::BzEncoder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Error, ErrorKind, Read, Result, Write};
use std::path::Path;

/// Compression level of the bzip2 compressor.
pub use bzip2::Compression;

/// Default buffer size for delta calculation.
pub const BUFFER_SIZE: usize = 4096;

/// A new match must beat extrapolation of the previous one by this margin
/// before the previous segment is committed.
const MATCH_MARGIN: i64 = 8;

/// Delta compressor producing `BSDIFF40` patches.
///
/// Compares source with target and generates a patch:
/// ```
/// use std::io;
/// use bsdelta::{Bsdiff, Compression};
///
/// fn diff(source: &[u8], target: &[u8]) -> io::Result<Vec<u8>> {
///     let mut patch = Vec::new();
///     Bsdiff::new(source, target)
///         .compression_level(Compression::best())
///         .compare(io::Cursor::new(&mut patch))?;
///     Ok(patch)
/// }
/// ```
///
/// The patch header carries the SHA-256 of the source, which
/// [`Bspatch`](crate::Bspatch) verifies before applying.
pub struct Bsdiff<'s, 't> {
    s: &'s [u8],
    t: &'t [u8],
    level: Compression,
    bsize: usize,
}

impl<'s, 't> Bsdiff<'s, 't> {
    /// Create new configuration for delta compression.
    pub fn new(source: &'s [u8], target: &'t [u8]) -> Self {
        Bsdiff {
            s: source,
            t: target,
            level: Compression::best(),
            bsize: BUFFER_SIZE,
        }
    }

    /// Set the source data.
    pub fn source(mut self, s: &'s [u8]) -> Self {
        self.s = s;
        self
    }

    /// Set the target data.
    pub fn target(mut self, t: &'t [u8]) -> Self {
        self.t = t;
        self
    }

    /// Set the compression level of bzip2 (default is `Compression::best()`).
    pub fn compression_level(mut self, lv: Compression) -> Self {
        self.level = lv;
        self
    }

    /// Set the buffer size for delta calculation (`bs >= 128`, default is `BUFFER_SIZE`).
    pub fn buffer_size(mut self, mut bs: usize) -> Self {
        if bs < 128 {
            bs = 128;
        }
        self.bsize = bs;
        self
    }

    /// Index the source, scan the target for matches and construct the
    /// patch file.
    ///
    /// The size of the patch file is returned if no error occurs.
    pub fn compare<P: Write>(&self, patch: P) -> Result<u64> {
        let sa = SuffixArray::new(self.s);
        let scan = DiffScan::new(self.s, self.t, &sa);
        pack(self.s, self.t, scan, patch, self.level, self.bsize)
    }
}

/// Diff two byte slices, returning the patch.
pub fn diff_bytes(source: &[u8], target: &[u8]) -> Result<Vec<u8>> {
    let mut patch = Vec::new();
    Bsdiff::new(source, target).compare(Cursor::new(&mut patch))?;
    Ok(patch)
}

/// Diff two streams. Both inputs are drained fully into memory before the
/// comparison starts; the patch size is returned.
pub fn diff_reader<S, T, P>(mut source: S, mut target: T, patch: P) -> Result<u64>
where
    S: Read,
    T: Read,
    P: Write,
{
    let mut s = Vec::new();
    source.read_to_end(&mut s)?;
    let mut t = Vec::new();
    target.read_to_end(&mut t)?;
    Bsdiff::new(&s[..], &t[..]).compare(patch)
}

/// Diff two named files, writing the patch to a third.
pub fn diff_file<S, T, P>(source: S, target: T, patch: P) -> Result<u64>
where
    S: AsRef<Path>,
    T: AsRef<Path>,
    P: AsRef<Path>,
{
    let s = fs::read(source)?;
    let t = fs::read(target)?;
    Bsdiff::new(&s[..], &t[..]).compare(fs::File::create(patch)?)
}

/// Construct the patch file from a stream of control instructions.
///
/// Layout: 64-byte header, then the control, delta and extra streams as
/// three independent bzip2 frames. Header fields: magic, compressed control
/// length, compressed delta length, target length, SHA-256 of the source.
fn pack<D, P>(s: &[u8], t: &[u8], ctrls: D, mut patch: P, lv: Compression, bsize: usize) -> Result<u64>
where
    D: Iterator<Item = Control>,
    P: Write,
{
    let mut bz_ctrl = Vec::new();
    let mut bz_delta = Vec::new();
    let mut bz_extra = Vec::new();

    {
        let mut ctrl = BzEncoder::new(Cursor::new(&mut bz_ctrl), lv);
        let mut delta = BzEncoder::new(Cursor::new(&mut bz_delta), lv);
        let mut extra = BzEncoder::new(Cursor::new(&mut bz_extra), lv);

        let mut spos = 0u64;
        let mut tpos = 0u64;
        let mut cbuf = [0; 24];

        let mut dat = Vec::with_capacity(bsize);

        for ctl in ctrls {
            encode_int(ctl.add as i64, &mut cbuf[0..8]);
            encode_int(ctl.copy as i64, &mut cbuf[8..16]);
            encode_int(ctl.seek, &mut cbuf[16..24]);
            ctrl.write_all(&cbuf[..])?;

            // Delta bytes are recomputed from the cursors, chunked by `dat`.
            if ctl.add > 0 {
                let mut n = ctl.add;
                while n > 0 {
                    let k = Ord::min(n, bsize as u64) as usize;

                    dat.extend(
                        Iterator::zip(s[spos as usize..].iter(), t[tpos as usize..].iter())
                            .map(|(x, y)| y.wrapping_sub(*x))
                            .take(k),
                    );

                    delta.write_all(&dat[..])?;
                    dat.clear();

                    spos += k as u64;
                    tpos += k as u64;
                    n -= k as u64;
                }
            }

            if ctl.copy > 0 {
                extra.write_all(&t[tpos as usize..(tpos + ctl.copy) as usize])?;
                tpos += ctl.copy;
            }

            spos = spos.wrapping_add(ctl.seek as u64);
        }

        ctrl.finish()?;
        delta.finish()?;
        extra.finish()?;
    }
    bz_ctrl.shrink_to_fit();
    bz_delta.shrink_to_fit();
    bz_extra.shrink_to_fit();

    let digest = Sha256::digest(s);
    if digest.len() != 32 {
        return Err(Error::new(
            ErrorKind::Other,
            "source digest is not 32 bytes",
        ));
    }

    let csize = bz_ctrl.len() as u64;
    let dsize = bz_delta.len() as u64;
    let esize = bz_extra.len() as u64;

    let mut header = [0; HEADER_SIZE];
    header[0..8].copy_from_slice(MAGIC);
    encode_int(csize as i64, &mut header[8..16]);
    encode_int(dsize as i64, &mut header[16..24]);
    encode_int(t.len() as i64, &mut header[24..32]);
    header[32..64].copy_from_slice(&digest[..]);
    patch.write_all(&header[..])?;

    patch.write_all(&bz_ctrl[..])?;
    patch.write_all(&bz_delta[..])?;
    patch.write_all(&bz_extra[..])?;
    patch.flush()?;

    Ok(HEADER_SIZE as u64 + csize + dsize + esize)
}

/// Greedy match/extend walk over the target.
///
/// Each step searches the suffix index for the longest prefix of the
/// remaining target, weighs it against extrapolating the previous match
/// (`oldscore` counts the bytes that would come for free), and once a new
/// match wins, commits the previous segment: extend it forward, extend the
/// new match backward, relocate the split if the extensions overlap, and
/// yield one control instruction.
struct DiffScan<'s, 't, 'a> {
    s: &'s [u8],
    t: &'t [u8],
    sa: &'a SuffixArray<'s>,

    scan: usize,
    ln: usize,
    pos: usize,
    lastscan: usize,
    lastpos: usize,
    lastoffset: i64,
    finished: bool,
}

impl<'s, 't, 'a> DiffScan<'s, 't, 'a> {
    fn new(s: &'s [u8], t: &'t [u8], sa: &'a SuffixArray<'s>) -> Self {
        DiffScan {
            s,
            t,
            sa,
            scan: 0,
            ln: 0,
            pos: 0,
            lastscan: 0,
            lastpos: 0,
            lastoffset: 0,
            finished: t.is_empty(),
        }
    }
}

/// `s[i]` under a possibly out-of-range signed index.
#[inline]
fn byte_at(s: &[u8], i: i64) -> Option<u8> {
    if 0 <= i && (i as usize) < s.len() {
        Some(s[i as usize])
    } else {
        None
    }
}

impl<'s, 't, 'a> Iterator for DiffScan<'s, 't, 'a> {
    type Item = Control;

    fn next(&mut self) -> Option<Control> {
        if self.finished {
            return None;
        }
        let s = self.s;
        let t = self.t;

        loop {
            let mut oldscore: i64 = 0;
            self.scan += self.ln;
            let mut scsc = self.scan;

            while self.scan < t.len() {
                let (pos, ln) = self.sa.search(&t[self.scan..]);
                self.pos = pos;
                self.ln = ln;

                while scsc < self.scan + ln {
                    if byte_at(s, scsc as i64 + self.lastoffset) == Some(t[scsc]) {
                        oldscore += 1;
                    }
                    scsc += 1;
                }

                if (ln as i64 == oldscore && ln != 0) || ln as i64 > oldscore + MATCH_MARGIN {
                    break;
                }

                if byte_at(s, self.scan as i64 + self.lastoffset) == Some(t[self.scan]) {
                    oldscore -= 1;
                }
                self.scan += 1;
            }

            if self.ln as i64 == oldscore && self.scan != t.len() {
                continue;
            }

            // Extend the previous match forward as long as matches outweigh
            // mismatches two-to-one.
            let mut score: i64 = 0;
            let mut best: i64 = 0;
            let mut lenf = 0usize;
            let mut i = 0usize;
            while self.lastscan + i < self.scan && self.lastpos + i < s.len() {
                if s[self.lastpos + i] == t[self.lastscan + i] {
                    score += 1;
                }
                i += 1;
                if 2 * score - i as i64 > 2 * best - lenf as i64 {
                    best = score;
                    lenf = i;
                }
            }

            // Extend the new match backward under the same rule.
            let mut lenb = 0usize;
            if self.scan < t.len() {
                let mut score: i64 = 0;
                let mut best: i64 = 0;
                let mut i = 1usize;
                while i <= self.scan - self.lastscan && i <= self.pos {
                    if s[self.pos - i] == t[self.scan - i] {
                        score += 1;
                    }
                    if 2 * score - i as i64 > 2 * best - lenb as i64 {
                        best = score;
                        lenb = i;
                    }
                    i += 1;
                }
            }

            // Both extensions claim the same target bytes; move the split to
            // where the previous match scores better than the new one.
            if self.lastscan + lenf > self.scan - lenb {
                let overlap = (self.lastscan + lenf) - (self.scan - lenb);
                let mut score: i64 = 0;
                let mut best: i64 = 0;
                let mut lens = 0usize;
                for i in 0..overlap {
                    if t[self.lastscan + lenf - overlap + i] == s[self.lastpos + lenf - overlap + i] {
                        score += 1;
                    }
                    if t[self.scan - lenb + i] == s[self.pos - lenb + i] {
                        score -= 1;
                    }
                    if score > best {
                        best = score;
                        lens = i + 1;
                    }
                }
                lenf = (lenf + lens) - overlap;
                lenb -= lens;
            }

            let add = lenf as u64;
            let copy = ((self.scan - lenb) - (self.lastscan + lenf)) as u64;
            let seek = (self.pos - lenb) as i64 - (self.lastpos + lenf) as i64;

            self.lastscan = self.scan - lenb;
            self.lastpos = self.pos - lenb;
            self.lastoffset = self.pos as i64 - self.scan as i64;
            if self.scan == t.len() {
                self.finished = true;
            }

            return Some(Control { add, copy, seek });
        }
    }
}
