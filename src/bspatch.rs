#![forbid(unsafe_code)]
use super::utils::*;
use bzip2::read::BzDecoder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};
use std::path::Path;

/// Default buffer size.
pub const BUFFER_SIZE: usize = 16384;

/// Default initial size of the delta calculation buffer.
const DELTA_MIN: usize = 1024;

/// Patcher for `BSDIFF40` patches produced by [`Bsdiff`](crate::Bsdiff).
///
/// Apply a patch to source data using a 4k buffer:
/// ```
/// use std::io;
/// use bsdelta::Bspatch;
///
/// fn patch(source: &[u8], patch: &[u8]) -> io::Result<Vec<u8>> {
///     let mut target = Vec::new();
///     Bspatch::new(patch)?
///         .buffer_size(4096)
///         .apply(source, io::Cursor::new(&mut target))?;
///     Ok(target)
/// }
/// ```
///
/// The source is checked against the SHA-256 recorded in the patch header
/// before any output is produced.
pub struct Bspatch<'p> {
    patch: PatchFile<'p>,
    buffer_size: usize,
    delta_min: usize,
}

impl<'p> Bspatch<'p> {
    /// Parse the patch file and create a new patcher configuration.
    ///
    /// Returns an error if the patch header is malformed.
    pub fn new(patch: &'p [u8]) -> Result<Self> {
        Ok(Bspatch {
            patch: parse(patch)?,
            buffer_size: BUFFER_SIZE,
            delta_min: DELTA_MIN,
        })
    }

    /// Set the main copy buffer size (`bs >= 128`, default is `BUFFER_SIZE`).
    pub fn buffer_size(mut self, mut bs: usize) -> Self {
        if bs < 128 {
            bs = 128;
        }
        self.buffer_size = bs;
        self
    }

    /// Hint the final target size, as recorded in the patch header.
    pub fn hint_target_size(&self) -> u64 {
        self.patch.tsize
    }

    /// Apply the patch to the source data and stream out the target.
    ///
    /// The target data size is returned if no error occurs.
    pub fn apply<T: Write>(self, source: &[u8], target: T) -> Result<u64> {
        let digest = Sha256::digest(source);
        if digest[..] != self.patch.checksum[..] {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "source does not match patch checksum",
            ));
        }
        let ctx = Context::new(self.patch, source, target, self.buffer_size, self.delta_min);
        ctx.apply()
    }
}

/// Apply a patch to a byte slice, returning the target.
pub fn patch_bytes(source: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let patcher = Bspatch::new(patch)?;
    let mut target = Vec::with_capacity(patcher.hint_target_size() as usize);
    patcher.apply(source, Cursor::new(&mut target))?;
    Ok(target)
}

/// Apply a patch stream to a source stream. Both inputs are drained fully
/// into memory first; the target size is returned.
pub fn patch_reader<S, P, T>(mut source: S, mut patch: P, target: T) -> Result<u64>
where
    S: Read,
    P: Read,
    T: Write,
{
    let mut s = Vec::new();
    source.read_to_end(&mut s)?;
    let mut p = Vec::new();
    patch.read_to_end(&mut p)?;
    Bspatch::new(&p[..])?.apply(&s[..], target)
}

/// Apply a named patch file to a named source file, writing the target.
pub fn patch_file<S, P, T>(source: S, patch: P, target: T) -> Result<u64>
where
    S: AsRef<Path>,
    P: AsRef<Path>,
    T: AsRef<Path>,
{
    let s = fs::read(source)?;
    let p = fs::read(patch)?;
    Bspatch::new(&p[..])?.apply(&s[..], fs::File::create(target)?)
}

struct PatchFile<'a> {
    tsize: u64,
    checksum: [u8; 32],
    ctrls: BzDecoder<Cursor<&'a [u8]>>,
    delta: BzDecoder<Cursor<&'a [u8]>>,
    extra: BzDecoder<Cursor<&'a [u8]>>,
}

/// Parse the patch header and split out the three compressed streams.
fn parse(patch: &[u8]) -> Result<PatchFile> {
    if patch.len() < HEADER_SIZE || &patch[..8] != MAGIC {
        return Err(Error::new(ErrorKind::InvalidData, "not a valid patch"));
    }

    let csize = decode_int(&patch[8..16]);
    let dsize = decode_int(&patch[16..24]);
    let tsize = decode_int(&patch[24..32]);
    if csize < 0 || dsize < 0 || tsize < 0 {
        return Err(Error::new(ErrorKind::InvalidData, "patch corrupted"));
    }
    if HEADER_SIZE as u64 + csize as u64 + dsize as u64 > patch.len() as u64 {
        return Err(Error::new(ErrorKind::InvalidData, "patch corrupted"));
    }

    let mut checksum = [0; 32];
    checksum.copy_from_slice(&patch[32..64]);

    let (_, remain) = patch.split_at(HEADER_SIZE);
    let (bz_ctrls, remain) = remain.split_at(csize as usize);
    let (bz_delta, bz_extra) = remain.split_at(dsize as usize);

    Ok(PatchFile {
        tsize: tsize as u64,
        checksum,
        ctrls: BzDecoder::new(Cursor::new(bz_ctrls)),
        delta: BzDecoder::new(Cursor::new(bz_delta)),
        extra: BzDecoder::new(Cursor::new(bz_extra)),
    })
}

/// Replay state: a bounded copy buffer over the source cursor and the three
/// patch streams.
struct Context<'s, 'p, T>
where
    T: Write,
{
    source: Cursor<&'s [u8]>,
    target: T,

    patch: PatchFile<'p>,

    n: usize,
    buf: Vec<u8>,
    dlt: Vec<u8>,
    ctl: [u8; 24],

    total: u64,
}

impl<'s, 'p, T> Context<'s, 'p, T>
where
    T: Write,
{
    fn new(patch: PatchFile<'p>, source: &'s [u8], target: T, bsize: usize, dsize: usize) -> Self {
        Context {
            source: Cursor::new(source),
            target,
            patch,
            n: 0,
            buf: vec![0; bsize],
            dlt: vec![0; dsize],
            ctl: [0; 24],
            total: 0,
        }
    }

    /// Apply the patch file.
    fn apply(mut self) -> Result<u64> {
        while let Some(result) = self.next_ctrl() {
            let Control { add, copy, seek } = result?;
            self.add(add)?;
            self.copy(copy)?;
            self.seek(seek)?;
        }
        if self.n > 0 {
            self.target.write_all(&self.buf[..self.n])?;
        }
        self.target.flush()?;
        Ok(self.total)
    }

    /// Read the next control instruction.
    fn next_ctrl(&mut self) -> Option<Result<Control>> {
        match read_exact_or_eof(&mut self.patch.ctrls, &mut self.ctl[..]) {
            Ok(0) => return None,
            Err(e) => return Some(Err(e)),
            _ => (),
        }

        let add = decode_int(&self.ctl[0..]);
        let copy = decode_int(&self.ctl[8..]);
        let seek = decode_int(&self.ctl[16..]);
        if add < 0 || copy < 0 {
            return Some(Err(Error::new(
                ErrorKind::InvalidData,
                "patch corrupted",
            )));
        }
        Some(Ok(Control {
            add: add as u64,
            copy: copy as u64,
            seek,
        }))
    }

    /// Add delta bytes to source bytes and write the result to target.
    fn add(&mut self, mut count: u64) -> Result<()> {
        while count > 0 {
            let k = Ord::min(count, (self.buf.len() - self.n) as u64) as usize;

            self.source.read_exact(&mut self.buf[self.n..self.n + k])?;
            self.reserve_delta(k);
            self.patch.delta.read_exact(&mut self.dlt[..k])?;
            for i in 0..k {
                let j = self.n + i;
                self.buf[j] = self.buf[j].wrapping_add(self.dlt[i]);
            }
            self.n += k;
            if self.n >= self.buf.len() {
                self.target.write_all(self.buf.as_ref())?;
                self.n = 0;
            }
            self.total += k as u64;
            count -= k as u64;
        }
        Ok(())
    }

    /// Copy extra bytes to target.
    fn copy(&mut self, mut count: u64) -> Result<()> {
        while count > 0 {
            let k = Ord::min(count, (self.buf.len() - self.n) as u64) as usize;

            self.patch
                .extra
                .read_exact(&mut self.buf[self.n..self.n + k])?;
            self.n += k;
            if self.n >= self.buf.len() {
                self.target.write_all(self.buf.as_ref())?;
                self.n = 0;
            }
            self.total += k as u64;
            count -= k as u64;
        }
        Ok(())
    }

    /// Move the cursor on source.
    fn seek(&mut self, offset: i64) -> Result<()> {
        self.source.seek(SeekFrom::Current(offset))?;
        Ok(())
    }

    /// Extend the delta cache if not large enough.
    fn reserve_delta(&mut self, size: usize) {
        if size > self.dlt.len() {
            self.dlt.resize(size, 0);
        }
    }
}

// Read exactly buf.len() bytes or a clean EOF; returns the count read.
#[inline]
fn read_exact_or_eof<R>(r: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: Read,
{
    let mut cnt = 0;
    while cnt < buf.len() {
        match r.read(&mut buf[cnt..]) {
            Ok(0) => break,
            Ok(n) => cnt += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    if cnt != 0 && cnt != buf.len() {
        Err(Error::new(
            ErrorKind::UnexpectedEof,
            "failed to fill whole buffer",
        ))
    } else {
        Ok(cnt)
    }
}
