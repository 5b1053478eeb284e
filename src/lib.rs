/*!
Delta compressor and patcher for the `BSDIFF40` wire format, extended with a
SHA-256 source checksum in the patch header.

A patch encodes the difference between an old ("source") and a new
("target") byte sequence as three independently bzip2-compressed streams:
control instructions, byte-wise delta data for approximately matching
regions, and verbatim extra data. Applying the patch to the source
reconstructs the target exactly.

Produce a patch with [`Bsdiff`] (or the [`diff_bytes`]/[`diff_reader`]/
[`diff_file`] shorthands) and apply it with [`Bspatch`] (or the matching
[`patch_bytes`]/[`patch_reader`]/[`patch_file`] shorthands).
*/

pub mod bsdiff;
pub mod bspatch;
mod search;
mod utils;

pub use bsdiff::{diff_bytes, diff_file, diff_reader, Bsdiff, Compression};
pub use bspatch::{patch_bytes, patch_file, patch_reader, Bspatch};
