//! Suffix-array construction and longest-common-prefix search.
//!
//! The index is built with the Larsson/Sadakane doubling sort (qsufsort):
//! suffixes are first bucketed by their leading byte, then repeatedly
//! regrouped by their first `h` bytes for doubling `h`. During the doubling
//! phase the index array overloads its sign: a negative entry `-g` at
//! position `p` marks `p..p+g` as a finished (sorted) run, while a
//! non-negative entry is a suffix offset inside a group that still needs
//! refinement. The loop is done when the whole array is one finished run.

use std::cmp::Ordering;

#[cfg(test)]
mod tests;

/// Lexicographically sorted index of all suffixes of a byte string,
/// including the empty suffix (which sorts first).
pub struct SuffixArray<'s> {
    s: &'s [u8],
    sa: Vec<i64>,
}

impl<'s> SuffixArray<'s> {
    /// Sorts the suffixes of `s`. The rank scratch array is dropped as soon
    /// as construction finishes.
    pub fn new(s: &'s [u8]) -> SuffixArray<'s> {
        let mut sa = vec![0i64; s.len() + 1];
        let mut rank = vec![0i64; s.len() + 1];
        qsufsort(&mut sa, &mut rank, s);
        SuffixArray { s, sa }
    }

    /// Finds a suffix of the source sharing a long common prefix with
    /// `query`. Returns `(pos, len)`: the suffix start offset and the length
    /// of the common prefix.
    ///
    /// The binary search compares interior probes lexicographically and only
    /// measures the actual common prefix at the two endpoints of the final
    /// interval, so the result is the best of those two candidates rather
    /// than a guaranteed global maximum.
    pub fn search(&self, query: &[u8]) -> (usize, usize) {
        self.search_range(query, 0, self.s.len())
    }

    fn search_range(&self, query: &[u8], st: usize, en: usize) -> (usize, usize) {
        if en - st < 2 {
            let p = self.sa[st] as usize;
            let q = self.sa[en] as usize;
            let x = matchlen(&self.s[p..], query);
            let y = matchlen(&self.s[q..], query);
            if x >= y {
                (p, x)
            } else {
                (q, y)
            }
        } else {
            let mid = st + (en - st) / 2;
            let p = self.sa[mid] as usize;
            let n = Ord::min(self.s.len() - p, query.len());
            if self.s[p..p + n] < query[..n] {
                self.search_range(query, mid, en)
            } else {
                self.search_range(query, st, mid)
            }
        }
    }
}

/// Length of the common prefix of two byte strings.
#[inline]
pub fn matchlen(xs: &[u8], ys: &[u8]) -> usize {
    Iterator::zip(xs.iter(), ys.iter())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Doubling suffix sort. On return `sa[k]` is the offset of the rank-`k`
/// suffix; `rank` is scratch and holds the inverse permutation.
fn qsufsort(sa: &mut [i64], rank: &mut [i64], s: &[u8]) {
    let n = s.len();

    let mut buckets = [0i64; 256];
    for &b in s {
        buckets[b as usize] += 1;
    }
    for c in 1..256 {
        buckets[c] += buckets[c - 1];
    }
    for c in (1..256).rev() {
        buckets[c] = buckets[c - 1];
    }
    buckets[0] = 0;

    for (i, &b) in s.iter().enumerate() {
        buckets[b as usize] += 1;
        sa[buckets[b as usize] as usize] = i as i64;
    }
    sa[0] = n as i64;
    for (i, &b) in s.iter().enumerate() {
        rank[i] = buckets[b as usize];
    }
    rank[n] = 0;
    for c in 1..256 {
        if buckets[c] == buckets[c - 1] + 1 {
            sa[buckets[c] as usize] = -1;
        }
    }
    sa[0] = -1;

    let mut h = 1;
    while sa[0] != -((n as i64) + 1) {
        let mut run = 0usize;
        let mut i = 0usize;
        while i <= n {
            let e = sa[i];
            if e < 0 {
                run += (-e) as usize;
                i += (-e) as usize;
            } else {
                if run > 0 {
                    sa[i - run] = -(run as i64);
                }
                let group = (rank[e as usize] + 1) as usize - i;
                split(sa, rank, i, group, h);
                i += group;
                run = 0;
            }
        }
        if run > 0 {
            sa[i - run] = -(run as i64);
        }
        h += h;
    }

    for i in 0..=n {
        sa[rank[i] as usize] = i as i64;
    }
}

/// Refines one unsorted group `sa[start..start+len)` by the rank of the
/// suffix `h` bytes further in. Recurses into the less-than side of the
/// ternary partition; the greater-than side is looped instead of recursed so
/// the stack stays shallow on skewed partitions.
fn split(sa: &mut [i64], rank: &mut [i64], start: usize, len: usize, h: usize) {
    let mut pending = Some((start, len));
    while let Some((start, len)) = pending {
        pending = split_step(sa, rank, start, len, h);
    }
}

fn split_step(
    sa: &mut [i64],
    rank: &mut [i64],
    start: usize,
    len: usize,
    h: usize,
) -> Option<(usize, usize)> {
    if len < 16 {
        // Selection pass: pull each minimal equivalence class to the front,
        // then record the class end as the rank of every member.
        let mut k = start;
        while k < start + len {
            let mut j = 1usize;
            let mut x = rank[(sa[k] + h as i64) as usize];
            for i in 1..start + len - k {
                let y = rank[(sa[k + i] + h as i64) as usize];
                if y < x {
                    x = y;
                    j = 0;
                }
                if y == x {
                    sa.swap(k + j, k + i);
                    j += 1;
                }
            }
            for i in 0..j {
                rank[sa[k + i] as usize] = (k + j - 1) as i64;
            }
            if j == 1 {
                sa[k] = -1;
            }
            k += j;
        }
        return None;
    }

    let x = rank[(sa[start + len / 2] + h as i64) as usize];
    let mut lt = 0usize;
    let mut eq = 0usize;
    for i in start..start + len {
        let y = rank[(sa[i] + h as i64) as usize];
        if y < x {
            lt += 1;
        }
        if y == x {
            eq += 1;
        }
    }
    let jj = start + lt;
    let kk = jj + eq;

    let mut i = start;
    let mut j = 0usize;
    let mut k = 0usize;
    while i < jj {
        match rank[(sa[i] + h as i64) as usize].cmp(&x) {
            Ordering::Less => i += 1,
            Ordering::Equal => {
                sa.swap(i, jj + j);
                j += 1;
            }
            Ordering::Greater => {
                sa.swap(i, kk + k);
                k += 1;
            }
        }
    }
    while jj + j < kk {
        if rank[(sa[jj + j] + h as i64) as usize] == x {
            j += 1;
        } else {
            sa.swap(jj + j, kk + k);
            k += 1;
        }
    }

    if jj > start {
        split(sa, rank, start, jj - start, h);
    }

    for i in jj..kk {
        rank[sa[i] as usize] = (kk - 1) as i64;
    }
    if jj == kk - 1 {
        sa[jj] = -1;
    }

    if start + len > kk {
        Some((kk, start + len - kk))
    } else {
        None
    }
}
