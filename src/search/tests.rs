use rand::distributions::uniform::{SampleUniform, Uniform};
use rand::prelude::*;

use super::{matchlen, SuffixArray};

/// The index must be a permutation of all suffix offsets, listed in
/// lexicographic order with the empty suffix first.
#[test]
fn sorted_invariant() {
    for &n in [0, 1, 2, 3, 15, 16, 17, 64, 257, 1024].iter() {
        for &alphabet in [1usize, 2, 4, 26, 256].iter() {
            let s = random_bytes_over(n, alphabet);
            let index = SuffixArray::new(&s[..]);
            let offsets: Vec<usize> = index.sa.iter().map(|&p| p as usize).collect();

            assert_eq!(offsets.len(), n + 1);
            assert_eq!(offsets[0], n, "empty suffix must sort first");

            let mut seen = vec![false; n + 1];
            for &p in offsets.iter() {
                assert!(p <= n);
                assert!(!seen[p], "offset {} listed twice", p);
                seen[p] = true;
            }

            for k in 1..offsets.len() {
                let a = &s[offsets[k - 1]..];
                let b = &s[offsets[k]..];
                assert!(a <= b, "ranks {} and {} out of order", k - 1, k);
            }
        }
    }
}

/// The reported length must always be the actual common prefix at the
/// reported offset.
#[test]
fn search_is_consistent() {
    for &n in [1usize, 2, 17, 64, 300, 2048].iter() {
        for &alphabet in [2usize, 4, 256].iter() {
            let s = random_bytes_over(n, alphabet);
            let sa = SuffixArray::new(&s[..]);

            for _ in 0..64 {
                let q = random_query(&s[..], alphabet);
                let (pos, len) = sa.search(&q[..]);
                assert!(pos <= s.len());
                assert_eq!(len, matchlen(&s[pos..], &q[..]));
            }
        }
    }
}

#[test]
fn search_empty_source() {
    let sa = SuffixArray::new(b"");
    assert_eq!(sa.search(b"anything"), (0, 0));
    assert_eq!(sa.search(b""), (0, 0));
}

#[test]
fn search_known_offsets() {
    let s = b"the quick brown fox jumps over the lazy dog";
    let sa = SuffixArray::new(&s[..]);

    let (pos, len) = sa.search(b"lazy dog");
    assert_eq!((pos, len), (35, 8));

    let (pos, len) = sa.search(b"quick brownies");
    assert_eq!(pos, 4);
    assert_eq!(len, 11);

    let (_, len) = sa.search(b"zebra");
    assert!(len <= 1);
}

/// The interior of the binary search compares lexicographically without
/// measuring prefixes, so a short suffix that is a prefix of the query can
/// win over a longer match elsewhere. This pins that behavior.
#[test]
fn search_is_approximate() {
    let s = b"abab";
    let sa = SuffixArray::new(&s[..]);
    assert_eq!(sa.search(b"abab"), (2, 2));
}

fn random_bytes_over(n: usize, alphabet: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(n);
    for _ in 0..n {
        bytes.push(random_between(0, alphabet - 1) as u8);
    }
    bytes
}

/// Either an exact slice of the source, a mutated slice, or fresh noise.
fn random_query(s: &[u8], alphabet: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    let n = random_between(0, Ord::min(s.len(), 64));
    let start = random_between(0, s.len() - n);
    let mut q: Vec<u8> = s[start..start + n].to_vec();
    match random_between(0u32, 2) {
        0 => (),
        1 => {
            for x in q.iter_mut() {
                if random_between(0u32, 7) == 0 {
                    *x = random_between(0, alphabet - 1) as u8;
                }
            }
        }
        _ => {
            q.clear();
            for _ in 0..n {
                q.push(rng.gen());
            }
        }
    }
    q
}

fn random_between<X: SampleUniform>(lo: X, hi: X) -> X {
    let mut rng = thread_rng();
    Uniform::new_inclusive(lo, hi).sample(&mut rng)
}
