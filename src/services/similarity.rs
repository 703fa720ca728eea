//! String similarity signals used to match questions to QA entries.

use std::collections::{HashMap, HashSet};

/// Ratcliff/Obershelp similarity in `[0, 1]`, computed like Python's
/// `difflib.SequenceMatcher(None, a, b).ratio()`, auto-junk rule included.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = SequenceMatcher::new(&a, &b).matched_len();
    2.0 * matched as f64 / total as f64
}

/// Shared-token ratio: `|A ∩ B| / max(1, min(|A|, |B|))` over whitespace
/// tokens. Zero when either side has no tokens.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let sa: HashSet<&str> = a.split_whitespace().collect();
    let sb: HashSet<&str> = b.split_whitespace().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count();
    inter as f64 / sa.len().min(sb.len()).max(1) as f64
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each non-popular char in `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        // Chars making up more than 1% of a long `b` are treated as popular
        if b.len() >= 200 {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` / `b[blo..bhi]` as
    /// `(i, j, size)`; earliest in `a`, then in `b`, on ties.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);

        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.b2j.get(ch) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular chars never seed a match but may extend one
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && a[besti + bestsize] == b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// Total size of all matching blocks.
    fn matched_len(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_matches_difflib_reference_values() {
        // Values from difflib.SequenceMatcher(None, a, b).ratio()
        assert!(close(sequence_ratio("abcd", "bcde"), 0.75));
        assert!(close(sequence_ratio("hello world", "hello world"), 1.0));
        assert!(close(sequence_ratio("abc", "xyz"), 0.0));
        assert!(close(sequence_ratio("", ""), 1.0));
        assert!(close(sequence_ratio("", "abc"), 0.0));
        // "what are your hours" vs "what are the hours": 15 matched chars
        assert!(close(
            sequence_ratio("what are your hours", "what are the hours"),
            30.0 / 37.0
        ));
    }

    #[test]
    fn ratio_is_bounded_for_long_inputs() {
        let long_b = "a".repeat(150) + &"b".repeat(100);
        let r = sequence_ratio(&"a".repeat(10), &long_b);
        assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn token_overlap_uses_smaller_set() {
        assert!(close(token_overlap("opening hours", "what are your opening hours"), 1.0));
        assert!(close(token_overlap("a b c d", "a x"), 0.5));
        assert!(close(token_overlap("", "a"), 0.0));
        assert!(close(token_overlap("a a a", "a"), 1.0));
    }
}
