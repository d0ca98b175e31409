//! Normalized string similarity used to decide whether two company names
//! describe the same entity.
//!
//! The score is the matching-blocks ratio `2·M / (|a| + |b|)`, where `M` is the
//! total length of the longest common contiguous blocks found recursively on
//! either side of each match. It is not an edit distance and not a token-set
//! overlap.

use std::collections::HashMap;

/// Second sequences at least this long get their popular elements pruned
const AUTOJUNK_MIN_LEN: usize = 200;

/// Source of similarity scores in `[0, 1]`
pub trait SimilarityOracle {
    /// Score `candidate` against `query`. Deterministic for a given ordered pair.
    fn similarity(&self, candidate: &str, query: &str) -> f64;

    /// Every candidate scoring at least `cutoff` against `query`, in candidate order
    fn scores_at_least<'c>(&self, query: &str, candidates: &'c [String], cutoff: f64) -> Vec<(f64, &'c str)> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let score = self.similarity(candidate, query);
                (score >= cutoff).then_some((score, candidate.as_str()))
            })
            .collect()
    }
}

/// Default oracle: the matching-blocks sequence ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRatio;

impl SimilarityOracle for SequenceRatio {
    fn similarity(&self, candidate: &str, query: &str) -> f64 {
        sequence_ratio(candidate, query)
    }

    fn scores_at_least<'c>(&self, query: &str, candidates: &'c [String], cutoff: f64) -> Vec<(f64, &'c str)> {
        let matcher = QueryMatcher::new(query);
        candidates
            .iter()
            .filter_map(|candidate| {
                matcher
                    .ratio_at_least(candidate, cutoff)
                    .map(|score| (score, candidate.as_str()))
            })
            .collect()
    }
}

impl<F> SimilarityOracle for F
where
    F: Fn(&str, &str) -> f64,
{
    fn similarity(&self, candidate: &str, query: &str) -> f64 {
        self(candidate, query)
    }
}

/// Ratio of matching characters between `a` and `b`, compared per Unicode scalar value
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    QueryMatcher::new(b).ratio(a)
}

fn ratio_of(matches: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

/// Sequence matcher with the query side indexed once and reused for many candidates
pub struct QueryMatcher {
    b: Vec<char>,
    /// Positions of each element of `b`, popular elements removed
    b2j: HashMap<char, Vec<usize>>,
    /// Occurrences of every element of `b`, popular ones included
    full_counts: HashMap<char, usize>,
}

impl QueryMatcher {
    pub fn new(query: &str) -> Self {
        let b: Vec<char> = query.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        let mut full_counts: HashMap<char, usize> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
            *full_counts.entry(*c).or_default() += 1;
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let max_occurrences = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= max_occurrences);
        }

        Self { b, b2j, full_counts }
    }

    /// Similarity of `candidate` against the indexed query
    pub fn ratio(&self, candidate: &str) -> f64 {
        let a: Vec<char> = candidate.chars().collect();
        ratio_of(self.matching_characters(&a), a.len() + self.b.len())
    }

    /// Similarity of `candidate` if it reaches `cutoff`. Length and character-count
    /// upper bounds reject most candidates before any block matching.
    pub fn ratio_at_least(&self, candidate: &str, cutoff: f64) -> Option<f64> {
        let a: Vec<char> = candidate.chars().collect();
        let total = a.len() + self.b.len();

        if ratio_of(a.len().min(self.b.len()), total) < cutoff {
            return None;
        }
        if ratio_of(self.shared_characters(&a), total) < cutoff {
            return None;
        }
        let score = ratio_of(self.matching_characters(&a), total);
        (score >= cutoff).then_some(score)
    }

    /// Size of the multiset intersection of `a` and the query
    fn shared_characters(&self, a: &[char]) -> usize {
        let mut used: HashMap<char, usize> = HashMap::new();
        let mut shared = 0;
        for c in a {
            let available = self.full_counts.get(c).copied().unwrap_or(0);
            let taken = used.entry(*c).or_default();
            if *taken < available {
                *taken += 1;
                shared += 1;
            }
        }
        shared
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`.
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    fn find_longest_match(&self, a: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let b = &self.b;
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let run = match j.checked_sub(1) {
                        Some(prev) => j2len.get(&prev).copied().unwrap_or(0) + 1,
                        None => 1,
                    };
                    next_j2len.insert(j, run);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular elements are absent from b2j but still count when they
        // directly extend a match.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi && best_j + best_size < bhi && a[best_i + best_size] == b[best_j + best_size] {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    /// Total size of all matching blocks between `a` and the query
    fn matching_characters(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, size) = self.find_longest_match(a, alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            total += size;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                queue.push((i + size, ahi, j + size, bhi));
            }
        }

        total
    }
}
