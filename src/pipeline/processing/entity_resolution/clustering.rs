//! Greedy longest-first clustering of near-duplicate company names.
//!
//! Distinct names are visited longest first (stable for equal lengths). Each
//! unassigned name becomes the canonical form for itself and for every not yet
//! assigned name among its best `max_candidates` matches at or above the
//! threshold. Every distinct name ends up in exactly one cluster and every
//! canonical form is one of the input names.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::similarity::{SequenceRatio, SimilarityOracle};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MAX_CANDIDATES: usize = 5;

/// A partition cell of mutually near-duplicate names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCluster {
    /// The representative chosen for the cluster, always one of `members`
    pub canonical: String,
    /// Member names in assignment order; the canonical name comes first
    pub members: Vec<String>,
}

/// Raw name to canonical name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalMap {
    entries: HashMap<String, String>,
    /// Canonical names in the order their clusters were opened
    canonicals: Vec<String>,
    /// Every mapped name in assignment order
    assignment_order: Vec<String>,
}

impl CanonicalMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign(&mut self, name: &str, canonical: &str) {
        if name == canonical {
            self.canonicals.push(canonical.to_string());
        }
        self.entries.insert(name.to_string(), canonical.to_string());
        self.assignment_order.push(name.to_string());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of raw names mapped
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.canonicals.len()
    }

    /// Names folded into a cluster other than their own
    pub fn merged_count(&self) -> usize {
        self.entries.len() - self.canonicals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Materialize the clusters, in the order they were opened
    pub fn clusters(&self) -> Vec<NameCluster> {
        let mut members: HashMap<&str, Vec<String>> = HashMap::new();
        for name in &self.assignment_order {
            if let Some(canonical) = self.entries.get(name) {
                members.entry(canonical.as_str()).or_default().push(name.clone());
            }
        }

        self.canonicals
            .iter()
            .map(|canonical| NameCluster {
                canonical: canonical.clone(),
                members: members.remove(canonical.as_str()).unwrap_or_default(),
            })
            .collect()
    }
}

/// Groups distinct company names into canonical clusters
#[derive(Debug, Clone)]
pub struct CanonicalClusterer<S = SequenceRatio> {
    oracle: S,
    threshold: f64,
    max_candidates: usize,
}

impl Default for CanonicalClusterer<SequenceRatio> {
    fn default() -> Self {
        Self {
            oracle: SequenceRatio,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl CanonicalClusterer<SequenceRatio> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SimilarityOracle> CanonicalClusterer<S> {
    /// Clusterer backed by a custom similarity oracle
    pub fn with_oracle(oracle: S) -> Self {
        Self {
            oracle,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Best matches for `word` among `possibilities` scoring at or above the
    /// threshold, best first. Equal scores rank the larger string first.
    pub fn close_matches<'p>(&self, word: &str, possibilities: &'p [String]) -> Vec<(f64, &'p str)> {
        let mut scored = self.oracle.scores_at_least(word, possibilities, self.threshold);

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));
        scored.truncate(self.max_candidates);
        scored
    }

    /// Cluster the names, which may contain repeats; first appearance fixes the encounter order
    pub fn cluster<I, N>(&self, names: I) -> CanonicalMap
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut distinct: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if seen.insert(name.to_string()) {
                distinct.push(name.to_string());
            }
        }

        // Stable: equal lengths keep encounter order
        let mut ordered = distinct.clone();
        ordered.sort_by_key(|name| Reverse(name.chars().count()));

        let mut map = CanonicalMap::new();
        let mut assigned: HashSet<&str> = HashSet::new();

        for current in &ordered {
            if assigned.contains(current.as_str()) {
                continue;
            }

            // Canonical for itself even if the oracle ranks it outside its own top matches
            if assigned.insert(current.as_str()) {
                map.assign(current, current);
            }

            for (score, candidate) in self.close_matches(current, &distinct) {
                if assigned.insert(candidate) {
                    debug!(
                        "Mapping '{}' -> '{}' (similarity {:.3})",
                        candidate, current, score
                    );
                    map.assign(candidate, current);
                }
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_longest_name_becomes_canonical() {
        let clusterer = CanonicalClusterer::new();
        let map = clusterer.cluster(["Globex Inc", "Globex Inc.", "Initech"]);

        assert_eq!(map.resolve("Globex Inc"), Some("Globex Inc."));
        assert_eq!(map.resolve("Globex Inc."), Some("Globex Inc."));
        assert_eq!(map.resolve("Initech"), Some("Initech"));
        assert_eq!(map.cluster_count(), 2);
        assert_eq!(map.merged_count(), 1);
    }

    #[test]
    fn test_below_threshold_stays_separate() {
        // 0.72 similarity
        let map = CanonicalClusterer::new().cluster(["Acme Corporation", "Acme Corp", "Beta Llc"]);
        assert_eq!(map.resolve("Acme Corp"), Some("Acme Corp"));
        assert_eq!(map.cluster_count(), 3);

        let map = CanonicalClusterer::new()
            .with_threshold(0.7)
            .cluster(["Acme Corporation", "Acme Corp", "Beta Llc"]);
        assert_eq!(map.resolve("Acme Corp"), Some("Acme Corporation"));
        assert_eq!(map.resolve("Beta Llc"), Some("Beta Llc"));
    }

    #[test]
    fn test_equal_length_keeps_encounter_order() {
        // Same length, similarity 0.75 >= 0.7: first encountered wins
        let map = CanonicalClusterer::new().with_threshold(0.7).cluster(["bcde", "abcd"]);
        assert_eq!(map.resolve("abcd"), Some("bcde"));

        let map = CanonicalClusterer::new().with_threshold(0.7).cluster(["abcd", "bcde"]);
        assert_eq!(map.resolve("bcde"), Some("abcd"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let at = CanonicalClusterer::new().with_threshold(0.75).cluster(["abcd", "bcde"]);
        assert_eq!(at.resolve("bcde"), Some("abcd"));

        let above = CanonicalClusterer::new().with_threshold(0.7500001).cluster(["abcd", "bcde"]);
        assert_eq!(above.resolve("bcde"), Some("bcde"));
    }

    #[test]
    fn test_candidate_fan_out_is_capped() {
        let always_similar = |_: &str, _: &str| 1.0;
        let clusterer = CanonicalClusterer::with_oracle(always_similar).with_max_candidates(2);
        let map = clusterer.cluster(["aaaaa", "bbbb", "ccc", "dd", "e"]);

        // Ties rank the larger string first, so "aaaaa" claims "e" and "dd"
        assert_eq!(map.resolve("aaaaa"), Some("aaaaa"));
        assert_eq!(map.resolve("e"), Some("aaaaa"));
        assert_eq!(map.resolve("dd"), Some("aaaaa"));
        // Both of their top matches are taken, so they stand alone
        assert_eq!(map.resolve("bbbb"), Some("bbbb"));
        assert_eq!(map.resolve("ccc"), Some("ccc"));
    }

    #[test]
    fn test_no_chaining_through_assigned_names() {
        let pairs = [("aaaa", "bbb"), ("bbb", "cc")];
        let oracle = move |a: &str, b: &str| {
            if a == b {
                1.0
            } else if pairs.iter().any(|&(x, y)| (x == a && y == b) || (x == b && y == a)) {
                0.9
            } else {
                0.0
            }
        };
        let map = CanonicalClusterer::with_oracle(oracle).cluster(["cc", "bbb", "aaaa"]);

        assert_eq!(map.resolve("bbb"), Some("aaaa"));
        assert_eq!(map.resolve("cc"), Some("cc"));
        assert_eq!(map.cluster_count(), 2);
    }

    #[test]
    fn test_close_matches_ordering() {
        let clusterer = CanonicalClusterer::new();
        let pool = names(&["Globex Inc.", "Globex Inc", "Globex Inc,", "Globex Incs"]);
        let matches: Vec<&str> = clusterer
            .close_matches("Globex Inc.", &pool)
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(matches, vec!["Globex Inc.", "Globex Inc", "Globex Incs", "Globex Inc,"]);
    }

    #[test]
    fn test_clusters_partition_the_names() {
        let input = names(&[
            "Acme Corporation",
            "Acme Corporatio",
            "Globex Inc",
            "Globex Inc.",
            "Umbrella Corp",
            "Umbrella Corp Ltd",
            "Initech",
        ]);
        let map = CanonicalClusterer::new().cluster(&input);
        let clusters = map.clusters();

        let mut members: Vec<String> = clusters.iter().flat_map(|c| c.members.clone()).collect();
        members.sort();
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(members, expected);

        for cluster in &clusters {
            assert_eq!(cluster.members[0], cluster.canonical);
            assert!(input.contains(&cluster.canonical));
        }
    }

    #[test]
    fn test_canonical_names_resolve_to_themselves() {
        let map = CanonicalClusterer::new().cluster(["Umbrella Corp", "Umbrella Corp Ltd", "Initech"]);
        for (_, canonical) in map.iter() {
            assert_eq!(map.resolve(canonical), Some(canonical));
        }
    }

    #[test]
    fn test_repeated_names_are_deduplicated() {
        let map = CanonicalClusterer::new().cluster(["Initech", "Initech", "Hooli"]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.clusters().len(), 2);
    }
}
