//! Term weighting.
//!
//! A weight estimates how selective a term is as a presearch filter: higher weights mean
//! fewer documents are expected to contain the term. The weight of a term is a base weight
//! (1, or a frequency-derived value when a frequency table is configured) multiplied by
//! every configured norm.

use std::collections::BTreeMap;

use crate::term::{QueryTerm, TermKind};

/// Default scale of the token length norm.
pub const DEFAULT_LENGTH_A: f32 = 3.0;

/// Default decay of the token length norm.
pub const DEFAULT_LENGTH_K: f32 = 0.3;

/// A multiplicative adjustment applied to a term's weight.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightNorm {
    /// Scales terms of the given kind by `factor`; other kinds are unaffected.
    TermKind {
        /// Kind to scale.
        kind: TermKind,
        /// Scale factor.
        factor: f32,
    },
    /// Favours longer terms: `4 - a * e^(-k * len)`. `Any` terms get 1.
    TokenLength {
        /// Scale.
        a: f32,
        /// Decay rate.
        k: f32,
    },
    /// Per-field scale factors; fields not listed are unaffected.
    Field(BTreeMap<String, f32>),
    /// Per-term-text scale factors; terms not listed are unaffected.
    Term(BTreeMap<String, f32>),
}

impl WeightNorm {
    /// Returns the factor this norm applies to a term.
    pub fn factor(&self, term: &QueryTerm) -> f32 {
        match self {
            Self::TermKind { kind, factor } => {
                if term.kind == *kind {
                    *factor
                } else {
                    1.0
                }
            }
            Self::TokenLength { a, k } => {
                if term.is_any() {
                    1.0
                } else {
                    let len = term.text.chars().count() as f32;
                    4.0 - a * (-k * len).exp()
                }
            }
            Self::Field(factors) => factors.get(&term.field).copied().unwrap_or(1.0),
            Self::Term(factors) => factors.get(&term.text).copied().unwrap_or(1.0),
        }
    }
}

/// External term-frequency table used as the base weight.
///
/// A term with frequency `freq` in the table weighs `n / freq + k`; terms missing from
/// the table weigh 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermFrequencies {
    /// Term text to frequency.
    pub frequencies: BTreeMap<String, u64>,
    /// Scale applied to the inverse frequency.
    pub n: f32,
    /// Minimum weight.
    pub k: f32,
}

impl TermFrequencies {
    /// Returns the base weight for a term.
    pub fn weight(&self, term: &QueryTerm) -> f32 {
        match self.frequencies.get(&term.text) {
            Some(&freq) if freq > 0 => self.n / freq as f32 + self.k,
            _ => 1.0,
        }
    }
}

/// How a disjunction combines the weights of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombinePolicy {
    /// The least selective child bounds the disjunction.
    #[default]
    Min,
    /// The most selective child.
    Max,
    /// Product of child weights.
    Product,
}

impl CombinePolicy {
    /// Combines child weights. An empty slice weighs 0.
    pub fn combine(self, weights: &[f32]) -> f32 {
        if weights.is_empty() {
            return 0.0;
        }
        match self {
            Self::Min => weights.iter().copied().fold(f32::INFINITY, f32::min),
            Self::Max => weights.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            Self::Product => weights.iter().product(),
        }
    }
}

/// Weighs terms and combines subtree weights.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeWeightor {
    /// Norms applied multiplicatively.
    norms: Vec<WeightNorm>,
    /// Optional frequency table providing the base weight.
    frequencies: Option<TermFrequencies>,
    /// Disjunction combine policy.
    combine: CombinePolicy,
}

impl Default for TreeWeightor {
    /// `Any` terms weigh 0 and exact terms are weighted by length.
    fn default() -> Self {
        Self::new(
            vec![
                WeightNorm::TermKind {
                    kind: TermKind::Any,
                    factor: 0.0,
                },
                WeightNorm::TokenLength {
                    a: DEFAULT_LENGTH_A,
                    k: DEFAULT_LENGTH_K,
                },
            ],
            CombinePolicy::Min,
        )
    }
}

impl TreeWeightor {
    /// Creates a weightor from norms and a combine policy.
    pub fn new(norms: Vec<WeightNorm>, combine: CombinePolicy) -> Self {
        Self {
            norms,
            frequencies: None,
            combine,
        }
    }

    /// Uses a term-frequency table as the base weight.
    pub fn with_frequencies(mut self, frequencies: TermFrequencies) -> Self {
        self.frequencies = Some(frequencies);
        self
    }

    /// Returns the weight of a single term.
    pub fn weigh(&self, term: &QueryTerm) -> f32 {
        let base = self
            .frequencies
            .as_ref()
            .map(|f| f.weight(term))
            .unwrap_or(1.0);
        self.norms.iter().fold(base, |w, norm| w * norm.factor(term))
    }

    /// Combines the weights of a disjunction's children.
    pub fn combine(&self, weights: &[f32]) -> f32 {
        self.combine.combine(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_terms_weigh_more() {
        let weightor = TreeWeightor::default();
        let short = weightor.weigh(&QueryTerm::exact("f", "a"));
        let long = weightor.weigh(&QueryTerm::exact("f", "sesquipedalian"));
        assert!(long > short);
        assert!(long < 4.0);
    }

    #[test]
    fn any_terms_weigh_zero_by_default() {
        let weightor = TreeWeightor::default();
        assert_eq!(weightor.weigh(&QueryTerm::any("RANGE")), 0.0);
    }

    #[test]
    fn token_length_formula() {
        let norm = WeightNorm::TokenLength { a: 3.0, k: 0.3 };
        let factor = norm.factor(&QueryTerm::exact("f", "abcd"));
        let expected = 4.0 - 3.0 * (-1.2f32).exp();
        assert!((factor - expected).abs() < 1e-6);
    }

    #[test]
    fn field_and_term_norms() {
        let weightor = TreeWeightor::new(
            vec![
                WeightNorm::Field(BTreeMap::from([("title".to_string(), 2.0)])),
                WeightNorm::Term(BTreeMap::from([("the".to_string(), 0.5)])),
            ],
            CombinePolicy::Min,
        );
        assert_eq!(weightor.weigh(&QueryTerm::exact("title", "rust")), 2.0);
        assert_eq!(weightor.weigh(&QueryTerm::exact("title", "the")), 1.0);
        assert_eq!(weightor.weigh(&QueryTerm::exact("body", "the")), 0.5);
        assert_eq!(weightor.weigh(&QueryTerm::exact("body", "rust")), 1.0);
    }

    #[test]
    fn frequency_base_weight() {
        let frequencies = TermFrequencies {
            frequencies: BTreeMap::from([("common".to_string(), 100), ("rare".to_string(), 2)]),
            n: 100.0,
            k: 1.0,
        };
        let weightor = TreeWeightor::new(Vec::new(), CombinePolicy::Min).with_frequencies(frequencies);
        assert_eq!(weightor.weigh(&QueryTerm::exact("f", "common")), 2.0);
        assert_eq!(weightor.weigh(&QueryTerm::exact("f", "rare")), 51.0);
        assert_eq!(weightor.weigh(&QueryTerm::exact("f", "unknown")), 1.0);
    }

    #[test]
    fn combine_policies() {
        let weights = [1.0, 2.0, 3.0];
        assert_eq!(CombinePolicy::Min.combine(&weights), 1.0);
        assert_eq!(CombinePolicy::Max.combine(&weights), 3.0);
        assert_eq!(CombinePolicy::Product.combine(&weights), 6.0);
        assert_eq!(CombinePolicy::Min.combine(&[]), 0.0);
    }
}
