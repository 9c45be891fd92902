//! Wildcard n-gram filtering.
//!
//! Wildcard, prefix and regular-expression queries cannot be filtered on an exact term.
//! Instead their longest literal run is indexed with an n-gram suffix, and document
//! tokens are expanded into every substring carrying the same suffix, so a document
//! token containing the literal run produces the indexed n-gram.

use std::collections::BTreeSet;

use crate::term::{QueryTerm, TermKind};

/// Default suffix marking n-gram tokens.
pub const DEFAULT_NGRAM_SUFFIX: &str = "XX";

/// Default token emitted for document tokens too long to expand.
pub const DEFAULT_WILDCARD_TOKEN: &str = "__WILDCARD__";

/// Default maximum length of a document token before it is replaced by the wildcard token.
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 30;

/// Settings for n-gram based wildcard filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardNGrams {
    /// Suffix appended to every n-gram.
    pub suffix: String,
    /// Token standing in for document tokens longer than `max_token_size`. Indexed
    /// alongside every wildcard term so such documents select all wildcard queries.
    pub wildcard_token: String,
    /// Longest document token (in characters) that is expanded into n-grams.
    pub max_token_size: usize,
}

impl Default for WildcardNGrams {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_NGRAM_SUFFIX.to_string(),
            wildcard_token: DEFAULT_WILDCARD_TOKEN.to_string(),
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
        }
    }
}

impl WildcardNGrams {
    /// Builds the custom term for a literal run extracted from a pattern.
    pub fn query_term(&self, field: &str, literal: &str) -> QueryTerm {
        QueryTerm::custom(
            field,
            format!("{literal}{}", self.suffix),
            self.wildcard_token.clone(),
        )
    }

    /// Returns the extra token to index for a term, if any.
    pub fn extra_token<'a>(&self, term: &'a QueryTerm) -> Option<&'a str> {
        match term.payload.as_deref() {
            Some(payload) if term.kind == TermKind::Custom && payload == self.wildcard_token => {
                Some(payload)
            }
            _ => None,
        }
    }

    /// Adds a document token and its suffixed n-grams to `out`.
    ///
    /// Every substring (including the empty one) is emitted with the suffix. Tokens longer
    /// than `max_token_size` emit the wildcard token instead of n-grams.
    pub fn expand_token(&self, token: &str, out: &mut BTreeSet<String>) {
        out.insert(token.to_string());

        let chars: Vec<char> = token.chars().collect();
        if chars.len() > self.max_token_size {
            out.insert(self.wildcard_token.clone());
            return;
        }

        for start in 0..=chars.len() {
            for end in start..=chars.len() {
                let mut gram: String = chars[start..end].iter().collect();
                gram.push_str(&self.suffix);
                out.insert(gram);
            }
        }
    }
}

/// Returns the longest literal run of a wildcard pattern (`*` and `?` separate runs).
pub fn wildcard_literal(pattern: &str) -> String {
    let mut runs = vec![String::new()];
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next()
                    && let Some(run) = runs.last_mut()
                {
                    run.push(escaped);
                }
            }
            '*' | '?' => runs.push(String::new()),
            _ => {
                if let Some(run) = runs.last_mut() {
                    run.push(ch);
                }
            }
        }
    }
    longest(runs)
}

/// Returns the longest literal run every match of a regular expression must contain.
///
/// Returns `None` when the expression uses alternation or complement operators, where no
/// single run is required. Characters made optional or repeatable by a quantifier are
/// excluded from runs.
pub fn regex_literal(pattern: &str) -> Option<String> {
    let mut runs = vec![String::new()];
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '|' | '~' | '&' | '<' | '>' | '#' | '@' | '"' => return None,
            '\\' => match chars.next() {
                Some(escaped) if !escaped.is_ascii_alphanumeric() => {
                    if let Some(run) = runs.last_mut() {
                        run.push(escaped);
                    }
                }
                _ => runs.push(String::new()),
            },
            '*' | '?' => {
                if let Some(run) = runs.last_mut() {
                    run.pop();
                }
                runs.push(String::new());
            }
            '{' => {
                if let Some(run) = runs.last_mut() {
                    run.pop();
                }
                for skipped in chars.by_ref() {
                    if skipped == '}' {
                        break;
                    }
                }
                runs.push(String::new());
            }
            '[' => {
                for skipped in chars.by_ref() {
                    if skipped == ']' {
                        break;
                    }
                }
                runs.push(String::new());
            }
            '.' | '+' | '(' | ')' | '^' | '$' | ']' | '}' => runs.push(String::new()),
            _ => {
                if let Some(run) = runs.last_mut() {
                    run.push(ch);
                }
            }
        }
    }

    Some(longest(runs))
}

/// Picks the longest run; ties go to the earliest.
fn longest(runs: Vec<String>) -> String {
    let mut best = String::new();
    for run in runs {
        if run.chars().count() > best.chars().count() {
            best = run;
        }
    }
    best
}
