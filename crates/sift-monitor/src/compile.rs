//! Query compiler.
//!
//! Compiles analyzed query expressions into Tantivy queries over a [`DocumentIndex`].
//! Multi-term expressions (prefix, wildcard, regex, range) are rewritten against the
//! document's own vocabulary, which is exact for a one-document index.

use std::{
    collections::HashMap,
    error::Error,
    fmt,
    sync::Arc,
};

use levenshtein_automata::{DFA, Distance, LevenshteinAutomatonBuilder};
use regex::Regex;
use sift_presearch::FieldTerms;
use sift_query::{Clause, Occur, QueryExpr};
use tantivy::{
    Term,
    collector::Count,
    query::{
        AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, FuzzyTermQuery,
        Occur as TantivyOccur, PhraseQuery, Query, TermQuery,
    },
    schema::IndexRecordOption,
};

use crate::document::DocumentIndex;

/// Error during query compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Error message.
    pub message: String,
}

impl CompileError {
    /// Creates a compile error.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CompileError {}

/// Compiles query expressions against a single indexed document.
pub struct QueryCompiler {
    /// The document queries are compiled for.
    document: Arc<DocumentIndex>,
    /// Levenshtein automaton builders by edit distance.
    lev_builders: HashMap<u8, LevenshteinAutomatonBuilder>,
}

impl QueryCompiler {
    /// Creates a compiler for a document.
    pub fn new(document: Arc<DocumentIndex>) -> Self {
        Self {
            document,
            lev_builders: HashMap::new(),
        }
    }

    /// Returns the document queries are compiled for.
    pub fn document(&self) -> &DocumentIndex {
        &self.document
    }

    /// Compiles an expression into a Tantivy query.
    ///
    /// References to fields the document lacks compile to a query matching nothing.
    pub fn compile(&mut self, expr: &QueryExpr) -> Result<Box<dyn Query>, CompileError> {
        match expr {
            QueryExpr::Term { field, text } => Ok(self.compile_term(field, text)),
            QueryExpr::Phrase { field, terms, slop } => Ok(self.compile_phrase(field, terms, *slop)),
            QueryExpr::Boolean {
                clauses,
                minimum_should_match,
            } => self.compile_boolean(clauses, *minimum_should_match),
            QueryExpr::Boost { expr, factor } => {
                Ok(Box::new(BoostQuery::new(self.compile(expr)?, *factor)))
            }
            QueryExpr::ConstantScore(expr) => {
                Ok(Box::new(ConstScoreQuery::new(self.compile(expr)?, 1.0)))
            }
            QueryExpr::Fuzzy {
                field,
                text,
                distance,
            } => Ok(self.compile_fuzzy(field, text, *distance)),
            QueryExpr::MatchAll => Ok(Box::new(AllQuery)),
            QueryExpr::Prefix { field, .. }
            | QueryExpr::Wildcard { field, .. }
            | QueryExpr::Regex { field, .. }
            | QueryExpr::Range { field, .. } => {
                let terms = self.expand(expr)?;
                Ok(self.compile_expansion(field, terms))
            }
        }
    }

    /// Returns the document terms a multi-term expression matches, by field.
    ///
    /// Exact terms and phrases contribute their own text. Prohibited clauses contribute
    /// nothing.
    pub fn positive_terms(&mut self, expr: &QueryExpr) -> Result<FieldTerms, CompileError> {
        let mut out = FieldTerms::new();
        self.collect_positive_terms(expr, &mut out)?;
        Ok(out)
    }

    /// Recursive helper for [`Self::positive_terms`].
    fn collect_positive_terms(
        &mut self,
        expr: &QueryExpr,
        out: &mut FieldTerms,
    ) -> Result<(), CompileError> {
        match expr {
            QueryExpr::Term { field, text } => {
                if !text.is_empty() {
                    out.add(field.as_str(), text.as_str());
                }
            }
            QueryExpr::Phrase { field, terms, .. } => {
                out.extend(field, terms.iter().filter(|t| !t.is_empty()).cloned());
            }
            QueryExpr::Boolean { clauses, .. } => {
                for clause in clauses.iter().filter(|c| c.occur != Occur::MustNot) {
                    self.collect_positive_terms(&clause.expr, out)?;
                }
            }
            QueryExpr::Boost { expr, .. } | QueryExpr::ConstantScore(expr) => {
                self.collect_positive_terms(expr, out)?;
            }
            QueryExpr::MatchAll => {}
            QueryExpr::Prefix { field, .. }
            | QueryExpr::Wildcard { field, .. }
            | QueryExpr::Regex { field, .. }
            | QueryExpr::Range { field, .. }
            | QueryExpr::Fuzzy { field, .. } => {
                let terms = self.expand(expr)?;
                out.extend(field, terms);
            }
        }
        Ok(())
    }

    /// Returns the document terms matched by a multi-term expression.
    ///
    /// Returns an empty list for other expression shapes.
    pub fn expand(&mut self, expr: &QueryExpr) -> Result<Vec<String>, CompileError> {
        let (field, matcher) = match expr {
            QueryExpr::Prefix { field, prefix } => {
                (field, TermMatcher::Prefix(prefix.clone()))
            }
            QueryExpr::Wildcard { field, pattern } => {
                (field, TermMatcher::Pattern(wildcard_regex(pattern)?))
            }
            QueryExpr::Regex { field, pattern } => (field, TermMatcher::Pattern(anchored(pattern)?)),
            QueryExpr::Fuzzy {
                field,
                text,
                distance,
            } => {
                let builder = self
                    .lev_builders
                    .entry(*distance)
                    .or_insert_with(|| LevenshteinAutomatonBuilder::new(*distance, true));
                (field, TermMatcher::Fuzzy(builder.build_dfa(text)))
            }
            QueryExpr::Range {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
            } => (
                field,
                TermMatcher::Range {
                    lower: lower.clone(),
                    upper: upper.clone(),
                    include_lower: *include_lower,
                    include_upper: *include_upper,
                },
            ),
            _ => return Ok(Vec::new()),
        };

        let terms = self
            .document
            .field_terms(field)
            .map(|terms| {
                terms
                    .iter()
                    .filter(|term| matcher.accepts(term))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(terms)
    }

    /// Compiles an exact term.
    fn compile_term(&self, field: &str, text: &str) -> Box<dyn Query> {
        match self.document.field(field) {
            Some(f) if !text.is_empty() => Box::new(TermQuery::new(
                Term::from_field_text(f, text),
                IndexRecordOption::WithFreqs,
            )),
            _ => Box::new(EmptyQuery),
        }
    }

    /// Compiles a phrase. Phrases of one term compile to a term query.
    fn compile_phrase(&self, field: &str, terms: &[String], slop: u32) -> Box<dyn Query> {
        let Some(f) = self.document.field(field) else {
            return Box::new(EmptyQuery);
        };
        let terms: Vec<Term> = terms
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| Term::from_field_text(f, t))
            .collect();

        match terms.len() {
            0 => Box::new(EmptyQuery),
            1 => Box::new(TermQuery::new(
                terms[0].clone(),
                IndexRecordOption::WithFreqs,
            )),
            _ => {
                let mut query = PhraseQuery::new(terms);
                query.set_slop(slop);
                Box::new(query)
            }
        }
    }

    /// Compiles a fuzzy term.
    fn compile_fuzzy(&self, field: &str, text: &str, distance: u8) -> Box<dyn Query> {
        match self.document.field(field) {
            Some(f) if !text.is_empty() => Box::new(FuzzyTermQuery::new(
                Term::from_field_text(f, text),
                distance,
                true,
            )),
            _ => Box::new(EmptyQuery),
        }
    }

    /// Compiles the expansion of a multi-term expression into a constant-score disjunction.
    fn compile_expansion(&self, field: &str, terms: Vec<String>) -> Box<dyn Query> {
        let Some(f) = self.document.field(field) else {
            return Box::new(EmptyQuery);
        };
        if terms.is_empty() {
            return Box::new(EmptyQuery);
        }

        let clauses: Vec<(TantivyOccur, Box<dyn Query>)> = terms
            .into_iter()
            .map(|t| {
                let query: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(f, &t),
                    IndexRecordOption::Basic,
                ));
                (TantivyOccur::Should, query)
            })
            .collect();
        Box::new(ConstScoreQuery::new(Box::new(BooleanQuery::new(clauses)), 1.0))
    }

    /// Compiles a boolean expression.
    ///
    /// A minimum number of optional matches is checked directly against the document;
    /// when it is not met the whole expression matches nothing. If all clauses are
    /// prohibited, an `AllQuery` is used as the base to exclude from.
    fn compile_boolean(
        &mut self,
        clauses: &[Clause],
        minimum_should_match: usize,
    ) -> Result<Box<dyn Query>, CompileError> {
        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let mut compiled: Vec<(TantivyOccur, Box<dyn Query>)> = Vec::new();
        let mut should_clauses: Vec<Box<dyn Query>> = Vec::new();
        let mut has_required = false;

        for clause in clauses {
            let query = self.compile(&clause.expr)?;
            match clause.occur {
                Occur::Must => {
                    has_required = true;
                    compiled.push((TantivyOccur::Must, query));
                }
                Occur::Should => should_clauses.push(query),
                Occur::MustNot => compiled.push((TantivyOccur::MustNot, query)),
            }
        }

        if minimum_should_match > 0 {
            let mut matched = 0;
            for query in &should_clauses {
                if self.matches(query.as_ref())? {
                    matched += 1;
                }
            }
            if matched < minimum_should_match {
                return Ok(Box::new(EmptyQuery));
            }
        }

        let has_optional = !should_clauses.is_empty();
        compiled.extend(
            should_clauses
                .into_iter()
                .map(|q| (TantivyOccur::Should, q)),
        );

        if !has_required && !has_optional {
            compiled.push((TantivyOccur::Must, Box::new(AllQuery)));
        }

        Ok(Box::new(BooleanQuery::new(compiled)))
    }

    /// Returns true if the query matches the document.
    fn matches(&self, query: &dyn Query) -> Result<bool, CompileError> {
        let count = self
            .document
            .searcher()
            .search(query, &Count)
            .map_err(|e| CompileError::new(e.to_string()))?;
        Ok(count > 0)
    }
}

/// Term predicate of a multi-term expression.
enum TermMatcher {
    /// Terms starting with a prefix.
    Prefix(String),
    /// Terms fully matching a pattern.
    Pattern(Regex),
    /// Terms within an edit distance.
    Fuzzy(DFA),
    /// Terms within lexicographic bounds.
    Range {
        /// Lower bound, unbounded if `None`.
        lower: Option<String>,
        /// Upper bound, unbounded if `None`.
        upper: Option<String>,
        /// Lower bound is inclusive.
        include_lower: bool,
        /// Upper bound is inclusive.
        include_upper: bool,
    },
}

impl TermMatcher {
    /// Returns true if the term satisfies the predicate.
    fn accepts(&self, term: &str) -> bool {
        match self {
            Self::Prefix(prefix) => term.starts_with(prefix.as_str()),
            Self::Pattern(regex) => regex.is_match(term),
            Self::Fuzzy(dfa) => matches!(dfa.eval(term), Distance::Exact(_)),
            Self::Range {
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                let above = lower.as_deref().is_none_or(|l| {
                    if *include_lower {
                        term >= l
                    } else {
                        term > l
                    }
                });
                let below = upper.as_deref().is_none_or(|u| {
                    if *include_upper {
                        term <= u
                    } else {
                        term < u
                    }
                });
                above && below
            }
        }
    }
}

/// Translates a wildcard pattern (`*` any run, `?` one character, `\` escape) to a regex.
fn wildcard_regex(pattern: &str) -> Result<Regex, CompileError> {
    let mut translated = String::from("^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    translated.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            _ => translated.push_str(&regex::escape(&ch.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated).map_err(|e| CompileError::new(format!("invalid wildcard: {e}")))
}

/// Compiles a regular expression that must match a whole term.
fn anchored(pattern: &str) -> Result<Regex, CompileError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| CompileError::new(format!("invalid regular expression /{pattern}/: {e}")))
}
