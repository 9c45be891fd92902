//! Query abstract syntax tree.
//!
//! Represents parsed query expressions. Every leaf carries the field it applies to, so
//! downstream consumers (term extraction, query compilation) never need to resolve a
//! default field themselves.

use std::fmt;

/// How a clause participates in a boolean expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// The clause must match (`+term`).
    Must,
    /// The clause may match; at least one optional clause must match when there are no
    /// required clauses.
    Should,
    /// The clause must not match (`-term` or `NOT term`).
    MustNot,
}

impl Occur {
    /// Returns the query-string prefix for this occurrence.
    fn prefix(self) -> &'static str {
        match self {
            Self::Must => "+",
            Self::Should => "",
            Self::MustNot => "-",
        }
    }
}

/// A single clause of a boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// How the clause participates.
    pub occur: Occur,
    /// The clause expression.
    pub expr: QueryExpr,
}

impl Clause {
    /// Creates a required clause.
    pub fn must(expr: QueryExpr) -> Self {
        Self {
            occur: Occur::Must,
            expr,
        }
    }

    /// Creates an optional clause.
    pub fn should(expr: QueryExpr) -> Self {
        Self {
            occur: Occur::Should,
            expr,
        }
    }

    /// Creates a prohibited clause.
    pub fn must_not(expr: QueryExpr) -> Self {
        Self {
            occur: Occur::MustNot,
            expr,
        }
    }
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// A single term in a field.
    Term {
        /// Field name.
        field: String,
        /// Term text.
        text: String,
    },

    /// An ordered sequence of terms, optionally allowing `slop` intervening positions.
    Phrase {
        /// Field name.
        field: String,
        /// Phrase terms in order.
        terms: Vec<String>,
        /// Maximum positional distance tolerated between terms.
        slop: u32,
    },

    /// Boolean combination of clauses.
    Boolean {
        /// The clauses.
        clauses: Vec<Clause>,
        /// Minimum number of optional clauses that must match (0 = default semantics).
        minimum_should_match: usize,
    },

    /// Boosted query: multiplies the score of the inner expression.
    Boost {
        /// The expression to boost.
        expr: Box<Self>,
        /// The boost factor.
        factor: f32,
    },

    /// Constant-score wrapper: the inner expression matches with a fixed score.
    ConstantScore(Box<Self>),

    /// Prefix query (`term*`).
    Prefix {
        /// Field name.
        field: String,
        /// Literal prefix.
        prefix: String,
    },

    /// Wildcard pattern using `*` (any run) and `?` (any single character).
    Wildcard {
        /// Field name.
        field: String,
        /// The raw pattern.
        pattern: String,
    },

    /// Regular expression (`/pattern/`).
    Regex {
        /// Field name.
        field: String,
        /// The regular expression, without the surrounding slashes.
        pattern: String,
    },

    /// Fuzzy term (`term~2`).
    Fuzzy {
        /// Field name.
        field: String,
        /// Term text.
        text: String,
        /// Maximum edit distance.
        distance: u8,
    },

    /// Term range (`[a TO b]`, `{a TO b}`, `*` for an open end).
    Range {
        /// Field name.
        field: String,
        /// Lower bound (`None` = unbounded).
        lower: Option<String>,
        /// Upper bound (`None` = unbounded).
        upper: Option<String>,
        /// Whether the lower bound is inclusive.
        include_lower: bool,
        /// Whether the upper bound is inclusive.
        include_upper: bool,
    },

    /// Matches every document (`*:*`).
    MatchAll,
}

impl QueryExpr {
    /// Creates a term expression.
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Creates an exact phrase expression.
    pub fn phrase(field: impl Into<String>, terms: Vec<String>) -> Self {
        Self::Phrase {
            field: field.into(),
            terms,
            slop: 0,
        }
    }

    /// Creates a boolean expression with default `minimum_should_match`.
    pub fn boolean(clauses: Vec<Clause>) -> Self {
        Self::Boolean {
            clauses,
            minimum_should_match: 0,
        }
    }

    /// Creates a boosted expression.
    pub fn boost(expr: Self, factor: f32) -> Self {
        Self::Boost {
            expr: Box::new(expr),
            factor,
        }
    }

    /// Returns the distinct field names referenced by this expression, in first-seen order.
    pub fn fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    /// Accumulates referenced field names.
    fn collect_fields(&self, out: &mut Vec<String>) {
        let field = match self {
            Self::Term { field, .. }
            | Self::Phrase { field, .. }
            | Self::Prefix { field, .. }
            | Self::Wildcard { field, .. }
            | Self::Regex { field, .. }
            | Self::Fuzzy { field, .. }
            | Self::Range { field, .. } => field,
            Self::Boolean { clauses, .. } => {
                for clause in clauses {
                    clause.expr.collect_fields(out);
                }
                return;
            }
            Self::Boost { expr, .. } | Self::ConstantScore(expr) => {
                expr.collect_fields(out);
                return;
            }
            Self::MatchAll => return,
        };
        if !out.contains(field) {
            out.push(field.clone());
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term { field, text } => writeln!(f, "{prefix}Term({field}:{text:?})"),
            Self::Phrase { field, terms, slop } => {
                writeln!(f, "{prefix}Phrase({field}:{terms:?}, slop={slop})")
            }
            Self::Boolean {
                clauses,
                minimum_should_match,
            } => {
                if *minimum_should_match > 0 {
                    writeln!(f, "{prefix}Boolean(msm={minimum_should_match})")?;
                } else {
                    writeln!(f, "{prefix}Boolean")?;
                }
                for clause in clauses {
                    writeln!(f, "{prefix}  {:?}", clause.occur)?;
                    clause.expr.fmt_tree(f, indent + 2)?;
                }
                Ok(())
            }
            Self::Boost { expr, factor } => {
                writeln!(f, "{prefix}Boost({factor})")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::ConstantScore(expr) => {
                writeln!(f, "{prefix}ConstantScore")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::Prefix { field, prefix: p } => writeln!(f, "{prefix}Prefix({field}:{p:?})"),
            Self::Wildcard { field, pattern } => {
                writeln!(f, "{prefix}Wildcard({field}:{pattern:?})")
            }
            Self::Regex { field, pattern } => writeln!(f, "{prefix}Regex({field}:/{pattern}/)"),
            Self::Fuzzy {
                field,
                text,
                distance,
            } => writeln!(f, "{prefix}Fuzzy({field}:{text:?}~{distance})"),
            Self::Range { field, .. } => {
                writeln!(f, "{prefix}Range({field}:{})", self.to_query_string())
            }
            Self::MatchAll => writeln!(f, "{prefix}MatchAll"),
        }
    }

    /// Formats the expression as a Lucene-style query string.
    ///
    /// Minimum-should-match is rendered as an `@n` suffix, which the parser does not read.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Term { field, text } => format!("{field}:{}", escape(text)),
            Self::Phrase { field, terms, slop } => {
                let mut out = format!("{field}:\"{}\"", terms.join(" "));
                if *slop > 0 {
                    out.push_str(&format!("~{slop}"));
                }
                out
            }
            Self::Boolean {
                clauses,
                minimum_should_match,
            } => {
                let parts: Vec<String> = clauses
                    .iter()
                    .map(|c| format!("{}{}", c.occur.prefix(), c.expr.to_query_string()))
                    .collect();
                let body = format!("({})", parts.join(" "));
                if *minimum_should_match > 0 {
                    format!("{body}@{minimum_should_match}")
                } else {
                    body
                }
            }
            Self::Boost { expr, factor } => format!("{}^{factor}", expr.to_query_string()),
            Self::ConstantScore(expr) => format!("ConstantScore({})", expr.to_query_string()),
            Self::Prefix { field, prefix } => format!("{field}:{}*", escape(prefix)),
            Self::Wildcard { field, pattern } => format!("{field}:{pattern}"),
            Self::Regex { field, pattern } => format!("{field}:/{pattern}/"),
            Self::Fuzzy {
                field,
                text,
                distance,
            } => format!("{field}:{}~{distance}", escape(text)),
            Self::Range {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                let open = if *include_lower { '[' } else { '{' };
                let close = if *include_upper { ']' } else { '}' };
                format!(
                    "{field}:{open}{} TO {}{close}",
                    lower.as_deref().unwrap_or("*"),
                    upper.as_deref().unwrap_or("*")
                )
            }
            Self::MatchAll => "*:*".to_string(),
        }
    }
}

/// Escapes query-syntax characters in a literal term.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '+' | '-' | '!' | '(' | ')' | ':' | '^' | '[' | ']' | '"' | '{' | '}' | '~' | '*'
                | '?' | '\\' | '/'
        ) || ch.is_whitespace()
        {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_collected_once_in_order() {
        let expr = QueryExpr::boolean(vec![
            Clause::must(QueryExpr::term("body", "a")),
            Clause::should(QueryExpr::term("title", "b")),
            Clause::must_not(QueryExpr::boost(QueryExpr::term("body", "c"), 2.0)),
        ]);

        assert_eq!(expr.fields(), vec!["body".to_string(), "title".to_string()]);
    }

    #[test]
    fn match_all_has_no_fields() {
        assert!(QueryExpr::MatchAll.fields().is_empty());
    }

    #[test]
    fn query_string_for_boolean() {
        let expr = QueryExpr::boolean(vec![
            Clause::must(QueryExpr::term("f", "foo")),
            Clause::should(QueryExpr::term("f", "bar")),
            Clause::must_not(QueryExpr::term("f", "baz")),
        ]);

        assert_eq!(expr.to_query_string(), "(+f:foo f:bar -f:baz)");
    }

    #[test]
    fn query_string_escapes_syntax() {
        let expr = QueryExpr::term("f", "a:b");
        assert_eq!(expr.to_query_string(), "f:a\\:b");
    }

    #[test]
    fn query_string_for_range() {
        let expr = QueryExpr::Range {
            field: "f".into(),
            lower: Some("a".into()),
            upper: None,
            include_lower: true,
            include_upper: false,
        };
        assert_eq!(expr.to_query_string(), "f:[a TO *}");
    }

    #[test]
    fn display_renders_tree() {
        let expr = QueryExpr::boolean(vec![Clause::must(QueryExpr::term("f", "foo"))]);
        let rendered = expr.to_string();
        assert!(rendered.contains("Boolean"));
        assert!(rendered.contains("Must"));
        assert!(rendered.contains("Term(f:\"foo\")"));
    }
}
