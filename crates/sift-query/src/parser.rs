//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent. The language follows
//! the classic Lucene query syntax: adjacent clauses are optional by default, `+` marks a
//! clause as required and `-`/`NOT` as prohibited.
//!
//! # Grammar
//!
//! ```text
//! query       → clause_list
//! clause_list → (conjunction? modifier? clause)*
//! conjunction → "AND" | "OR"
//! modifier    → "+" | "-" | "NOT"
//! clause      → FIELD_PREFIX atom | atom
//! atom        → (TERM fuzzy? | PATTERN | PHRASE slop? | REGEX | RANGE | "(" clause_list ")") boost?
//! ```
//!
//! # Conjunctions
//!
//! `a AND b` marks both neighbours as required; `a OR b` leaves them optional. When the
//! default operator is AND, bare adjacent clauses are required and `OR` relaxes both
//! neighbours back to optional.

use std::mem;

use crate::{
    ast::{Clause, Occur, QueryExpr},
    error::{ParseError, QueryError},
    lexer::{Token, tokenize_with_offsets},
};

/// Default edit distance for `term~` without an explicit value.
const DEFAULT_FUZZY_DISTANCE: u8 = 2;

/// Largest supported fuzzy edit distance.
const MAX_FUZZY_DISTANCE: f32 = 2.0;

/// The operator implied between adjacent clauses with no explicit conjunction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultOperator {
    /// Adjacent clauses are optional (`a b` = `a OR b`).
    #[default]
    Or,
    /// Adjacent clauses are required (`a b` = `a AND b`).
    And,
}

/// Options controlling how a query string is interpreted.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Field applied to clauses without an explicit `field:` prefix.
    pub default_field: String,
    /// Operator implied between adjacent clauses.
    pub default_operator: DefaultOperator,
}

impl ParseOptions {
    /// Creates options for the given default field with the OR default operator.
    pub fn new(default_field: impl Into<String>) -> Self {
        Self {
            default_field: default_field.into(),
            default_operator: DefaultOperator::Or,
        }
    }
}

/// Clause modifier preceding an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    /// No modifier.
    None,
    /// `+`
    Required,
    /// `-` or `NOT`
    Prohibited,
}

/// Explicit conjunction preceding a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    /// No conjunction keyword.
    None,
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Recursive descent parser for query expressions.
struct Parser<'o> {
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
    /// Parse options.
    options: &'o ParseOptions,
}

impl<'o> Parser<'o> {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Token>, options: &'o ParseOptions) -> Self {
        Self {
            tokens,
            position: 0,
            options,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryExpr>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let field = self.options.default_field.clone();
        let expr = self.parse_clause_list(&field)?;

        if self.position < self.tokens.len() {
            return Err(ParseError::new(
                format!("unexpected token: {:?}", self.tokens[self.position]),
                Some(self.position),
            ));
        }

        Ok(Some(expr))
    }

    /// Parses clauses until a closing parenthesis or the end of input.
    fn parse_clause_list(&mut self, field: &str) -> Result<QueryExpr, ParseError> {
        let mut clauses: Vec<Clause> = Vec::new();

        while let Some(token) = self.peek() {
            if matches!(token, Token::RParen) {
                break;
            }

            let conjunction = self.parse_conjunction(clauses.is_empty())?;
            let modifier = self.parse_modifier();
            let expr = self.parse_clause(field)?;
            self.add_clause(&mut clauses, conjunction, modifier, expr);
        }

        match clauses.len() {
            0 => Err(ParseError::new("empty group", Some(self.position))),
            1 if clauses[0].occur != Occur::MustNot => Ok(clauses.remove(0).expr),
            _ => Ok(QueryExpr::boolean(clauses)),
        }
    }

    /// Consumes an optional conjunction keyword.
    fn parse_conjunction(&mut self, first: bool) -> Result<Conjunction, ParseError> {
        let conjunction = match self.peek() {
            Some(Token::And) => Conjunction::And,
            Some(Token::Or) => Conjunction::Or,
            _ => return Ok(Conjunction::None),
        };

        if first {
            return Err(ParseError::new(
                format!("unexpected operator {conjunction:?} (needs expression before it)"),
                Some(self.position),
            ));
        }
        self.advance();

        if matches!(self.peek(), None | Some(Token::RParen)) {
            return Err(ParseError::new(
                format!("operator {conjunction:?} needs an expression after it"),
                Some(self.position),
            ));
        }

        Ok(conjunction)
    }

    /// Consumes an optional clause modifier.
    fn parse_modifier(&mut self) -> Modifier {
        let modifier = match self.peek() {
            Some(Token::Plus) => Modifier::Required,
            Some(Token::Minus) | Some(Token::Not) => Modifier::Prohibited,
            _ => return Modifier::None,
        };
        self.advance();
        modifier
    }

    /// Adds a clause, adjusting the previous clause for explicit conjunctions.
    fn add_clause(
        &self,
        clauses: &mut Vec<Clause>,
        conjunction: Conjunction,
        modifier: Modifier,
        expr: QueryExpr,
    ) {
        let default_and = self.options.default_operator == DefaultOperator::And;

        if let Some(last) = clauses.last_mut()
            && last.occur != Occur::MustNot
        {
            match conjunction {
                Conjunction::And => last.occur = Occur::Must,
                Conjunction::Or if default_and => last.occur = Occur::Should,
                _ => {}
            }
        }

        let prohibited = modifier == Modifier::Prohibited;
        let required = if default_and {
            !prohibited && conjunction != Conjunction::Or
        } else {
            modifier == Modifier::Required || (conjunction == Conjunction::And && !prohibited)
        };

        let occur = match (required, prohibited) {
            (_, true) => Occur::MustNot,
            (true, false) => Occur::Must,
            (false, false) => Occur::Should,
        };

        clauses.push(Clause { occur, expr });
    }

    /// Parses a clause: an atom with an optional field prefix.
    fn parse_clause(&mut self, field: &str) -> Result<QueryExpr, ParseError> {
        if let Some(Token::FieldPrefix(name)) = self.peek().cloned() {
            self.advance();
            if name == "*" {
                return self.parse_match_all();
            }
            return self.parse_atom(&name);
        }

        self.parse_atom(field)
    }

    /// Parses the remainder of `*:*`.
    fn parse_match_all(&mut self) -> Result<QueryExpr, ParseError> {
        match self.peek() {
            Some(Token::Pattern(p)) if p == "*" => {
                self.advance();
                Ok(self.maybe_apply_boost(QueryExpr::MatchAll))
            }
            _ => Err(ParseError::new(
                "'*' may only be used as a field in '*:*'",
                Some(self.position),
            )),
        }
    }

    /// Parses: atom → TERM | PATTERN | PHRASE | REGEX | RANGE | "(" clause_list ")"
    ///
    /// After parsing the atom, checks for an optional boost suffix.
    fn parse_atom(&mut self, field: &str) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek().cloned() {
            Some(Token::Term(text)) => {
                self.advance();
                self.parse_term(field, text)?
            }

            Some(Token::Pattern(pattern)) => {
                self.advance();
                pattern_expr(field, &pattern)
            }

            Some(Token::Phrase(text)) => {
                self.advance();
                self.parse_phrase(field, &text)?
            }

            Some(Token::Regex(pattern)) => {
                self.advance();
                QueryExpr::Regex {
                    field: field.to_string(),
                    pattern,
                }
            }

            Some(Token::Range {
                lower,
                upper,
                include_lower,
                include_upper,
            }) => {
                self.advance();
                QueryExpr::Range {
                    field: field.to_string(),
                    lower,
                    upper,
                    include_lower,
                    include_upper,
                }
            }

            Some(Token::LParen) => self.parse_group(field)?,

            Some(Token::RParen) => {
                return Err(ParseError::new(
                    "unexpected closing parenthesis",
                    Some(self.position),
                ));
            }

            Some(Token::FieldPrefix(name)) => {
                return Err(ParseError::new(
                    format!("expected term, phrase, or group after field prefix, found '{name}:'"),
                    Some(self.position),
                ));
            }

            Some(token @ (Token::And | Token::Or | Token::Not | Token::Plus | Token::Minus)) => {
                return Err(ParseError::new(
                    format!("unexpected operator {token:?}"),
                    Some(self.position),
                ));
            }

            Some(Token::Boost(_)) | Some(Token::Tilde(_)) => {
                return Err(ParseError::new(
                    "unexpected modifier (needs expression before it)",
                    Some(self.position),
                ));
            }

            None => {
                return Err(ParseError::new("unexpected end of query", None));
            }
        };

        Ok(self.maybe_apply_boost(expr))
    }

    /// Builds a term, consuming an optional fuzzy suffix.
    fn parse_term(&mut self, field: &str, text: String) -> Result<QueryExpr, ParseError> {
        let Some(Token::Tilde(value)) = self.peek().cloned() else {
            return Ok(QueryExpr::term(field, text));
        };
        self.advance();

        let distance = match value {
            None => DEFAULT_FUZZY_DISTANCE,
            Some(v) if v.fract() == 0.0 && (0.0..=MAX_FUZZY_DISTANCE).contains(&v) => v as u8,
            Some(v) => {
                return Err(ParseError::new(
                    format!("fuzzy edit distance {v} is out of range"),
                    Some(self.position - 1),
                ));
            }
        };

        if distance == 0 {
            return Ok(QueryExpr::term(field, text));
        }

        Ok(QueryExpr::Fuzzy {
            field: field.to_string(),
            text,
            distance,
        })
    }

    /// Builds a phrase, consuming an optional slop suffix.
    fn parse_phrase(&mut self, field: &str, text: &str) -> Result<QueryExpr, ParseError> {
        let mut terms: Vec<String> = text.split_whitespace().map(String::from).collect();

        let slop = if let Some(Token::Tilde(value)) = self.peek().cloned() {
            self.advance();
            match value {
                Some(v) if v.fract() == 0.0 && v >= 0.0 => v as u32,
                None => 0,
                Some(v) => {
                    return Err(ParseError::new(
                        format!("invalid phrase slop {v}"),
                        Some(self.position - 1),
                    ));
                }
            }
        } else {
            0
        };

        match terms.len() {
            0 => Err(ParseError::new("empty phrase", Some(self.position - 1))),
            1 => Ok(QueryExpr::term(field, terms.remove(0))),
            _ => Ok(QueryExpr::Phrase {
                field: field.to_string(),
                terms,
                slop,
            }),
        }
    }

    /// Checks if the current token is a boost operator and applies it if so.
    fn maybe_apply_boost(&mut self, expr: QueryExpr) -> QueryExpr {
        if let Some(Token::Boost(factor)) = self.peek().cloned() {
            self.advance();
            QueryExpr::boost(expr, factor)
        } else {
            expr
        }
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, field: &str) -> Result<QueryExpr, ParseError> {
        self.advance(); // consume (
        let inner = self.parse_clause_list(field)?;

        if !self.check(&Token::RParen) {
            return Err(ParseError::new(
                "expected closing parenthesis",
                Some(self.position),
            ));
        }
        self.advance(); // consume )

        Ok(inner)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .map(|t| mem::discriminant(t) == mem::discriminant(token))
            .unwrap_or(false)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Classifies a wildcard pattern as a prefix or general wildcard expression.
fn pattern_expr(field: &str, pattern: &str) -> QueryExpr {
    if let Some(stem) = pattern.strip_suffix('*')
        && !stem.is_empty()
        && !has_unescaped_wildcard(stem)
        && !stem.ends_with('\\')
    {
        return QueryExpr::Prefix {
            field: field.to_string(),
            prefix: unescape(stem),
        };
    }

    QueryExpr::Wildcard {
        field: field.to_string(),
        pattern: pattern.to_string(),
    }
}

/// Returns true if the pattern contains `*` or `?` not preceded by a backslash.
fn has_unescaped_wildcard(pattern: &str) -> bool {
    let mut escaped = false;
    for ch in pattern.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// Removes backslash escapes.
fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    for ch in pattern.chars() {
        if ch == '\\' && !escaped {
            escaped = true;
            continue;
        }
        escaped = false;
        out.push(ch);
    }
    out
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for empty queries, `Ok(Some(expr))` for valid queries,
/// or `Err(QueryError)` for invalid syntax.
pub fn parse(input: &str, options: &ParseOptions) -> Result<Option<QueryExpr>, QueryError> {
    let (tokens, offsets): (Vec<Token>, Vec<usize>) = tokenize_with_offsets(input)
        .map_err(|e| QueryError::from(e).with_query(input))?
        .into_iter()
        .unzip();
    Parser::new(tokens, options).parse().map_err(|e| {
        // A missing token index means the query ended early.
        let offset = e
            .token
            .and_then(|i| offsets.get(i).copied())
            .unwrap_or(input.len());
        QueryError::syntax(e.message, Some(offset)).with_query(input)
    })
}
