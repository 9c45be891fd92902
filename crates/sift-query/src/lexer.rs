//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of tokens for the parser.

use std::{iter::Peekable, str::Chars};

use crate::error::LexError;

/// A token in the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word with escapes resolved.
    Term(String),

    /// A bare word containing unescaped `*` or `?`. Escaped wildcard characters keep
    /// their backslash so the pattern can still tell them apart.
    Pattern(String),

    /// A quoted phrase (the quotes are stripped, content preserved).
    Phrase(String),

    /// A regular expression between slashes (slashes stripped).
    Regex(String),

    /// A range expression such as `[a TO b]` or `{a TO *}`.
    Range {
        /// Lower bound, `None` for `*`.
        lower: Option<String>,
        /// Upper bound, `None` for `*`.
        upper: Option<String>,
        /// `[` rather than `{`.
        include_lower: bool,
        /// `]` rather than `}`.
        include_upper: bool,
    },

    /// The AND keyword (`AND` or `&&`).
    And,

    /// The OR keyword (`OR` or `||`).
    Or,

    /// The NOT keyword (`NOT` or `!`).
    Not,

    /// Required prefix (+).
    Plus,

    /// Prohibited prefix (-).
    Minus,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// Field prefix (e.g., "title:" produces FieldPrefix("title")).
    FieldPrefix(String),

    /// Boost operator with factor (e.g., "^2.5" produces Boost(2.5)).
    Boost(f32),

    /// Fuzzy or slop operator (`~` with an optional number).
    Tilde(Option<f32>),
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenizes the entire input, pairing each token with its starting byte offset.
    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.position;
            match self.next_token()? {
                Some(token) => tokens.push((token, start)),
                None => return Ok(tokens),
            }
        }
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        match ch {
            '"' => self.read_phrase(),
            '/' => self.read_regex(),
            '[' | '{' => self.read_range(),
            '(' => {
                self.advance();
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RParen))
            }
            '+' => {
                self.advance();
                Ok(Some(Token::Plus))
            }
            '-' => {
                self.advance();
                Ok(Some(Token::Minus))
            }
            '!' => {
                self.advance();
                Ok(Some(Token::Not))
            }
            '&' | '|' => self.read_symbolic_operator(ch),
            '^' => self.read_boost(),
            '~' => self.read_tilde(),
            _ => self.read_term_or_keyword(),
        }
    }

    /// Reads a quoted phrase.
    fn read_phrase(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume opening quote

        let mut content = String::new();

        loop {
            match self.chars.peek() {
                Some(&'"') => {
                    self.advance(); // consume closing quote
                    return Ok(Some(Token::Phrase(content)));
                }
                Some(&'\\') => {
                    self.advance();
                    if let Some(&escaped) = self.chars.peek() {
                        content.push(escaped);
                        self.advance();
                    }
                }
                Some(&ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => {
                    return Err(LexError::new("unclosed quote", start_pos));
                }
            }
        }
    }

    /// Reads a regular expression delimited by slashes.
    fn read_regex(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume opening slash

        let mut content = String::new();

        loop {
            match self.chars.peek() {
                Some(&'/') => {
                    self.advance();
                    return Ok(Some(Token::Regex(content)));
                }
                Some(&'\\') => {
                    self.advance();
                    match self.chars.peek() {
                        Some(&'/') => content.push('/'),
                        Some(&other) => {
                            content.push('\\');
                            content.push(other);
                        }
                        None => continue,
                    }
                    self.advance();
                }
                Some(&ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => {
                    return Err(LexError::new("unclosed regular expression", start_pos));
                }
            }
        }
    }

    /// Reads a range expression `[lower TO upper]` with either bracket style.
    fn read_range(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        let include_lower = self.chars.peek() == Some(&'[');
        self.advance();

        let mut content = String::new();
        let include_upper = loop {
            match self.chars.peek() {
                Some(&']') => break true,
                Some(&'}') => break false,
                Some(&ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => return Err(LexError::new("unclosed range", start_pos)),
            }
        };
        self.advance(); // consume closing bracket

        let parts: Vec<&str> = content.split_whitespace().collect();
        let [lower, keyword, upper] = parts.as_slice() else {
            return Err(LexError::new("range must have the form [lower TO upper]", start_pos));
        };
        if *keyword != "TO" {
            return Err(LexError::new("expected TO in range", start_pos));
        }

        let bound = |s: &str| (s != "*").then(|| s.to_string());
        Ok(Some(Token::Range {
            lower: bound(*lower),
            upper: bound(*upper),
            include_lower,
            include_upper,
        }))
    }

    /// Reads `&&` or `||`.
    fn read_symbolic_operator(&mut self, ch: char) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance();
        if self.chars.peek() != Some(&ch) {
            return Err(LexError::new(format!("expected '{ch}{ch}'"), start_pos));
        }
        self.advance();
        Ok(Some(if ch == '&' { Token::And } else { Token::Or }))
    }

    /// Reads a term, keyword (AND, OR, NOT), or field prefix.
    fn read_term_or_keyword(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        let mut literal = String::new();
        let mut pattern = String::new();
        let mut has_wildcard = false;

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '^' | '~' | '[' | '{') {
                break;
            }

            if ch == '\\' {
                self.advance();
                let Some(&escaped) = self.chars.peek() else {
                    return Err(LexError::new("dangling escape character", start_pos));
                };
                literal.push(escaped);
                if matches!(escaped, '*' | '?' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(escaped);
                self.advance();
                continue;
            }

            // Check for field prefix (word ending in colon)
            if ch == ':' {
                self.advance(); // consume the colon
                if literal.is_empty() {
                    return Err(LexError::new("expected field name before ':'", start_pos));
                }
                return Ok(Some(Token::FieldPrefix(pattern)));
            }

            if ch == '*' || ch == '?' {
                has_wildcard = true;
            }
            literal.push(ch);
            pattern.push(ch);
            self.advance();
        }

        if literal.is_empty() {
            return Ok(None);
        }

        if has_wildcard {
            return Ok(Some(Token::Pattern(pattern)));
        }

        match literal.as_str() {
            "AND" => Ok(Some(Token::And)),
            "OR" => Ok(Some(Token::Or)),
            "NOT" => Ok(Some(Token::Not)),
            _ => Ok(Some(Token::Term(literal))),
        }
    }

    /// Reads a boost operator (^N or ^N.N).
    fn read_boost(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume '^'

        let number = self.read_number();

        if number.is_empty() {
            return Err(LexError::new("expected number after '^'", start_pos));
        }

        match number.parse::<f32>() {
            Ok(factor) => Ok(Some(Token::Boost(factor))),
            Err(_) => Err(LexError::new(format!("invalid boost value: {}", number), start_pos)),
        }
    }

    /// Reads a fuzzy or slop operator (`~`, `~N`, `~N.N`).
    fn read_tilde(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume '~'

        let number = self.read_number();
        if number.is_empty() {
            return Ok(Some(Token::Tilde(None)));
        }

        match number.parse::<f32>() {
            Ok(value) => Ok(Some(Token::Tilde(Some(value)))),
            Err(_) => Err(LexError::new(format!("invalid value after '~': {number}"), start_pos)),
        }
    }

    /// Reads digits with an optional decimal point.
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || (ch == '.' && !number.contains('.')) {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        number
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Convenience function to tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Ok(tokenize_with_offsets(input)?
        .into_iter()
        .map(|(token, _)| token)
        .collect())
}

/// Tokenizes a query string, keeping the byte offset where each token starts.
pub fn tokenize_with_offsets(input: &str) -> Result<Vec<(Token, usize)>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn multiple_terms() {
        assert_eq!(
            tokenize("rust async").unwrap(),
            vec![Token::Term("rust".into()), Token::Term("async".into())]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            tokenize("\"hello world\"").unwrap(),
            vec![Token::Phrase("hello world".into())]
        );
    }

    #[test]
    fn unclosed_quote_error() {
        let err = tokenize("\"hello world").unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn keywords_are_uppercase_only() {
        assert_eq!(
            tokenize("a AND b OR NOT c").unwrap(),
            vec![
                Token::Term("a".into()),
                Token::And,
                Token::Term("b".into()),
                Token::Or,
                Token::Not,
                Token::Term("c".into())
            ]
        );
        assert_eq!(
            tokenize("this or that").unwrap(),
            vec![
                Token::Term("this".into()),
                Token::Term("or".into()),
                Token::Term("that".into())
            ]
        );
    }

    #[test]
    fn symbolic_operators() {
        assert_eq!(
            tokenize("a && b || !c").unwrap(),
            vec![
                Token::Term("a".into()),
                Token::And,
                Token::Term("b".into()),
                Token::Or,
                Token::Not,
                Token::Term("c".into())
            ]
        );
    }

    #[test]
    fn single_ampersand_is_an_error() {
        let err = tokenize("a & b").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn required_and_prohibited() {
        assert_eq!(
            tokenize("+goodbye -world").unwrap(),
            vec![
                Token::Plus,
                Token::Term("goodbye".into()),
                Token::Minus,
                Token::Term("world".into())
            ]
        );
    }

    #[test]
    fn hyphen_inside_word_is_literal() {
        assert_eq!(
            tokenize("foo-bar").unwrap(),
            vec![Token::Term("foo-bar".into())]
        );
    }

    #[test]
    fn field_prefix() {
        assert_eq!(
            tokenize("title:guide").unwrap(),
            vec![
                Token::FieldPrefix("title".into()),
                Token::Term("guide".into())
            ]
        );
    }

    #[test]
    fn match_all() {
        assert_eq!(
            tokenize("*:*").unwrap(),
            vec![Token::FieldPrefix("*".into()), Token::Pattern("*".into())]
        );
    }

    #[test]
    fn wildcard_patterns() {
        assert_eq!(
            tokenize("te?t foo*").unwrap(),
            vec![Token::Pattern("te?t".into()), Token::Pattern("foo*".into())]
        );
    }

    #[test]
    fn escaped_wildcard_is_literal() {
        assert_eq!(tokenize("foo\\*").unwrap(), vec![Token::Term("foo*".into())]);
        assert_eq!(
            tokenize("fo\\*o*").unwrap(),
            vec![Token::Pattern("fo\\*o*".into())]
        );
    }

    #[test]
    fn escaped_colon_is_not_a_field() {
        assert_eq!(tokenize("a\\:b").unwrap(), vec![Token::Term("a:b".into())]);
    }

    #[test]
    fn regex() {
        assert_eq!(
            tokenize("/ab[cd]+/").unwrap(),
            vec![Token::Regex("ab[cd]+".into())]
        );
        assert!(tokenize("/abc").is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(
            tokenize("[a TO b}").unwrap(),
            vec![Token::Range {
                lower: Some("a".into()),
                upper: Some("b".into()),
                include_lower: true,
                include_upper: false,
            }]
        );
        assert_eq!(
            tokenize("{* TO m]").unwrap(),
            vec![Token::Range {
                lower: None,
                upper: Some("m".into()),
                include_lower: false,
                include_upper: true,
            }]
        );
    }

    #[test]
    fn malformed_range() {
        let err = tokenize("[a b c]").unwrap_err();
        assert!(err.message.contains("TO"));
        assert!(tokenize("[a TO b").is_err());
    }

    #[test]
    fn boost_and_tilde() {
        assert_eq!(
            tokenize("rust^2.5 roam~ \"a b\"~3").unwrap(),
            vec![
                Token::Term("rust".into()),
                Token::Boost(2.5),
                Token::Term("roam".into()),
                Token::Tilde(None),
                Token::Phrase("a b".into()),
                Token::Tilde(Some(3.0))
            ]
        );
    }

    #[test]
    fn boost_missing_number() {
        let err = tokenize("rust^").unwrap_err();
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn parentheses_and_fields() {
        assert_eq!(
            tokenize("field:(+foo +bar)").unwrap(),
            vec![
                Token::FieldPrefix("field".into()),
                Token::LParen,
                Token::Plus,
                Token::Term("foo".into()),
                Token::Plus,
                Token::Term("bar".into()),
                Token::RParen
            ]
        );
    }
}
