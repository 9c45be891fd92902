//! Text analysis for queries and documents.
//!
//! Document fields and query terms pass through the same pipeline so that presearch
//! terms, full evaluation and highlighting all see identical tokens:
//! 1. `SimpleTokenizer` - splits on whitespace and punctuation
//! 2. `LowerCaser` - converts tokens to lowercase
//! 3. `RemoveLongFilter` - removes tokens longer than 40 bytes
//! 4. `Stemmer` - applies language-specific stemming, unless the stemmer is `none`
//!
//! Multi-term expressions (prefix, wildcard, fuzzy, range) are only lowercased, and regular
//! expressions are left untouched.

use sift_query::{Clause, QueryExpr};
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer, Token,
};

use crate::MonitorError;

/// Name of the tokenizer registered with every Tantivy index the monitor creates.
pub const SIFT_TOKENIZER: &str = "sift_text";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Parses a stemmer name. `none` disables stemming.
pub fn parse_language(name: &str) -> Result<Option<Language>, MonitorError> {
    let language = match name.to_lowercase().as_str() {
        "none" => return Ok(None),
        "arabic" => Language::Arabic,
        "danish" => Language::Danish,
        "dutch" => Language::Dutch,
        "english" => Language::English,
        "finnish" => Language::Finnish,
        "french" => Language::French,
        "german" => Language::German,
        "greek" => Language::Greek,
        "hungarian" => Language::Hungarian,
        "italian" => Language::Italian,
        "norwegian" => Language::Norwegian,
        "portuguese" => Language::Portuguese,
        "romanian" => Language::Romanian,
        "russian" => Language::Russian,
        "spanish" => Language::Spanish,
        "swedish" => Language::Swedish,
        "tamil" => Language::Tamil,
        "turkish" => Language::Turkish,
        other => return Err(MonitorError::InvalidLanguage(other.to_string())),
    };
    Ok(Some(language))
}

/// Builds the analyzer, stemming with `language` when given.
pub fn build_analyzer(language: Option<Language>) -> TextAnalyzer {
    match language {
        Some(language) => TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
            .filter(Stemmer::new(language))
            .build(),
        None => TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
            .build(),
    }
}

/// Builds the analyzer from a stemmer name.
pub fn build_analyzer_from_name(name: &str) -> Result<TextAnalyzer, MonitorError> {
    Ok(build_analyzer(parse_language(name)?))
}

/// Returns the analyzed tokens of `text`, with offsets and positions.
pub fn analyze(analyzer: &TextAnalyzer, text: &str) -> Vec<Token> {
    let mut analyzer = analyzer.clone();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(token.clone());
    }
    tokens
}

/// Returns the analyzed token texts of `text`.
pub fn tokenize(analyzer: &TextAnalyzer, text: &str) -> Vec<String> {
    analyze(analyzer, text).into_iter().map(|t| t.text).collect()
}

/// Rewrites a parsed expression so that its terms are in analyzed form.
///
/// A term that analyzes to several tokens becomes a phrase, and a one-token phrase
/// becomes a term. A term with no tokens is kept with empty text and matches nothing.
pub fn analyze_query(expr: &QueryExpr, analyzer: &TextAnalyzer) -> QueryExpr {
    match expr {
        QueryExpr::Term { field, text } => token_expr(field, tokenize(analyzer, text), 0),
        QueryExpr::Phrase { field, terms, slop } => {
            let tokens = terms.iter().flat_map(|t| tokenize(analyzer, t)).collect();
            token_expr(field, tokens, *slop)
        }
        QueryExpr::Boolean {
            clauses,
            minimum_should_match,
        } => QueryExpr::Boolean {
            clauses: clauses
                .iter()
                .map(|c| Clause {
                    occur: c.occur,
                    expr: analyze_query(&c.expr, analyzer),
                })
                .collect(),
            minimum_should_match: *minimum_should_match,
        },
        QueryExpr::Boost { expr, factor } => QueryExpr::boost(analyze_query(expr, analyzer), *factor),
        QueryExpr::ConstantScore(expr) => {
            QueryExpr::ConstantScore(Box::new(analyze_query(expr, analyzer)))
        }
        QueryExpr::Prefix { field, prefix } => QueryExpr::Prefix {
            field: field.clone(),
            prefix: prefix.to_lowercase(),
        },
        QueryExpr::Wildcard { field, pattern } => QueryExpr::Wildcard {
            field: field.clone(),
            pattern: pattern.to_lowercase(),
        },
        QueryExpr::Fuzzy {
            field,
            text,
            distance,
        } => QueryExpr::Fuzzy {
            field: field.clone(),
            text: text.to_lowercase(),
            distance: *distance,
        },
        QueryExpr::Range {
            field,
            lower,
            upper,
            include_lower,
            include_upper,
        } => QueryExpr::Range {
            field: field.clone(),
            lower: lower.as_ref().map(|b| b.to_lowercase()),
            upper: upper.as_ref().map(|b| b.to_lowercase()),
            include_lower: *include_lower,
            include_upper: *include_upper,
        },
        QueryExpr::Regex { .. } | QueryExpr::MatchAll => expr.clone(),
    }
}

/// Builds a term or phrase from analyzed tokens.
fn token_expr(field: &str, mut tokens: Vec<String>, slop: u32) -> QueryExpr {
    match tokens.len() {
        0 => QueryExpr::term(field, ""),
        1 => QueryExpr::term(field, tokens.remove(0)),
        _ => QueryExpr::Phrase {
            field: field.to_string(),
            terms: tokens,
            slop,
        },
    }
}

#[cfg(test)]
mod test {
    use sift_query::{ParseOptions, parse};

    use super::*;

    fn analyzed(query: &str) -> QueryExpr {
        let expr = parse(query, &ParseOptions::new("text")).unwrap().unwrap();
        analyze_query(&expr, &build_analyzer(Some(Language::English)))
    }

    #[test]
    fn parse_languages() {
        assert_eq!(parse_language("English").unwrap(), Some(Language::English));
        assert_eq!(parse_language("GERMAN").unwrap(), Some(Language::German));
        assert_eq!(parse_language("none").unwrap(), None);
        let err = parse_language("klingon").unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn analyzer_lowercases_and_stems() {
        let analyzer = build_analyzer(Some(Language::English));
        assert_eq!(tokenize(&analyzer, "HELLO Running"), vec!["hello", "run"]);
    }

    #[test]
    fn analyzer_without_stemmer() {
        let analyzer = build_analyzer(None);
        assert_eq!(tokenize(&analyzer, "Running dogs"), vec!["running", "dogs"]);
    }

    #[test]
    fn long_tokens_are_removed() {
        let analyzer = build_analyzer(None);
        let long = "a".repeat(MAX_TOKEN_LENGTH + 1);
        assert_eq!(tokenize(&analyzer, &format!("short {long}")), vec!["short"]);
    }

    #[test]
    fn tokens_carry_offsets() {
        let analyzer = build_analyzer(None);
        let tokens = analyze(&analyzer, "some text");
        assert_eq!(tokens[1].text, "text");
        assert_eq!(tokens[1].offset_from, 5);
        assert_eq!(tokens[1].offset_to, 9);
        assert_eq!(tokens[1].position, 1);
    }

    #[test]
    fn terms_are_analyzed() {
        assert_eq!(analyzed("Running"), QueryExpr::term("text", "run"));
    }

    #[test]
    fn multi_token_term_becomes_phrase() {
        assert_eq!(
            analyzed("text:foo-bar"),
            QueryExpr::phrase("text", vec!["foo".into(), "bar".into()])
        );
    }

    #[test]
    fn single_token_phrase_becomes_term() {
        assert_eq!(analyzed("\"world!\""), QueryExpr::term("text", "world"));
    }

    #[test]
    fn patterns_are_lowercased_only() {
        assert_eq!(
            analyzed("Runn*"),
            QueryExpr::Prefix {
                field: "text".into(),
                prefix: "runn".into(),
            }
        );
    }
}
