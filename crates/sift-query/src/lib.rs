//! Query language parsing and AST for sift.
//!
//! Registered queries are written in a Lucene-style query language:
//!
//! - **Terms**: `rust` - single words
//! - **Phrases**: `"error handling"` - exact sequences, `"a b"~2` with slop
//! - **Required / prohibited**: `+rust -deprecated`
//! - **Conjunctions**: `rust AND golang`, `rust OR golang`
//! - **Grouping**: `+foo +(bar baz)` - precedence control
//! - **Fields**: `title:guide` - search specific fields
//! - **Boosting**: `rust^2.5` - adjust term importance
//! - **Patterns**: `prefix*`, `wi?d*card`, `/reg(ex)?/`
//! - **Fuzzy and ranges**: `roam~1`, `date:[a TO b}`, `*:*`
//!
//! # Example
//!
//! ```
//! use sift_query::{ParseOptions, parse};
//!
//! let expr = parse("title:guide (rust OR golang) -deprecated", &ParseOptions::new("text"))
//!     .unwrap();
//! assert!(expr.is_some());
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{Clause, Occur, QueryExpr};
pub use error::{LexError, ParseError, QueryError, QueryErrorKind};
pub use lexer::{Token, tokenize, tokenize_with_offsets};
pub use parser::{DefaultOperator, ParseOptions, parse};
