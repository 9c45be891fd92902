//! Presearch filtering for reverse search.
//!
//! Registered queries are reduced to small sets of weighted terms so an incoming document
//! only needs to be evaluated against the queries its own terms can select:
//!
//! - [`TreeBuilder`] turns a [`sift_query::QueryExpr`] into a weighted [`QueryTree`]
//! - [`QueryTree::terms`] picks the most selective sufficient term set
//! - a [`Presearcher`] indexes those terms and builds a [`SelectionQuery`] from a
//!   document's terms
//! - [`QueryDecomposer`] splits disjunctive queries into separately indexed parts
//!
//! Shapes that cannot be filtered (ranges, fuzzy terms, pure negations) degrade to the
//! any token, so a query is never missed.
//!
//! # Example
//!
//! ```
//! use sift_presearch::{AcceptAll, FieldTerms, Metadata, Presearcher, TermPresearcher};
//! use sift_query::{ParseOptions, parse};
//!
//! let presearcher = TermPresearcher::default();
//! let expr = parse("+goodbye +world", &ParseOptions::new("text")).unwrap().unwrap();
//! let indexed = presearcher.index_query(&presearcher.build_tree(&expr), &Metadata::new());
//!
//! let document: FieldTerms = [("text", "goodbye"), ("text", "everyone")].into_iter().collect();
//! assert!(presearcher.build_query(&document, &AcceptAll).matches(&indexed));
//! ```

#![warn(missing_docs)]

mod builder;
mod decompose;
mod presearcher;
mod selection;
mod term;
mod tree;
mod weight;
mod wildcard;

pub use builder::TreeBuilder;
pub use decompose::QueryDecomposer;
pub use presearcher::{
    AcceptAll, DEFAULT_PASSES, FILTER_FIELD_PREFIX, FieldFilterPresearcher, Metadata, MetadataTokenizer,
    MultipassPresearcher, Presearcher, TermFilter, TermPresearcher, any_token_query,
};
pub use selection::{FieldTerms, SelectionQuery};
pub use term::{ANY_TOKEN, ANY_TOKEN_FIELD, QueryTerm, TermKind};
pub use tree::{QueryTree, TreeAdvancer};
pub use weight::{
    CombinePolicy, DEFAULT_LENGTH_A, DEFAULT_LENGTH_K, TermFrequencies, TreeWeightor, WeightNorm,
};
pub use wildcard::{
    DEFAULT_MAX_TOKEN_SIZE, DEFAULT_NGRAM_SUFFIX, DEFAULT_WILDCARD_TOKEN, WildcardNGrams,
    regex_literal, wildcard_literal,
};
