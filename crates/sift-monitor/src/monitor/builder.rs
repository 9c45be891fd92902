//! Monitor construction.

use std::{path::PathBuf, sync::Arc};

use sift_config::{CombineMode, Config, PresearcherKind};
use sift_presearch::{
    CombinePolicy, FieldFilterPresearcher, MultipassPresearcher, Presearcher, TermFrequencies,
    TermKind, TermPresearcher, TreeAdvancer, TreeBuilder, TreeWeightor, WeightNorm,
    WildcardNGrams,
};
use tantivy::tokenizer::TextAnalyzer;

use super::Monitor;
use crate::{
    MonitorError,
    analyzer::{build_analyzer_from_name, tokenize},
    hash::settings_hash,
    index::PresearchIndex,
    strategy::MatchStrategy,
};

/// Builds a [`Monitor`].
///
/// Everything not set explicitly is derived from the configuration.
pub struct MonitorBuilder {
    /// Configuration.
    config: Config,
    /// Index directory; the index lives in memory if unset.
    path: Option<PathBuf>,
    /// Presearcher overriding the configured one.
    presearcher: Option<Box<dyn Presearcher>>,
    /// Strategy overriding the configured one.
    strategy: Option<MatchStrategy>,
}

impl MonitorBuilder {
    /// Creates a builder from a configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            path: None,
            presearcher: None,
            strategy: None,
        }
    }

    /// Stores the presearch index in a directory.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Uses the given presearcher instead of the configured one.
    pub fn presearcher(mut self, presearcher: Box<dyn Presearcher>) -> Self {
        self.presearcher = Some(presearcher);
        self
    }

    /// Uses the given strategy instead of the configured one.
    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Builds the monitor, opening the index and restoring stored queries.
    pub fn build(self) -> Result<Monitor, MonitorError> {
        let config = self.config;
        let analyzer = build_analyzer_from_name(&config.monitor.stemmer)?;

        let (presearcher, settings) = match self.presearcher {
            Some(presearcher) => (presearcher, None),
            None => (
                build_presearcher(&config, &analyzer),
                Some(settings_hash(&config)),
            ),
        };
        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => MatchStrategy::from_settings(&config.matching)?,
        };
        let index = match &self.path {
            Some(path) => PresearchIndex::open(path)?,
            None => PresearchIndex::in_memory()?,
        };

        let mut monitor = Monitor::from_parts(index, presearcher, analyzer, strategy, &config);
        monitor.restore(settings.as_deref())?;
        Ok(monitor)
    }
}

/// Builds the presearcher described by the configuration.
pub fn build_presearcher(config: &Config, analyzer: &TextAnalyzer) -> Box<dyn Presearcher> {
    let p = &config.presearcher;

    let mut builder = TreeBuilder::new(build_weightor(config));
    if p.wildcard_ngrams {
        builder = builder.with_ngrams(WildcardNGrams {
            suffix: p.ngram_suffix.clone(),
            wildcard_token: p.wildcard_token.clone(),
            max_token_size: p.max_token_size,
        });
    }

    let presearcher: Box<dyn Presearcher> = match p.kind {
        PresearcherKind::Term => Box::new(TermPresearcher::new(builder)),
        PresearcherKind::Multipass => Box::new(MultipassPresearcher::new(
            builder,
            p.passes,
            TreeAdvancer::MinWeight(p.min_weight),
        )),
    };

    if p.filter_field.is_empty() {
        return presearcher;
    }
    let analyzer = analyzer.clone();
    Box::new(
        FieldFilterPresearcher::new(presearcher, p.filter_field.clone())
            .with_tokenizer(Arc::new(move |value: &str| tokenize(&analyzer, value))),
    )
}

/// Builds the term weightor described by the weight settings.
fn build_weightor(config: &Config) -> TreeWeightor {
    let w = &config.weights;
    let mut norms = vec![
        WeightNorm::TermKind {
            kind: TermKind::Any,
            factor: w.any_factor,
        },
        WeightNorm::TokenLength {
            a: w.length_a,
            k: w.length_k,
        },
    ];
    if !w.fields.is_empty() {
        norms.push(WeightNorm::Field(w.fields.clone()));
    }
    if !w.terms.is_empty() {
        norms.push(WeightNorm::Term(w.terms.clone()));
    }

    let combine = match w.combine {
        CombineMode::Min => CombinePolicy::Min,
        CombineMode::Max => CombinePolicy::Max,
        CombineMode::Product => CombinePolicy::Product,
    };
    let weightor = TreeWeightor::new(norms, combine);
    if w.frequencies.is_empty() {
        return weightor;
    }
    weightor.with_frequencies(TermFrequencies {
        frequencies: w.frequencies.clone(),
        n: w.frequency_n,
        k: w.frequency_k,
    })
}

#[cfg(test)]
mod test {
    use sift_config::PresearcherSettings;
    use sift_presearch::{AcceptAll, FieldTerms, Metadata};
    use sift_query::{ParseOptions, parse};

    use super::*;
    use crate::analyzer::build_analyzer;

    fn indexed(presearcher: &dyn Presearcher, query: &str) -> FieldTerms {
        let expr = parse(query, &ParseOptions::new("text")).unwrap().unwrap();
        presearcher.index_query(&presearcher.build_tree(&expr), &Metadata::new())
    }

    #[test]
    fn term_weights_steer_conjunctions() {
        let analyzer = build_analyzer(None);
        let default = build_presearcher(&Config::default(), &analyzer);
        assert!(indexed(default.as_ref(), "+goodbye +world").contains("text", "goodbye"));

        let mut config = Config::default();
        config.weights.terms.insert("goodbye".into(), 0.5);
        let weighted = build_presearcher(&config, &analyzer);
        let terms = indexed(weighted.as_ref(), "+goodbye +world");
        assert!(terms.contains("text", "world"));
        assert!(!terms.contains("text", "goodbye"));
    }

    #[test]
    fn multipass_indexes_pass_fields() {
        let config = Config {
            presearcher: PresearcherSettings {
                kind: PresearcherKind::Multipass,
                passes: 3,
                ..PresearcherSettings::default()
            },
            ..Config::default()
        };
        let presearcher = build_presearcher(&config, &build_analyzer(None));
        let terms = indexed(presearcher.as_ref(), "+alpha +beta +gamma");
        for pass in 0..3 {
            let field = MultipassPresearcher::pass_field("text", pass);
            assert!(terms.get(&field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn filter_field_wraps_presearcher() {
        let config = Config {
            presearcher: PresearcherSettings {
                filter_field: "language".into(),
                ..PresearcherSettings::default()
            },
            ..Config::default()
        };
        let presearcher = build_presearcher(&config, &build_analyzer(None));
        let document: FieldTerms = [("text", "hello"), ("language", "de")].into_iter().collect();

        let expr = parse("hello", &ParseOptions::new("text")).unwrap().unwrap();
        let tree = presearcher.build_tree(&expr);
        let english = presearcher.index_query(&tree, &Metadata::from([("language".into(), "EN".into())]));
        let german = presearcher.index_query(&tree, &Metadata::from([("language".into(), "DE".into())]));

        let selection = presearcher.build_query(&document, &AcceptAll);
        assert!(!selection.matches(&english));
        assert!(selection.matches(&german));
    }

    #[test]
    fn ngrams_select_wildcards() {
        let config = Config {
            presearcher: PresearcherSettings {
                wildcard_ngrams: true,
                ..PresearcherSettings::default()
            },
            ..Config::default()
        };
        let presearcher = build_presearcher(&config, &build_analyzer(None));
        let query = indexed(presearcher.as_ref(), "hell*");

        let hello: FieldTerms = [("text", "hello")].into_iter().collect();
        let goodbye: FieldTerms = [("text", "goodbye")].into_iter().collect();
        assert!(presearcher.build_query(&hello, &AcceptAll).matches(&query));
        assert!(!presearcher.build_query(&goodbye, &AcceptAll).matches(&query));
    }
}
