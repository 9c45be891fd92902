//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for potential issues.

use std::fmt;

use crate::{Config, PresearcherKind};

/// Stemmer names accepted by `monitor.stemmer`.
pub const KNOWN_STEMMERS: &[&str] = &[
    "none",
    "arabic",
    "danish",
    "dutch",
    "english",
    "finnish",
    "french",
    "german",
    "greek",
    "hungarian",
    "italian",
    "norwegian",
    "portuguese",
    "romanian",
    "russian",
    "spanish",
    "swedish",
    "tamil",
    "turkish",
];

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// `presearcher.passes` is zero; one pass is used instead.
    ZeroPasses,
    /// The multipass presearcher is configured with a single pass.
    SinglePassMultipass,
    /// `matching.threads` is zero; one thread is used instead.
    ZeroThreads,
    /// `matching.queue_size` is zero; a queue of one is used instead.
    ZeroQueueSize,
    /// `monitor.commit_batch_size` is zero; every query is committed on its own.
    ZeroCommitBatch,
    /// `monitor.stemmer` names no known language.
    UnknownStemmer {
        /// The configured name.
        name: String,
    },
    /// `presearcher.min_weight` is negative, so every subtree may be skipped.
    NegativeMinWeight {
        /// The configured weight.
        value: f32,
    },
    /// `monitor.default_field` is empty.
    EmptyDefaultField,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPasses => write!(f, "presearcher.passes is 0, using 1"),
            Self::SinglePassMultipass => {
                write!(f, "multipass presearcher with a single pass behaves like the term presearcher")
            }
            Self::ZeroThreads => write!(f, "matching.threads is 0, using 1"),
            Self::ZeroQueueSize => write!(f, "matching.queue_size is 0, using 1"),
            Self::ZeroCommitBatch => {
                write!(f, "monitor.commit_batch_size is 0, committing every query")
            }
            Self::UnknownStemmer { name } => write!(f, "unknown stemmer '{name}'"),
            Self::NegativeMinWeight { value } => {
                write!(f, "presearcher.min_weight is negative: {value}")
            }
            Self::EmptyDefaultField => write!(f, "monitor.default_field is empty"),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let stemmer = config.monitor.stemmer.to_lowercase();
    if !KNOWN_STEMMERS.contains(&stemmer.as_str()) {
        warnings.push(ConfigWarning::UnknownStemmer {
            name: config.monitor.stemmer.clone(),
        });
    }
    if config.monitor.default_field.is_empty() {
        warnings.push(ConfigWarning::EmptyDefaultField);
    }
    if config.monitor.commit_batch_size == 0 {
        warnings.push(ConfigWarning::ZeroCommitBatch);
    }

    let presearcher = &config.presearcher;
    if presearcher.passes == 0 {
        warnings.push(ConfigWarning::ZeroPasses);
    } else if presearcher.passes == 1 && presearcher.kind == PresearcherKind::Multipass {
        warnings.push(ConfigWarning::SinglePassMultipass);
    }
    if presearcher.min_weight < 0.0 {
        warnings.push(ConfigWarning::NegativeMinWeight {
            value: presearcher.min_weight,
        });
    }

    if config.matching.threads == 0 {
        warnings.push(ConfigWarning::ZeroThreads);
    }
    if config.matching.queue_size == 0 {
        warnings.push(ConfigWarning::ZeroQueueSize);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn test_unknown_stemmer() {
        let mut config = Config::default();
        config.monitor.stemmer = "klingon".into();
        assert_eq!(
            config.validate(),
            vec![ConfigWarning::UnknownStemmer {
                name: "klingon".into()
            }]
        );

        config.monitor.stemmer = "German".into();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_pass_warnings() {
        let mut config = Config::default();
        config.presearcher.passes = 0;
        assert_eq!(config.validate(), vec![ConfigWarning::ZeroPasses]);

        config.presearcher.passes = 1;
        assert!(config.validate().is_empty());

        config.presearcher.kind = PresearcherKind::Multipass;
        assert_eq!(config.validate(), vec![ConfigWarning::SinglePassMultipass]);
    }

    #[test]
    fn test_matching_warnings() {
        let mut config = Config::default();
        config.matching.threads = 0;
        config.matching.queue_size = 0;
        config.presearcher.min_weight = -1.0;

        let warnings = config.validate();
        assert!(warnings.contains(&ConfigWarning::ZeroThreads));
        assert!(warnings.contains(&ConfigWarning::ZeroQueueSize));
        assert!(warnings.contains(&ConfigWarning::NegativeMinWeight { value: -1.0 }));
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(
            ConfigWarning::UnknownStemmer {
                name: "klingon".into()
            }
            .to_string(),
            "unknown stemmer 'klingon'"
        );
        assert_eq!(ConfigWarning::ZeroThreads.to_string(), "matching.threads is 0, using 1");
    }
}
