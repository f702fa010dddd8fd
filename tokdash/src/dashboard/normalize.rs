//! Canonical model/provider names and brand classification.
//!
//! Gateways report the same model under different identifiers (`zai-glm-4.6` vs `glm-4.6`) and
//! the same provider under different names (`cloud` vs `OpenRouter`). The [`NameNormalizer`]
//! rewrites those identifiers through static alias tables before anything is grouped, and maps
//! canonical model names onto a coarse brand with an ordered list of regex rules.
//!
//! The tables are configuration (see [`NormalizationConfig`]) and are immutable once the
//! normalizer is built, so a single instance is shared by every request.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::config::{BrandRule, NormalizationConfig};

/// Brand assigned when no rule matches.
pub const FALLBACK_BRAND: &str = "Other";

#[derive(Debug, Error)]
pub enum NormalizerError {
    /// A brand rule pattern failed to compile
    #[error("invalid brand pattern {pattern:?} for brand {brand:?}: {source}")]
    InvalidPattern {
        pattern: String,
        brand: String,
        #[source]
        source: regex::Error,
    },

    /// An alias resolves to a name that is itself an alias key
    #[error("{namespace} alias {from:?} -> {to:?} targets another alias")]
    ChainedAlias {
        namespace: &'static str,
        from: String,
        to: String,
    },
}

#[derive(Debug)]
struct CompiledRule {
    pattern: Regex,
    brand: String,
}

/// Maps raw identifiers to canonical names and brands.
#[derive(Debug)]
pub struct NameNormalizer {
    model_aliases: HashMap<String, String>,
    provider_aliases: HashMap<String, String>,
    brand_rules: Vec<CompiledRule>,
}

impl NameNormalizer {
    pub fn new(
        model_aliases: HashMap<String, String>,
        provider_aliases: HashMap<String, String>,
        brand_rules: &[BrandRule],
    ) -> Result<Self, NormalizerError> {
        check_aliases("model", &model_aliases)?;
        check_aliases("provider", &provider_aliases)?;

        let brand_rules = brand_rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|pattern| CompiledRule {
                        pattern,
                        brand: rule.brand.clone(),
                    })
                    .map_err(|source| NormalizerError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        brand: rule.brand.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            model_aliases,
            provider_aliases,
            brand_rules,
        })
    }

    pub fn from_config(config: &NormalizationConfig) -> Result<Self, NormalizerError> {
        Self::new(config.model_aliases.clone(), config.provider_aliases.clone(), &config.brand_rules)
    }

    /// Canonical model name, or `raw` unchanged when it has no alias.
    pub fn normalize_model<'a>(&'a self, raw: &'a str) -> &'a str {
        self.model_aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    /// Canonical provider name, or `raw` unchanged when it has no alias.
    pub fn normalize_provider<'a>(&'a self, raw: &'a str) -> &'a str {
        self.provider_aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    /// Brand of a model. The model is normalized and lowercased first, and any namespace prefix
    /// (everything up to the last `/`) is dropped before the rules are tried in order.
    pub fn brand_of(&self, model: &str) -> &str {
        let normalized = self.normalize_model(model).to_lowercase();
        let name = normalized.rsplit('/').next().unwrap_or(&normalized);

        self.brand_rules
            .iter()
            .find(|rule| rule.pattern.is_match(name))
            .map(|rule| rule.brand.as_str())
            .unwrap_or(FALLBACK_BRAND)
    }
}

// A lookup is only idempotent if no target can be looked up again.
fn check_aliases(namespace: &'static str, aliases: &HashMap<String, String>) -> Result<(), NormalizerError> {
    for (from, to) in aliases {
        if from != to && aliases.contains_key(to) {
            return Err(NormalizerError::ChainedAlias {
                namespace,
                from: from.clone(),
                to: to.clone(),
            });
        }
    }
    Ok(())
}
