//! Category resolution.
//!
//! Maps free-text keywords onto catalog categories with a small, deterministic
//! integer score. The resolver never asks the caller to choose: every
//! non-empty request yields at least one category and an instruction to
//! continue with the top match.

use std::sync::Arc;

use tollgate_types::{CategoryMatch, CategoryResolution, NextAction};
use tracing::debug;

use crate::error::CatalogError;
use crate::models::CatalogIndex;
use crate::synonyms::SynonymTable;

pub const DEFAULT_CATEGORY_LIMIT: usize = 5;
const EXAMPLES_PER_CATEGORY: usize = 3;
const EXACT_MATCH_SCORE: u32 = 3;
const TAG_CONTAINS_TERM_SCORE: u32 = 2;
const TERM_CONTAINS_TAG_SCORE: u32 = 1;
const BROWSE_BASE_SCORE: u32 = 1;

/// Resolves keywords to ranked categories.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    catalog: Arc<CatalogIndex>,
    synonyms: SynonymTable,
    default_limit: usize,
}

impl CategoryResolver {
    pub fn new(catalog: Arc<CatalogIndex>) -> Self {
        Self {
            catalog,
            synonyms: SynonymTable::builtin(),
            default_limit: DEFAULT_CATEGORY_LIMIT,
        }
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Ranks categories for `keywords`.
    ///
    /// Ordering: score descending, then operation count descending, then name
    /// ascending. With no usable keywords every category scores the base weight
    /// so the richest ones surface. When keywords match nothing, the largest
    /// categories are returned with `fallback = true`.
    pub fn resolve(&self, keywords: &[String], limit: Option<usize>) -> Result<CategoryResolution, CatalogError> {
        if self.catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        let limit = limit.filter(|limit| *limit > 0).unwrap_or(self.default_limit);
        let expanded_terms = self.synonyms.expand_all(keywords);

        let mut ranked: Vec<CategoryMatch> = self
            .catalog
            .categories()
            .filter_map(|(name, operation_count)| {
                let (score, matched_keywords) = if expanded_terms.is_empty() {
                    (BROWSE_BASE_SCORE, Vec::new())
                } else {
                    score_category(name, &expanded_terms)
                };
                (score > 0).then(|| self.category_match(name, operation_count, score, matched_keywords))
            })
            .collect();

        let fallback = ranked.is_empty();
        if fallback {
            ranked = self
                .catalog
                .categories()
                .map(|(name, operation_count)| self.category_match(name, operation_count, 0, Vec::new()))
                .collect();
        }

        ranked.sort_by(|left, right| {
            right
                .score
                .cmp(&left.score)
                .then_with(|| right.operation_count.cmp(&left.operation_count))
                .then_with(|| left.name.cmp(&right.name))
        });
        ranked.truncate(limit);
        debug!(?expanded_terms, fallback, matches = ranked.len(), "resolved categories");

        let instruction = match ranked.first() {
            Some(top) if fallback => format!(
                "No category matched the keywords. Continue with the largest category '{}' by calling list_endpoints with category='{}'; do not ask the user to choose.",
                top.name, top.name
            ),
            Some(top) => format!(
                "Select the top category '{}' and call list_endpoints with category='{}' now; do not ask the user to choose.",
                top.name, top.name
            ),
            None => "The catalog has no categories.".to_string(),
        };

        Ok(CategoryResolution {
            keywords: keywords.to_vec(),
            expanded_terms,
            categories: ranked,
            fallback,
            next_action: NextAction::AutoSelectTopMatch,
            instruction,
        })
    }

    fn category_match(&self, name: &str, operation_count: usize, score: u32, matched_keywords: Vec<String>) -> CategoryMatch {
        CategoryMatch {
            name: name.to_string(),
            score,
            operation_count,
            matched_keywords,
            examples: self.catalog.category_examples(name, EXAMPLES_PER_CATEGORY),
        }
    }
}

/// Sums per-term scores: exact +3, category contains term +2, term contains category +1.
fn score_category(category: &str, terms: &[String]) -> (u32, Vec<String>) {
    let category_lower = category.to_lowercase();
    let mut score = 0;
    let mut matched = Vec::new();
    for term in terms {
        let term_score = if category_lower == *term {
            EXACT_MATCH_SCORE
        } else if category_lower.contains(term.as_str()) {
            TAG_CONTAINS_TERM_SCORE
        } else if term.contains(category_lower.as_str()) {
            TERM_CONTAINS_TAG_SCORE
        } else {
            0
        };
        if term_score > 0 {
            score += term_score;
            matched.push(term.clone());
        }
    }
    (score, matched)
}
