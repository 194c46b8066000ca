use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tollgate_types::{CatalogEntry, HttpMethod, OperationKey, OperationPreview};
use tollgate_util::{expand_tilde, is_remote_source, match_path_template};
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::openapi_import::import_openapi_catalog;

/// Demo kindergarten administration API bundled into the binary.
pub const EMBEDDED_CATALOG: &str = include_str!("../catalog/kindergarten.openapi.json");

/// Read-only index over every catalog operation.
///
/// Built once at startup and shared (usually behind an `Arc`) by all
/// concurrent calls. Lookups are keyed by `(path, method)`; categories keep
/// first-seen order from the source document.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_key: HashMap<OperationKey, usize>,
    categories: IndexMap<String, Vec<usize>>,
}

/// A catalog entry matched against a concrete request path.
#[derive(Debug, Clone)]
pub struct ResolvedOperation<'a> {
    pub entry: &'a CatalogEntry,
    /// Placeholder values captured from the concrete path.
    pub path_values: Map<String, Value>,
}

impl CatalogIndex {
    /// Builds the index. Later duplicates of a `(path, method)` pair are dropped.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut index = CatalogIndex::default();
        for entry in entries {
            let key = entry.key();
            if index.by_key.contains_key(&key) {
                warn!(operation = %key, "duplicate catalog operation ignored");
                continue;
            }
            let position = index.entries.len();
            for tag in &entry.tags {
                index.categories.entry(tag.clone()).or_default().push(position);
            }
            index.by_key.insert(key, position);
            index.entries.push(entry);
        }
        index
    }

    pub fn from_openapi_str(source_content: &str) -> Result<Self, CatalogError> {
        import_openapi_catalog(source_content).map(Self::from_entries)
    }

    /// Loads the bundled demo catalog.
    pub fn from_embedded() -> Result<Self, CatalogError> {
        Self::from_openapi_str(EMBEDDED_CATALOG)
    }

    /// Loads a catalog from a file path or URL; `None` selects the bundled catalog.
    pub async fn load(source: Option<&str>) -> Result<Self, CatalogError> {
        let Some(source) = source.map(str::trim).filter(|source| !source.is_empty()) else {
            info!("using embedded catalog");
            return Self::from_embedded();
        };

        let content = if is_remote_source(source) {
            fetch_remote_source(source).await?
        } else {
            let path = expand_tilde(source);
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|error| CatalogError::Read {
                    path: path.display().to_string(),
                    source: error,
                })?
        };

        let index = Self::from_openapi_str(&content)?;
        info!(%source, operations = index.len(), categories = index.category_count(), "catalog loaded");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Category names with their operation counts, in first-seen order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, usize)> {
        self.categories
            .iter()
            .map(|(name, positions)| (name.as_str(), positions.len()))
    }

    /// Entries tagged with `category`, compared case-insensitively.
    pub fn category_entries(&self, category: &str) -> Vec<&CatalogEntry> {
        let category = category.trim().to_lowercase();
        self.categories
            .iter()
            .filter(|(name, _)| name.to_lowercase() == category)
            .flat_map(|(_, positions)| positions.iter().map(|position| &self.entries[*position]))
            .collect()
    }

    /// The first `limit` operations of a category.
    pub fn category_examples(&self, category: &str, limit: usize) -> Vec<OperationPreview> {
        self.category_entries(category)
            .into_iter()
            .take(limit)
            .map(|entry| OperationPreview {
                path: entry.path.clone(),
                method: entry.method,
                summary: entry.summary.clone(),
            })
            .collect()
    }

    /// Finds the operation for a path template or concrete path.
    ///
    /// Exact template keys win. Otherwise the template with the most literal
    /// segments that matches the concrete path is chosen, so
    /// `/api/students/search` never resolves to `/api/students/{id}` when both exist.
    pub fn resolve(&self, path: &str, method: HttpMethod) -> Option<ResolvedOperation<'_>> {
        let path = normalize_request_path(path);
        if let Some(position) = self.by_key.get(&OperationKey::new(path, method)) {
            return Some(ResolvedOperation {
                entry: &self.entries[*position],
                path_values: Map::new(),
            });
        }

        self.entries
            .iter()
            .filter(|entry| entry.method == method)
            .filter_map(|entry| match_path_template(&entry.path, path).map(|captures| (entry, captures)))
            .max_by_key(|(entry, _)| (literal_segment_count(&entry.path), std::cmp::Reverse(entry.path.len())))
            .map(|(entry, path_values)| ResolvedOperation { entry, path_values })
    }

    /// Methods available for a path, in GET, POST, PUT, PATCH, DELETE order.
    pub fn methods_for_path(&self, path: &str) -> Vec<HttpMethod> {
        let path = normalize_request_path(path);
        HttpMethod::ALL
            .into_iter()
            .filter(|method| {
                self.entries.iter().any(|entry| {
                    entry.method == *method && (entry.path == path || match_path_template(&entry.path, path).is_some())
                })
            })
            .collect()
    }
}

async fn fetch_remote_source(url: &str) -> Result<String, CatalogError> {
    let fetch_error = |message: String| CatalogError::Fetch {
        url: url.to_string(),
        message,
    };
    let response = reqwest::get(url)
        .await
        .map_err(|error| fetch_error(error.to_string()))?;
    if !response.status().is_success() {
        return Err(fetch_error(format!("HTTP {}", response.status())));
    }
    response.text().await.map_err(|error| fetch_error(error.to_string()))
}

/// Drops any query string and trailing slash.
fn normalize_request_path(path: &str) -> &str {
    let path = path.trim();
    let path = path.split('?').next().unwrap_or(path);
    if path.len() > 1 { path.trim_end_matches('/') } else { path }
}

fn literal_segment_count(template: &str) -> usize {
    template
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .count()
}
