use indexmap::IndexMap;
use tollgate_types::{CatalogMiss, CatalogMissKind, EndpointListing, EndpointSummary, HttpMethod, NextAction};

use crate::models::CatalogIndex;

/// Enumerates the operations of one category, optionally filtered by method.
///
/// A category with no (matching) operations is reported as a [`CatalogMiss`]
/// that tells the agent to re-run category resolution instead of guessing a path.
pub fn list_endpoints(
    catalog: &CatalogIndex,
    category: &str,
    method: Option<HttpMethod>,
) -> Result<EndpointListing, CatalogMiss> {
    let endpoints: Vec<EndpointSummary> = catalog
        .category_entries(category)
        .into_iter()
        .filter(|entry| method.is_none_or(|method| entry.method == method))
        .map(|entry| EndpointSummary {
            path: entry.path.clone(),
            method: entry.method,
            summary: entry.summary.clone(),
            operation_id: entry.operation_id.clone(),
            requires_confirmation: entry.is_mutating(),
        })
        .collect();

    if endpoints.is_empty() {
        let message = match method {
            Some(method) => format!("category '{}' has no {} operations", category, method),
            None => format!("category '{}' does not exist in the catalog", category),
        };
        return Err(CatalogMiss {
            kind: CatalogMissKind::UnknownCategory,
            message,
            category: Some(category.to_string()),
            path: None,
            method,
            available_methods: Vec::new(),
            next_action: NextAction::RerunCategoryResolver,
            instruction: "Call resolve_categories again with different keywords and use a category name it returns; do not guess endpoint paths.".to_string(),
        });
    }

    let mut grouped_by_method: IndexMap<String, Vec<EndpointSummary>> = IndexMap::new();
    for verb in HttpMethod::ALL {
        let group: Vec<EndpointSummary> = endpoints.iter().filter(|endpoint| endpoint.method == verb).cloned().collect();
        if !group.is_empty() {
            grouped_by_method.insert(verb.as_str().to_string(), group);
        }
    }

    Ok(EndpointListing {
        category: category.to_string(),
        total: endpoints.len(),
        endpoints,
        grouped_by_method,
        next_action: NextAction::InspectOperation,
        instruction: "Pick the endpoint that fits the request and call get_operation_detail with its path and method.".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogIndex {
        CatalogIndex::from_embedded().unwrap()
    }

    #[test]
    fn groups_endpoints_by_method_in_fixed_order() {
        let listing = list_endpoints(&catalog(), "班级管理", None).unwrap();

        let methods: Vec<&String> = listing.grouped_by_method.keys().collect();
        assert_eq!(methods, vec!["GET", "POST", "PUT", "DELETE"]);
        assert_eq!(listing.total, listing.endpoints.len());
        assert_eq!(listing.next_action, NextAction::InspectOperation);
    }

    #[test]
    fn method_filter_narrows_listing() {
        let listing = list_endpoints(&catalog(), "学生管理", Some(HttpMethod::Delete)).unwrap();

        assert_eq!(listing.total, 1);
        assert!(listing.endpoints[0].requires_confirmation);
    }

    #[test]
    fn unknown_category_is_a_structured_miss() {
        let miss = list_endpoints(&catalog(), "财务管理", None).unwrap_err();

        assert_eq!(miss.kind, CatalogMissKind::UnknownCategory);
        assert_eq!(miss.next_action, NextAction::RerunCategoryResolver);
        assert_eq!(miss.category.as_deref(), Some("财务管理"));
    }

    #[test]
    fn empty_method_filter_result_is_a_miss() {
        let miss = list_endpoints(&catalog(), "考勤管理", Some(HttpMethod::Delete)).unwrap_err();
        assert!(miss.message.contains("DELETE"));
    }
}
