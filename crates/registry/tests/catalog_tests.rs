use std::sync::Arc;

use tollgate_registry::{CatalogIndex, CategoryResolver, get_operation_detail, list_endpoints};
use tollgate_types::{HttpMethod, NextAction};

fn load_fixture() -> CatalogIndex {
    let source = include_str!("data/catalog_fixture.yaml");
    CatalogIndex::from_openapi_str(source).expect("load catalog from fixture")
}

#[test]
fn derives_operations_and_categories_from_yaml() {
    let catalog = load_fixture();
    assert_eq!(catalog.len(), 4);
    let categories: Vec<(&str, usize)> = catalog.categories().collect();
    assert!(categories.contains(&("Students", 3)), "categories: {:?}", categories);
    assert!(categories.contains(&("Classes", 1)), "categories: {:?}", categories);
}

#[test]
fn english_keywords_match_category_names_case_insensitively() {
    let resolver = CategoryResolver::new(Arc::new(load_fixture()));
    let resolution = resolver.resolve(&["Student".to_string()], None).expect("resolve");
    let top = resolution.top_category().expect("at least one category");
    assert_eq!(top.name, "Students");
    assert!(!resolution.fallback);
    assert_eq!(resolution.next_action, NextAction::AutoSelectTopMatch);
}

#[test]
fn unmatched_keywords_still_return_a_category() {
    let resolver = CategoryResolver::new(Arc::new(load_fixture()));
    let resolution = resolver.resolve(&["invoices".to_string()], None).expect("resolve");
    assert!(resolution.fallback);
    assert_eq!(resolution.top_category().map(|category| category.name.as_str()), Some("Students"));
}

#[test]
fn full_discovery_chain_over_fixture() {
    let catalog = load_fixture();
    let listing = list_endpoints(&catalog, "students", Some(HttpMethod::Post)).expect("listing");
    assert_eq!(listing.total, 1);

    let endpoint = &listing.endpoints[0];
    let detail = get_operation_detail(&catalog, &endpoint.path, endpoint.method).expect("detail");
    let body = detail.request_body.expect("request body");
    assert_eq!(body.required, vec!["name", "classId"]);
    assert_eq!(body.properties["level"].enum_values, vec!["junior", "middle", "senior"]);
    assert!(detail.rendered_summary.contains("Example body"));
    assert!(detail.requires_auth);
}

#[test]
fn operation_level_security_can_open_an_endpoint() {
    let catalog = load_fixture();
    let detail = get_operation_detail(&catalog, "/v1/classes", HttpMethod::Get).expect("detail");
    assert!(!detail.requires_auth);
}
