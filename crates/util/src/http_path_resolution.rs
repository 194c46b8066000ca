use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde_json::{Map, Value};

/// Everything except RFC3986 unreserved bytes is percent-encoded.
const PATH_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}/]+)\}").unwrap());

/// Resolves a path template by replacing `{key}` placeholders with values
/// from `variables`.
///
/// String values are inserted verbatim before encoding; other JSON values use
/// their JSON text. Placeholders with no matching key stay in place so callers
/// can detect them with [`unresolved_placeholders`].
///
/// ```ignore
/// let mut variables = serde_json::Map::new();
/// variables.insert("id".into(), serde_json::json!(7));
/// assert_eq!(build_path("/api/students/{id}", &variables), "/api/students/7");
/// ```
pub fn build_path(template: &str, variables: &Map<String, Value>) -> String {
    let mut path = template.to_string();
    for (key, value) in variables.iter() {
        let raw = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let encoded = utf8_percent_encode(&raw, PATH_VALUE_ENCODE_SET).to_string();
        path = path.replace(&format!("{{{}}}", key), &encoded);
    }
    path
}

/// Returns placeholder names in template order.
pub fn placeholder_names(template: &str) -> Vec<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|captures| captures.get(1).map(|name| name.as_str().to_string()))
        .collect()
}

/// Returns placeholders still present after substitution.
pub fn unresolved_placeholders(path: &str) -> Vec<String> {
    placeholder_names(path)
}

/// Matches a concrete path against a template, returning captured placeholder
/// values on success.
///
/// Literal segments compare exactly; placeholder segments capture any
/// non-empty segment. A concrete path that still carries the `{name}` text for
/// a placeholder matches without capturing it.
pub fn match_path_template(template: &str, concrete: &str) -> Option<Map<String, Value>> {
    let template_segments: Vec<&str> = template.trim_end_matches('/').split('/').collect();
    let concrete_segments: Vec<&str> = concrete.trim_end_matches('/').split('/').collect();
    if template_segments.len() != concrete_segments.len() {
        return None;
    }

    let mut captures = Map::new();
    for (template_segment, concrete_segment) in template_segments.iter().zip(concrete_segments.iter()) {
        match placeholder_segment_name(template_segment) {
            Some(name) => {
                if concrete_segment.is_empty() {
                    return None;
                }
                if *concrete_segment != *template_segment {
                    captures.insert(name.to_string(), Value::String(concrete_segment.to_string()));
                }
            }
            None if template_segment == concrete_segment => {}
            None => return None,
        }
    }
    Some(captures)
}

fn placeholder_segment_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_path_preserves_unreserved_identifier_bytes() {
        let mut variables = Map::new();
        variables.insert("student_id".to_string(), Value::String("stu-d5f6a7b8".to_string()));

        let path = build_path("/api/students/{student_id}", &variables);
        assert_eq!(path, "/api/students/stu-d5f6a7b8");
    }

    #[test]
    fn build_path_encodes_reserved_bytes_and_numbers() {
        let mut variables = Map::new();
        variables.insert("name".to_string(), Value::String("大班/一".to_string()));
        variables.insert("id".to_string(), json!(7));

        let path = build_path("/api/classes/{name}/students/{id}", &variables);
        assert_eq!(path, "/api/classes/%E5%A4%A7%E7%8F%AD%2F%E4%B8%80/students/7");
    }

    #[test]
    fn reports_unresolved_placeholders() {
        let path = build_path("/api/classes/{class_id}/students/{id}", &Map::new());
        assert_eq!(unresolved_placeholders(&path), vec!["class_id", "id"]);
    }

    #[test]
    fn matches_concrete_paths_against_templates() {
        let captures = match_path_template("/api/students/{id}", "/api/students/7").unwrap();
        assert_eq!(captures.get("id"), Some(&json!("7")));

        let untouched = match_path_template("/api/students/{id}", "/api/students/{id}").unwrap();
        assert!(untouched.is_empty());

        assert!(match_path_template("/api/students/{id}", "/api/classes/7").is_none());
        assert!(match_path_template("/api/students", "/api/students/7").is_none());
    }
}
