//! Small string helpers for message templates and name inflection.
//!
//! The inflection rules cover regular English nouns, which is what resource
//! names in practice are. Irregular words can always be configured
//! explicitly (`viewVar`, message `name`).

use serde_json::{Map, Value};

/// Replace `{key}` placeholders in `template` with values from `replacements`.
///
/// Strings are inserted verbatim, other values use their JSON rendering.
/// Unknown placeholders are left untouched.
pub fn insert(template: &str, replacements: &Map<String, Value>) -> String {
    let mut out = template.to_string();
    for (key, value) in replacements {
        let placeholder = format!("{{{key}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        out = out.replace(&placeholder, &text);
    }
    out
}

/// Uppercase the first character.
pub fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"BlogPosts"` → `"blog_posts"`.
pub fn underscore(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for (i, c) in text.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// `"blog_posts"` → `"Blog Posts"`.
pub fn humanize(text: &str) -> String {
    text.split('_')
        .filter(|word| !word.is_empty())
        .map(ucfirst)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"admin_index"` / `"AdminIndex"` → `"adminIndex"`.
pub fn variable(text: &str) -> String {
    let camel: String = underscore(text)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(ucfirst)
        .collect();
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Singular form of a regular English noun.
pub fn singularize(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["sses", "xes", "ches", "shes", "zzes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with("ss") || lower.ends_with("us") || !lower.ends_with('s') {
        return word.to_string();
    }
    word[..word.len() - 1].to_string()
}

/// Loose, type-insensitive equality between two identifiers.
///
/// `1`, `"1"` and `1.0` are all equal; `true` equals `"1"`.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (scalar_text(left), scalar_text(right)) {
        (Some(l), Some(r)) => {
            if l == r {
                return true;
            }
            match (l.parse::<f64>(), r.parse::<f64>()) {
                (Ok(l), Ok(r)) => l == r,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Truthiness of a request or configuration value.
///
/// `null`, `false`, `0`, `""`, `"0"`, empty lists and empty maps are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(list) => !list.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_replaces_known_placeholders() {
        let mut replacements = Map::new();
        replacements.insert("name".into(), json!("blog"));
        replacements.insert("count".into(), json!(3));
        assert_eq!(
            insert("Saved {count} {name} {other}", &replacements),
            "Saved 3 blog {other}"
        );
    }

    #[test]
    fn test_inflection() {
        assert_eq!(singularize("Blogs"), "Blog");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(singularize("Boxes"), "Box");
        assert_eq!(singularize("Address"), "Address");
        assert_eq!(underscore("BlogPosts"), "blog_posts");
        assert_eq!(humanize("blog_posts"), "Blog Posts");
        assert_eq!(variable("admin_index"), "adminIndex");
        assert_eq!(variable("BlogPosts"), "blogPosts");
        assert_eq!(variable("Blogs"), "blogs");
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("2"), &json!(2.0)));
        assert!(!loose_eq(&json!(1), &json!("2")));
        assert!(!loose_eq(&json!("abc"), &json!(null)));
    }

    #[test]
    fn test_truthy() {
        assert!(truthy(&json!("1")));
        assert!(truthy(&json!(true)));
        assert!(!truthy(&json!("0")));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
    }
}
