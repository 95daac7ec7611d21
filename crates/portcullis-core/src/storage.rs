//! Durable storage schema and value codec.
//!
//! Four keys mirror the session. Lists are JSON arrays of strings; the
//! superuser flag is `"1"` or `"0"`. Decoding never fails: a missing,
//! corrupt or wrongly typed value reads as empty/false.

/// Bearer token of the current admin.
pub const TOKEN_KEY: &str = "admin_token";
/// Role names, JSON-encoded array.
pub const ROLES_KEY: &str = "admin_roles";
/// Canonical permission keys, JSON-encoded array.
pub const PERMISSIONS_KEY: &str = "admin_permissions";
/// Superuser flag, `"1"` or `"0"`.
pub const IS_SUPER_KEY: &str = "admin_is_super";

/// Decode a JSON array of strings. Non-string elements are dropped.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Encode strings as a JSON array.
pub fn encode_string_list<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let items: Vec<&str> = items.into_iter().collect();
    serde_json::Value::from(items).to_string()
}

pub fn decode_flag(raw: Option<&str>) -> bool {
    raw == Some("1")
}

pub fn encode_flag(flag: bool) -> &'static str {
    if flag {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_list_tolerates_garbage() {
        assert!(decode_string_list(None).is_empty());
        assert!(decode_string_list(Some("")).is_empty());
        assert!(decode_string_list(Some("GET:/admin/users")).is_empty());
        assert!(decode_string_list(Some("{\"a\":1}")).is_empty());
        assert!(decode_string_list(Some("[1, 2")).is_empty());
    }

    #[test]
    fn decode_list_keeps_only_strings() {
        let decoded = decode_string_list(Some(r#"["ops", 3, null, "audit"]"#));
        assert_eq!(decoded, vec!["ops".to_string(), "audit".to_string()]);
    }

    #[test]
    fn encode_list_is_json_array() {
        let encoded = encode_string_list(["GET:/admin/users", "*:/admin/*"]);
        assert_eq!(encoded, r#"["GET:/admin/users","*:/admin/*"]"#);
        assert_eq!(
            decode_string_list(Some(&encoded)),
            vec!["GET:/admin/users".to_string(), "*:/admin/*".to_string()]
        );
    }

    #[test]
    fn flag_codec() {
        assert!(decode_flag(Some(encode_flag(true))));
        assert!(!decode_flag(Some(encode_flag(false))));
        assert!(!decode_flag(Some("true")));
        assert!(!decode_flag(None));
    }
}
