use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};

use crate::error::{ProviderError, ProviderResult};
use crate::models::{CustomBody, CustomHeader};

/// Split raw key material into individual keys.
///
/// Keys may be separated by commas, spaces or newlines; blanks are dropped.
pub fn split_keys(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Overlay `custom` onto `body`. Nested objects merge, anything else is replaced.
pub fn merge_custom_body(mut body: Map<String, Value>, custom: &[CustomBody]) -> Map<String, Value> {
    for entry in custom {
        match body.get_mut(&entry.key) {
            Some(existing) => merge_value(existing, &entry.value),
            None => {
                body.insert(entry.key.clone(), entry.value.clone());
            }
        }
    }
    body
}

fn merge_value(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, overlay) => *target = overlay.clone(),
    }
}

/// Convert caller-supplied headers to a `HeaderMap`, skipping blank names
pub fn custom_headers(headers: &[CustomHeader]) -> ProviderResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let name = header.name.trim();
        if name.is_empty() {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProviderError::InvalidHeader(format!("'{}': {e}", header.name)))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| ProviderError::InvalidHeader(format!("value for '{}': {e}", header.name)))?;
        map.append(name, value);
    }
    Ok(map)
}

/// Custom headers first, then bearer auth and JSON content type.
///
/// The fixed headers replace any custom header of the same name.
pub fn request_headers(custom: &[CustomHeader], api_key: &str) -> ProviderResult<HeaderMap> {
    let mut map = custom_headers(custom)?;
    let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|e| ProviderError::InvalidHeader(format!("authorization: {e}")))?;
    auth.set_sensitive(true);
    map.insert(AUTHORIZATION, auth);
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(map)
}

/// Join a configured base URL and an endpoint path, validating the result
pub fn endpoint_url(base_url: &str, path: &str) -> ProviderResult<String> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'));
    url::Url::parse(&url)?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn splits_on_commas_and_whitespace() {
        assert_eq!(split_keys("k0, k1\nk2  k3,,"), vec!["k0", "k1", "k2", "k3"]);
        assert!(split_keys(" , \n").is_empty());
    }

    #[test]
    fn overlay_wins_on_scalar_collision() {
        let body = json!({"watermark": false, "size": "2048x2048"});
        let merged = merge_custom_body(
            body.as_object().cloned().unwrap(),
            &[
                CustomBody::new("watermark", json!(true)),
                CustomBody::new("seed", json!(42)),
            ],
        );
        assert_eq!(
            Value::Object(merged),
            json!({"watermark": true, "size": "2048x2048", "seed": 42})
        );
    }

    #[test]
    fn overlay_merges_nested_objects() {
        let body = json!({"extra": {"a": 1, "b": {"c": 2}}});
        let merged = merge_custom_body(
            body.as_object().cloned().unwrap(),
            &[CustomBody::new("extra", json!({"b": {"d": 3}, "e": 4}))],
        );
        assert_eq!(
            Value::Object(merged),
            json!({"extra": {"a": 1, "b": {"c": 2, "d": 3}, "e": 4}})
        );
    }

    #[test]
    fn later_overlay_entries_win() {
        let merged = merge_custom_body(
            Map::new(),
            &[CustomBody::new("k", json!(1)), CustomBody::new("k", json!(2))],
        );
        assert_eq!(merged["k"], json!(2));
    }

    #[test]
    fn fixed_headers_override_custom_ones() {
        let headers = request_headers(
            &[
                CustomHeader::new("authorization", "Bearer spoofed"),
                CustomHeader::new("Content-Type", "text/plain"),
                CustomHeader::new("X-Trace", "abc"),
                CustomHeader::new("  ", "ignored"),
            ],
            "real-key",
        )
        .unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer real-key");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers["x-trace"], "abc");
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn rejects_invalid_header_name() {
        let err = custom_headers(&[CustomHeader::new("bad header", "v")]).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidHeader(_)));
    }

    #[test]
    fn endpoint_url_trims_slashes() {
        assert_eq!(
            endpoint_url("https://api.ppinfra.com/v3/", "/seedream-4.0").unwrap(),
            "https://api.ppinfra.com/v3/seedream-4.0"
        );
        assert!(endpoint_url("not a url", "x").is_err());
    }
}
