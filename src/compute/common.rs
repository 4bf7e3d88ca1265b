//! Shapes shared by several compute resources

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Hypermedia link attached to every compute resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Reference to another resource (a server's flavor or image)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Deserialize a resource reference that the API sends as `""` when absent
/// (servers booted from a volume have no image).
pub(crate) fn ref_or_empty<'de, D>(deserializer: D) -> Result<Option<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Deserialize a number that the API sends as `""` when unset
pub(crate) fn number_or_empty<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Last path segment of a URL, e.g. the image ID in a `Location` header
pub(crate) fn last_segment(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "ref_or_empty")]
        image: Option<ResourceRef>,
        #[serde(default, deserialize_with = "number_or_empty")]
        swap: Option<u64>,
    }

    #[test]
    fn test_empty_image_is_none() {
        let holder: Holder = serde_json::from_value(json!({"image": "", "swap": ""})).unwrap();
        assert!(holder.image.is_none());
        assert!(holder.swap.is_none());
    }

    #[test]
    fn test_object_image_is_some() {
        let holder: Holder =
            serde_json::from_value(json!({"image": {"id": "img-1", "links": []}, "swap": 512})).unwrap();
        assert_eq!(holder.image.unwrap().id, "img-1");
        assert_eq!(holder.swap, Some(512));
    }

    #[test]
    fn test_missing_fields_default() {
        let holder: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(holder.image.is_none());
        assert!(holder.swap.is_none());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("https://x/v2/9999/images/abc-123"), Some("abc-123"));
        assert_eq!(last_segment("https://x/v2/9999/images/abc-123/"), Some("abc-123"));
        assert_eq!(last_segment(""), None);
    }
}
