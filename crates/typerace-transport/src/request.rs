//! The HTTP request a connection was upgraded from.

use url::form_urlencoded;

/// Path and decoded query parameters captured during the WebSocket
/// handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    path: String,
    query: Vec<(String, String)>,
}

impl UpgradeRequest {
    /// Builds a request from a raw path and an optional raw query string
    /// (without the leading `?`).
    ///
    /// The query is parsed as `application/x-www-form-urlencoded`:
    /// `%XX` escapes and `+` are decoded; malformed escapes are kept
    /// literally.
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        let query = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self {
            path: path.into(),
            query,
        }
    }

    /// The request path, e.g. `/ws/482913`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The first value of query parameter `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_lookup() {
        let req = UpgradeRequest::new("/ws/123456", Some("username=alice&x=1"));
        assert_eq!(req.path(), "/ws/123456");
        assert_eq!(req.param("username"), Some("alice"));
        assert_eq!(req.param("x"), Some("1"));
        assert_eq!(req.param("missing"), None);
    }

    #[test]
    fn test_param_without_value_is_empty() {
        let req = UpgradeRequest::new("/", Some("username"));
        assert_eq!(req.param("username"), Some(""));
    }

    #[test]
    fn test_empty_pairs_are_skipped() {
        let req = UpgradeRequest::new("/", Some("&&username=bob&"));
        assert_eq!(req.param("username"), Some("bob"));
    }

    #[test]
    fn test_no_query() {
        let req = UpgradeRequest::new("/ws/1", None);
        assert_eq!(req.param("username"), None);
    }

    #[test]
    fn test_percent_decoding() {
        let req = UpgradeRequest::new("/", Some("username=J%C3%BCrgen+K&bad=%zz%4"));
        assert_eq!(req.param("username"), Some("Jürgen K"));
        assert_eq!(req.param("bad"), Some("%zz%4"));
    }
}
