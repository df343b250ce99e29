use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ParseError;

/// The only protocol prefix a status line may start with.
const STATUS_LINE_PREFIX: &[u8] = b"HTTP/1.1 ";

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

/// The parsed first line of a response: `HTTP/1.1 <code> <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    /// The status code digits exactly as received (e.g. `"200"`).
    pub code: String,
    /// The reason phrase; may be empty.
    pub text: String,
}

impl StatusLine {
    /// Split a raw status line (without its CRLF) into code and reason.
    ///
    /// The line must start with `HTTP/1.1 `, followed by one or more ASCII
    /// digits and a single space. Everything after that space is the
    /// reason phrase.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedStatusLine(String::from_utf8_lossy(raw).into_owned());

        let rest = raw.strip_prefix(STATUS_LINE_PREFIX).ok_or_else(malformed)?;
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || rest.get(digits) != Some(&b' ') {
            return Err(malformed());
        }

        Ok(Self {
            code: String::from_utf8_lossy(&rest[..digits]).into_owned(),
            text: String::from_utf8_lossy(&rest[digits + 1..]).into_owned(),
        })
    }

    /// The status code as a number, if it fits into `u16`.
    pub fn code_u16(&self) -> Option<u16> {
        self.code.parse().ok()
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/1.1 {} {}", self.code, self.text)
    }
}

// ---------------------------------------------------------------------------
// Header / HeaderMap
// ---------------------------------------------------------------------------

/// A single HTTP header field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header field name (original casing preserved).
    pub name: String,
    /// Header field value, exactly as received.
    pub value: String,
}

/// Header fields in arrival order.
///
/// Names are compared exactly as received. Inserting a name that is
/// already present replaces its value in place, so the field keeps the
/// position of its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Header>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|h| h.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.entries.push(Header { name, value });
                None
            }
        }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    /// Case-insensitive lookup, returning the first match.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Serialized as a JSON object in insertion order.
impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for header in &self.entries {
            map.serialize_entry(&header.name, &header.value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// HttpResponse
// ---------------------------------------------------------------------------

/// A fully parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    /// Status code digits as received.
    pub status_code: String,
    /// Reason phrase.
    pub status_text: String,
    /// Header fields in arrival order.
    pub headers: HeaderMap,
    /// The decoded chunked body.
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
}

/// Serialize body bytes as a UTF-8 string (lossy) for JSON output.
fn serialize_body<S: Serializer>(body: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(body))
}

impl HttpResponse {
    /// The status code as a number, if it fits into `u16`.
    pub fn status_u16(&self) -> Option<u16> {
        self.status_code.parse().ok()
    }

    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Return the body as a lossy UTF-8 string (always succeeds).
    pub fn body_as_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Look up a header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get_ignore_case(name)
    }

    /// Return `true` if the `Transfer-Encoding` header contains `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.header_value("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_splits_code_and_text() {
        let line = StatusLine::parse(b"HTTP/1.1 404 Not Found").unwrap();
        assert_eq!(line.code, "404");
        assert_eq!(line.text, "Not Found");
        assert_eq!(line.code_u16(), Some(404));
        assert_eq!(line.to_string(), "HTTP/1.1 404 Not Found");
    }

    #[test]
    fn status_line_allows_empty_reason() {
        let line = StatusLine::parse(b"HTTP/1.1 204 ").unwrap();
        assert_eq!(line.code, "204");
        assert_eq!(line.text, "");
    }

    #[test]
    fn status_line_rejects_other_versions_and_shapes() {
        for raw in [
            &b"HTTP/1.0 200 OK"[..],
            b"HTTP/2 200 OK",
            b"HTTP/1.1 OK",
            b"HTTP/1.1 200",
            b"HTTP/1.1 200OK",
            b"",
        ] {
            assert!(
                matches!(StatusLine::parse(raw), Err(ParseError::MalformedStatusLine(_))),
                "expected rejection of {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn header_map_overwrites_in_place() {
        let mut map = HeaderMap::new();
        assert_eq!(map.insert("Foo", "1"), None);
        assert_eq!(map.insert("Bar", "2"), None);
        assert_eq!(map.insert("Foo", "3"), Some("1".to_string()));

        let names: Vec<&str> = map.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Foo", "Bar"]);
        assert_eq!(map.get("Foo"), Some("3"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn header_map_names_are_case_sensitive() {
        let map: HeaderMap = [("Content-Type", "a"), ("content-type", "b")]
            .into_iter()
            .collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("content-type"), Some("b"));
        assert_eq!(map.get_ignore_case("CONTENT-TYPE"), Some("a"));
        assert!(!map.contains("CONTENT-TYPE"));
    }

    #[test]
    fn header_map_serializes_as_ordered_object() {
        let map: HeaderMap = [("Z", "1"), ("A", "2")].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Z":"1","A":"2"}"#);
    }
}
