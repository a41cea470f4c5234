//! Request model and parser.
//!
//! # Responsibilities
//! - Split raw bytes into request line, header block and body
//! - Extract method, path, query parameters and headers
//! - Degrade malformed input to a best-effort `Request` instead of failing
//!
//! # Design Decisions
//! - Header names are case-insensitive; the last occurrence of a name wins
//! - Query keys keep the last value on duplicates; no percent-decoding
//! - Parsing is pure: identical input always yields an equal `Request`

use std::collections::BTreeMap;

/// Separates the header block from the body.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Method assigned to requests whose request line could not be parsed.
pub const UNKNOWN_METHOD: &str = "UNKNOWN";

/// Query parameters in key order.
pub type QueryParams = BTreeMap<String, String>;

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Case-insensitive header map. Names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any earlier value for the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(lowercased name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Declared body length. Missing or unparseable values count as zero.
    pub fn content_length(&self) -> usize {
        self.get("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Parse header field lines. Lines without a `:` are ignored.
    pub fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut headers = Self::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    headers.insert(name, value.trim());
                }
            }
        }
        headers
    }
}

/// Split a block of text into lines, accepting `\r\n` or a bare `\n`.
pub(crate) fn split_lines(block: &str) -> impl Iterator<Item = &str> {
    block
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Declared Content-Length of a raw header block (request line included).
pub fn content_length_of(header_block: &[u8]) -> usize {
    let text = String::from_utf8_lossy(header_block);
    Headers::parse_lines(split_lines(&text).skip(1)).content_length()
}

/// Split a query string on `&` and `=`. Pairs without `=` get an empty value.
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(key.to_string(), value.to_string());
    }
    params
}

/// A fully read HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: QueryParams,
    /// True iff the request target contained `?`, even with an empty query.
    pub has_query: bool,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Parse raw request bytes. Never fails: a malformed request line yields
    /// method [`UNKNOWN_METHOD`] and an empty path.
    pub fn parse(raw: &[u8]) -> Self {
        let (head, rest) = match find_bytes(raw, HEADER_TERMINATOR) {
            Some(pos) => (&raw[..pos], &raw[pos + HEADER_TERMINATOR.len()..]),
            None => (raw, &[][..]),
        };

        let head = String::from_utf8_lossy(head);
        let mut lines = split_lines(&head);
        let request_line = lines.next().unwrap_or("");
        let headers = Headers::parse_lines(lines);

        let body_len = headers.content_length().min(rest.len());
        let body = rest[..body_len].to_vec();

        let Some((method, target, version)) = split_request_line(request_line) else {
            return Self {
                method: UNKNOWN_METHOD.to_string(),
                path: String::new(),
                query: QueryParams::new(),
                has_query: false,
                version: String::new(),
                headers,
                body,
            };
        };

        let (path, query, has_query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query), true),
            None => (target, QueryParams::new(), false),
        };

        Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
            has_query,
            version: version.to_string(),
            headers,
            body,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.method == UNKNOWN_METHOD
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }
}

/// `METHOD SP TARGET SP VERSION`, exactly three fields separated by single spaces.
fn split_request_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut fields = line.split(' ');
    let method = fields.next()?;
    let target = fields.next()?;
    let version = fields.next()?;
    if fields.next().is_some() {
        return None;
    }

    let method_ok = !method.is_empty() && method.bytes().all(|b| b.is_ascii_alphabetic());
    if !method_ok || target.is_empty() || version.is_empty() {
        return None;
    }
    Some((method, target, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_with_query() {
        let req = Request::parse(b"GET /a/b?x=1&y=2 HTTP/1.1\r\nHost: h\r\n\r\n");

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/a/b");
        assert_eq!(req.version, "HTTP/1.1");
        assert!(req.has_query);
        assert_eq!(req.query.len(), 2);
        assert_eq!(req.query["x"], "1");
        assert_eq!(req.query["y"], "2");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("Host"), Some("h"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let req = Request::parse(b"GET / HTTP/1.1\r\ncontent-TYPE: text/plain\r\n\r\n");
        assert_eq!(req.headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(req.content_type(), Some("text/plain"));
        assert!(req.headers.contains("CONTENT-type"));
    }

    #[test]
    fn test_duplicate_content_length_last_wins() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 10\r\n\r\n0123456789";
        let req = Request::parse(raw);

        assert_eq!(req.headers.get("content-length"), Some("10"));
        assert_eq!(req.headers.content_length(), 10);
        assert_eq!(req.body, b"0123456789");
        assert_eq!(content_length_of(&raw[..raw.len() - 10]), 10);
    }

    #[test]
    fn test_body_truncated_to_content_length() {
        let req = Request::parse(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcdef");
        assert_eq!(req.body, b"abc");
    }

    #[test]
    fn test_body_without_content_length_is_empty() {
        let req = Request::parse(b"POST / HTTP/1.1\r\nHost: h\r\n\r\nleftover");
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_body_is_binary_safe() {
        let mut raw = b"POST /up HTTP/1.1\r\nContent-Length: 4\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0x00, 0x0d, 0x0a]);
        let req = Request::parse(&raw);
        assert_eq!(req.body, vec![0xff, 0x00, 0x0d, 0x0a]);
    }

    #[test]
    fn test_malformed_request_lines() {
        let inputs: [&[u8]; 7] = [
            b"",
            b"\r\n\r\n",
            b"GET\r\n\r\n",
            b"GET /only-two\r\n\r\n",
            b"GET  /double-space HTTP/1.1\r\n\r\n",
            b"GET / HTTP/1.1 extra\r\n\r\n",
            b"G3T / HTTP/1.1\r\n\r\n",
        ];
        for raw in inputs {
            let req = Request::parse(raw);
            assert_eq!(req.method, UNKNOWN_METHOD, "input: {:?}", raw);
            assert!(req.path.is_empty());
            assert!(req.is_malformed());
        }
    }

    #[test]
    fn test_malformed_request_line_keeps_headers() {
        let req = Request::parse(b"garbage\r\nHost: h\r\n\r\n");
        assert!(req.is_malformed());
        assert_eq!(req.headers.get("host"), Some("h"));
    }

    #[test]
    fn test_missing_terminator_parses_head_only() {
        let req = Request::parse(b"GET /partial HTTP/1.1\r\nHost: h");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/partial");
        assert_eq!(req.headers.get("host"), Some("h"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_bare_newlines_tolerated() {
        let req = Request::parse(b"GET /n HTTP/1.1\nHost: h\n\r\n\r\n");
        assert_eq!(req.path, "/n");
        assert_eq!(req.headers.get("host"), Some("h"));
    }

    #[test]
    fn test_header_lines_without_colon_ignored() {
        let req = Request::parse(b"GET / HTTP/1.1\r\nnot a header\r\nA: 1\r\n\r\n");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("a"), Some("1"));
    }

    #[test]
    fn test_header_value_keeps_inner_colons() {
        let req = Request::parse(b"GET / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n");
        assert_eq!(req.headers.get("host"), Some("localhost:8080"));
    }

    #[test]
    fn test_query_edge_cases() {
        let params = parse_query("flag&a=1&a=2&&b=x=y&=v");
        assert_eq!(params["flag"], "");
        assert_eq!(params["a"], "2");
        assert_eq!(params["b"], "x=y");
        assert_eq!(params[""], "v");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_query_still_marks_has_query() {
        let req = Request::parse(b"GET /calc? HTTP/1.1\r\n\r\n");
        assert_eq!(req.path, "/calc");
        assert!(req.has_query);
        assert!(req.query.is_empty());

        let req = Request::parse(b"GET /calc HTTP/1.1\r\n\r\n");
        assert!(!req.has_query);
    }

    #[test]
    fn test_target_split_once_on_question_mark() {
        let req = Request::parse(b"GET /p?a=1?b=2 HTTP/1.1\r\n\r\n");
        assert_eq!(req.path, "/p");
        assert_eq!(req.query["a"], "1?b=2");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = b"POST /form?id=7 HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhello";
        assert_eq!(Request::parse(raw), Request::parse(raw));
    }

    #[test]
    fn test_unparseable_content_length_is_zero() {
        let req = Request::parse(b"POST / HTTP/1.1\r\nContent-Length: -4\r\n\r\nbody");
        assert_eq!(req.headers.content_length(), 0);
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_find_bytes() {
        assert_eq!(find_bytes(b"abc\r\n\r\ndef", HEADER_TERMINATOR), Some(3));
        assert_eq!(find_bytes(b"abc", HEADER_TERMINATOR), None);
        assert_eq!(find_bytes(b"abc", b""), None);
    }
}
