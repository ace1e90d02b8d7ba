//! Incoming HTTP request type.
//!
//! The URL a handler sees through [`Request::url`] is the *current* one:
//! while a mount-scoped layer is running, the mount prefix has been trimmed
//! away, and it is restored the moment control returns to the parent stack.
//! The query string and any absolute-form authority survive trimming intact.

use std::collections::HashMap;

use http::Extensions;

use crate::method::Method;

/// An incoming HTTP request as the dispatcher sees it.
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    params: HashMap<String, String>,
    extensions: Extensions,
}

impl Request {
    /// Builds a request from a method and a request target.
    ///
    /// The target may be origin-form (`/users/42?full=1`) or absolute-form
    /// (`http://example.com/users/42`) — matching only ever considers the
    /// path component.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// Adds a header. Builder-style, for the server boundary and tests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body. Builder-style.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The current request target, mount trimming included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The path component of [`url`](Request::url): authority stripped,
    /// query stripped.
    pub fn path(&self) -> &str {
        let rest = &self.url[protohost(&self.url).len()..];
        match rest.find('?') {
            Some(i) => &rest[..i],
            None => rest,
        }
    }

    /// The query string, without the `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.url.find('?').map(|i| &self.url[i + 1..])
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns a named path parameter captured by the currently matched
    /// layer, after decoding and parameter preprocessing.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All captured parameters for the currently matched layer.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Overwrites a captured parameter. Parameter preprocessors use this to
    /// normalize values before route handlers run; the change is memoized
    /// per request and replayed on later layers capturing the same value.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Request-scoped typed state, shared across layers of one dispatch.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub(crate) fn params_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.params
    }
}

/// The `scheme://authority` prefix of an absolute-form request target, or
/// `""` for the usual origin-form. An `://` appearing inside the query
/// string does not count.
pub(crate) fn protohost(url: &str) -> &str {
    if url.is_empty() || url.starts_with('/') {
        return "";
    }
    let path_end = url.find('?').unwrap_or(url.len());
    match url[..path_end].find("://") {
        Some(i) => match url[i + 3..].find('/') {
            Some(j) => &url[..i + 3 + j],
            None => url,
        },
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, protohost};
    use crate::method::Method;

    #[test]
    fn path_strips_query_and_authority() {
        let req = Request::new(Method::Get, "/proxy?url=http://example.com/blog");
        assert_eq!(req.path(), "/proxy");
        assert_eq!(req.query(), Some("url=http://example.com/blog"));

        let req = Request::new(Method::Get, "http://example.com/foo");
        assert_eq!(req.path(), "/foo");
    }

    #[test]
    fn protohost_ignores_fqdn_in_query() {
        assert_eq!(protohost("http://example.com/foo"), "http://example.com");
        assert_eq!(protohost("/proxy?url=http://example.com/blog"), "");
        assert_eq!(protohost("/proxy/http://example.com/blog"), "");
    }
}
