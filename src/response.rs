//! Outgoing HTTP response, built up mutably as layers run.
//!
//! Unlike a one-shot response value, a dispatch response accumulates:
//! middleware layers set headers, a terminal handler sets the status and
//! calls [`Response::end`]. Ending is final — once a response is finished
//! every further mutation is ignored and dispatch stops at its next step.
//! (The observed source left double-completion undefined; ignoring the
//! late writer is this crate's documented policy.)

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

/// An outgoing HTTP response in progress.
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    finished: bool,
}

impl Response {
    /// A fresh `200 OK` response with no headers and no body.
    pub fn new() -> Self {
        Self { status: 200, headers: Vec::new(), body: Vec::new(), finished: false }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Sets the status code. Ignored after the response has finished.
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        if !self.finished {
            self.status = status;
        }
        self
    }

    /// Sets a header, replacing any previous value for the same name
    /// (case-insensitive). Ignored after the response has finished.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if self.finished {
            return self;
        }
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some((_, v)) => *v = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Completes the response with `body`. The first call wins; later
    /// calls are ignored.
    pub fn end(&mut self, body: impl Into<Vec<u8>>) {
        if !self.finished {
            self.body = body.into();
            self.finished = true;
        }
    }

    /// True once a handler has called [`end`](Response::end). The
    /// dispatcher checks this between every step and stops when set.
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// UTF-8 view of the body, for assertions and logging.
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// Converts into the hyper-facing response. Headers that do not form
    /// valid wire values are dropped with a warning rather than failing
    /// the whole response.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = http::Response::builder().status(status);
        for (name, value) in &self.headers {
            match (
                http::HeaderName::try_from(name.as_str()),
                http::HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(n), Ok(v)) => builder = builder.header(n, v),
                _ => tracing::warn!(name, "dropping malformed response header"),
            }
        }
        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| {
                http::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::new()))
                    .expect("empty 500 response is always valid")
            })
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Response;

    #[test]
    fn end_is_final() {
        let mut res = Response::new();
        res.set_status(201);
        res.end("first");
        assert!(res.finished());

        res.set_status(500);
        res.header("x-late", "ignored");
        res.end("second");

        assert_eq!(res.status(), 201);
        assert_eq!(res.body_str(), "first");
        assert_eq!(res.get_header("x-late"), None);
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let mut res = Response::new();
        res.header("Allow", "GET");
        res.header("allow", "GET, POST");
        assert_eq!(res.get_header("ALLOW"), Some("GET, POST"));
        assert_eq!(res.headers.len(), 1);
    }
}
