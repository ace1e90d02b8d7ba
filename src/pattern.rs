//! Route pattern compilation and path matching.
//!
//! A pattern is a `/`-separated sequence of literal segments, named
//! parameters (`:name`), and an optional trailing wildcard (`*`). Matching
//! is a pure function of the path string: no allocation is shared, nothing
//! is mutated, and the same path always yields the same result.
//!
//! Two modes exist because routes and mounts disagree about suffixes:
//!
//! - [`Mode::Full`] — the whole path must be consumed (one trailing slash
//!   is tolerated). Used by routes.
//! - [`Mode::Prefix`] — the pattern must match a leading run of whole
//!   segments; the byte offset where the remainder begins is reported so
//!   the dispatcher can trim the mount prefix. Used by `layer_at` / `mount`.
//!
//! Captured parameter values are percent-decoded before anyone sees them.
//! A malformed escape or invalid UTF-8 is a [`RouteError`] with name
//! `URIError` and status 400, not a silent pass-through of raw bytes.

use percent_encoding::percent_decode_str;

use crate::error::RouteError;

#[derive(Debug)]
enum Seg {
    Literal(String),
    Param(String),
    /// Matches the entire remaining path, including none. Must be last.
    Wildcard,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    Full,
    Prefix,
}

/// A compiled route pattern.
#[derive(Debug)]
pub(crate) struct Pattern {
    raw: String,
    segs: Vec<Seg>,
    mode: Mode,
}

/// A successful match.
#[derive(Debug)]
pub(crate) struct PatternMatch {
    /// Captured parameters, decoded, in declaration order.
    pub(crate) params: Vec<(String, String)>,
    /// Byte length of the matched prefix within the path. For `Mode::Full`
    /// this is the whole path; for `Mode::Prefix` the remainder starts here
    /// (at a `/`, or at the end of the path).
    pub(crate) matched_len: usize,
}

impl Pattern {
    /// Compiles `path` in the given mode.
    ///
    /// # Panics
    ///
    /// Panics if the pattern does not start with `/`, contains an unnamed
    /// `:` parameter, or places `*` anywhere but last. Patterns are
    /// registration-time constants; a bad one is a programming error.
    pub(crate) fn new(path: &str, mode: Mode) -> Self {
        assert!(
            path.starts_with('/'),
            "invalid pattern `{path}`: must start with '/'"
        );

        let mut segs = Vec::new();
        for part in path[1..].split('/') {
            if part.is_empty() {
                // "/" itself, or a trailing slash in the pattern.
                continue;
            }
            assert!(
                !matches!(segs.last(), Some(Seg::Wildcard)),
                "invalid pattern `{path}`: '*' must be the last segment"
            );
            if let Some(name) = part.strip_prefix(':') {
                assert!(!name.is_empty(), "invalid pattern `{path}`: unnamed parameter");
                segs.push(Seg::Param(name.to_owned()));
            } else if part == "*" {
                segs.push(Seg::Wildcard);
            } else {
                segs.push(Seg::Literal(part.to_owned()));
            }
        }

        Self { raw: path.to_owned(), segs, mode }
    }

    /// The pattern as registered, for diagnostics and logging.
    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    /// True when a match of this pattern should strip the matched prefix
    /// from the URL presented to the layer's handler.
    pub(crate) fn trims(&self) -> bool {
        self.mode == Mode::Prefix && !self.segs.is_empty()
    }

    /// Matches `path` (a pathname — no scheme, authority, or query).
    ///
    /// `Ok(None)` means no match. `Err` means the path *did* line up with
    /// the pattern but a captured value failed to decode.
    pub(crate) fn matches(&self, path: &str) -> Result<Option<PatternMatch>, RouteError> {
        let mut params = Vec::new();
        let mut pos = 0usize;

        for seg in &self.segs {
            if let Seg::Wildcard = seg {
                pos = path.len();
                break;
            }
            if path.as_bytes().get(pos) != Some(&b'/') {
                return Ok(None);
            }
            let start = pos + 1;
            let end = path[start..]
                .find('/')
                .map_or(path.len(), |i| start + i);
            let part = &path[start..end];
            if part.is_empty() {
                return Ok(None);
            }
            match seg {
                Seg::Literal(lit) => {
                    if part != lit {
                        return Ok(None);
                    }
                }
                Seg::Param(name) => {
                    params.push((name.clone(), decode_param(part)?));
                }
                Seg::Wildcard => unreachable!("handled above"),
            }
            pos = end;
        }

        match self.mode {
            Mode::Full => {
                // Tolerate one trailing slash, nothing more.
                let rest = &path[pos..];
                if rest.is_empty() || rest == "/" {
                    Ok(Some(PatternMatch { params, matched_len: path.len() }))
                } else {
                    Ok(None)
                }
            }
            // The remainder starts at a segment boundary by construction:
            // `pos` is either the end of the path or the index of a '/'.
            Mode::Prefix => Ok(Some(PatternMatch { params, matched_len: pos })),
        }
    }
}

/// Strict percent-decoding for a captured path segment.
///
/// `percent_encoding` passes malformed escapes through untouched, so the
/// escape syntax is validated first: every `%` must be followed by two hex
/// digits. Invalid escapes and invalid UTF-8 both fail the dispatch with a
/// 400-class decode error instead of leaking the raw value.
fn decode_param(raw: &str) -> Result<String, RouteError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() >= i + 3
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(RouteError::decode(raw));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(_) => Err(RouteError::decode(raw)),
    }
}
