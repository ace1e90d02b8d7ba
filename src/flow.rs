//! The continuation signal handlers hand back to the dispatcher.

use crate::error::RouteError;

/// What a handler tells the dispatcher to do next.
///
/// Every handler — normal, error, and parameter — finishes by returning one
/// of these. There is no sentinel value and no shape inspection: the variant
/// *is* the control flow.
///
/// ```rust
/// use trellis::{Flow, Request, Response};
///
/// async fn guard(req: &mut Request, _res: &mut Response) -> Flow {
///     match req.param("id") {
///         Some(id) if id.chars().all(|c| c.is_ascii_digit()) => Flow::Next,
///         Some(_) => Flow::SkipRoute,
///         None => Flow::fail("missing id"),
///     }
/// }
/// ```
#[derive(Debug)]
#[must_use = "a handler's Flow decides whether dispatch continues"]
pub enum Flow {
    /// Advance to the next matching layer, clearing any in-flight error.
    Next,
    /// Abandon the rest of the current route's handler chain. Subsequent
    /// distinct layers and routes stay eligible. Outside a route this is
    /// equivalent to [`Flow::Next`]. Meaningless while an error is in
    /// flight — error propagation ignores it.
    SkipRoute,
    /// Put an error in flight: every normal layer is skipped until an error
    /// layer consumes it or the stack runs out.
    Fail(RouteError),
}

impl Flow {
    /// Shorthand for `Flow::Fail(RouteError::new(message))`.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(RouteError::new(message))
    }
}
