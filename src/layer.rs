//! One registered unit of the router's stack: a pattern plus an endpoint.

use crate::error::RouteError;
use crate::handler::{BoxedErrorHandler, BoxedHandler};
use crate::pattern::{Pattern, PatternMatch};
use crate::route::Route;
use crate::router::Router;

/// What a layer does when it matches. The variant is fixed at registration
/// time — the dispatcher never infers a handler's role from its shape.
pub(crate) enum Endpoint {
    /// A normal handler. Skipped while an error is in flight.
    Handle(BoxedHandler),
    /// An error handler. Runs only while an error is in flight.
    Catch(BoxedErrorHandler),
    /// A method-aware handler chain for one path pattern.
    Route(Route),
    /// A nested router dispatched under a mount prefix.
    Mount(Router),
}

pub(crate) struct Layer {
    pub(crate) pattern: Pattern,
    pub(crate) endpoint: Endpoint,
}

impl Layer {
    pub(crate) fn new(pattern: Pattern, endpoint: Endpoint) -> Self {
        Self { pattern, endpoint }
    }

    /// Pure path match. `Err` carries a parameter decode failure, which the
    /// dispatcher admits to the error channel instead of matching.
    pub(crate) fn matches(&self, path: &str) -> Result<Option<PatternMatch>, RouteError> {
        self.pattern.matches(path)
    }

    /// The registered pattern, for diagnostics events and logs. Layers
    /// inside a route report the route's path instead.
    pub(crate) fn path(&self) -> &str {
        match &self.endpoint {
            Endpoint::Route(route) => route.path(),
            _ => self.pattern.raw(),
        }
    }
}
