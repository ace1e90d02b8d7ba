//! The layered request router and its dispatch state machine.
//!
//! A router is an ordered stack of layers. Dispatch walks the stack in
//! registration order, matching each layer's pattern against the current
//! path, running parameter preprocessors for newly captured names, and
//! invoking the matched handler. The handler's [`Flow`] decides the next
//! step: continue, put an error in flight, or abandon the current route.
//!
//! Routers nest: [`Router::dispatch`] has the same shape as a normal
//! handler, and [`Router::mount`] attaches a whole router under a path
//! prefix. While a mounted subtree runs, the prefix is trimmed from the
//! URL the subtree sees and restored — query string and any absolute-form
//! authority untouched — the moment control returns to the parent stack.

use std::collections::HashMap;
use std::pin::Pin;

use tracing::debug;

use crate::diagnostics::{self, ERROR_CHANNEL, LayerEvent, REQUEST_CHANNEL};
use crate::error::RouteError;
use crate::flow::Flow;
use crate::handler::{
    BoxedParamHandler, ErrorHandler, Handler, ParamHandler, erase, erase_error, erase_param,
};
use crate::layer::{Endpoint, Layer};
use crate::method::Method;
use crate::pattern::{Mode, Pattern};
use crate::request::{Request, protohost};
use crate::response::Response;
use crate::route::Route;

/// Per-request, per-router record of one parameter name's preprocessing.
struct ParamCalled {
    /// The captured value the preprocessors ran against.
    matched: String,
    /// The value of `req.params[name]` after the chain ran — user
    /// mutations included — replayed on later layers.
    value: String,
    outcome: ParamOutcome,
}

#[derive(Clone)]
enum ParamOutcome {
    Ok,
    Skip,
    Fail(RouteError),
}

/// The application router.
///
/// Build it once at startup, then serve it (or mount it on another
/// router). Registration is not supported concurrently with dispatch: the
/// stack and the parameter registry are read-only once serving begins.
///
/// ```rust
/// use trellis::{Flow, Request, Response, Router};
///
/// async fn get_user(req: &mut Request, res: &mut Response) -> Flow {
///     let id = req.param("id").unwrap_or("unknown");
///     res.end(format!("user {id}"));
///     Flow::Next
/// }
///
/// let mut router = Router::new();
/// router.get("/users/:id", get_user);
/// ```
pub struct Router {
    stack: Vec<Layer>,
    params: HashMap<String, Vec<BoxedParamHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { stack: Vec::new(), params: HashMap::new() }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Appends a normal layer that matches every path.
    pub fn layer<H>(&mut self, handler: H) -> &mut Self
    where
        H: for<'a> Handler<'a>,
    {
        self.stack.push(Layer::new(
            Pattern::new("/", Mode::Prefix),
            Endpoint::Handle(erase(handler)),
        ));
        self
    }

    /// Appends a normal layer scoped to a path prefix. While it runs, the
    /// matched prefix is trimmed from the URL the handler sees.
    pub fn layer_at<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Handler<'a>,
    {
        self.stack.push(Layer::new(
            Pattern::new(path, Mode::Prefix),
            Endpoint::Handle(erase(handler)),
        ));
        self
    }

    /// Appends an error layer that matches every path.
    pub fn catch<H>(&mut self, handler: H) -> &mut Self
    where
        H: for<'a> ErrorHandler<'a>,
    {
        self.stack.push(Layer::new(
            Pattern::new("/", Mode::Prefix),
            Endpoint::Catch(erase_error(handler)),
        ));
        self
    }

    /// Appends an error layer scoped to a path prefix.
    pub fn catch_at<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> ErrorHandler<'a>,
    {
        self.stack.push(Layer::new(
            Pattern::new(path, Mode::Prefix),
            Endpoint::Catch(erase_error(handler)),
        ));
        self
    }

    /// Mounts a whole router under a path prefix.
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        self.stack.push(Layer::new(
            Pattern::new(path, Mode::Prefix),
            Endpoint::Mount(router),
        ));
        self
    }

    /// Creates a new route for `path` and returns it for chained
    /// per-method registration. Each call creates a distinct route — two
    /// calls with the same path produce two independently matched routes.
    pub fn route(&mut self, path: &str) -> &mut Route {
        self.stack.push(Layer::new(
            Pattern::new(path, Mode::Full),
            Endpoint::Route(Route::new(path)),
        ));
        match &mut self.stack.last_mut().expect("layer just pushed").endpoint {
            Endpoint::Route(route) => route,
            _ => unreachable!("layer just pushed is a route"),
        }
    }

    /// Registers a handler for one method and path. Shorthand for
    /// `self.route(path).on(method, handler)`.
    pub fn on<H>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Handler<'a>,
    {
        self.route(path).on(method, handler);
        self
    }

    pub fn get<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn patch<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn head<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Head, path, handler)
    }

    pub fn options<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.on(Method::Options, path, handler)
    }

    /// Registers a handler for every method on `path`.
    pub fn all<H: for<'a> Handler<'a>>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(path).all(handler);
        self
    }

    /// Registers a parameter preprocessor for `name`.
    ///
    /// Whenever a dispatched layer captures `:name`, every preprocessor
    /// registered for it runs, in registration order, before the layer's
    /// handler — at most once per distinct captured value per request.
    ///
    /// # Panics
    ///
    /// Panics when `name` is empty. A preprocessor for nothing is a
    /// registration-time programming error, caught where it is written.
    pub fn param<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: for<'a> ParamHandler<'a>,
    {
        assert!(!name.is_empty(), "argument name is required");
        self.params
            .entry(name.to_owned())
            .or_default()
            .push(erase_param(handler));
        self
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Dispatches one request through the stack.
    ///
    /// This mirrors the shape of a normal handler, which is what makes
    /// routers nestable. Interpreting the outcome:
    ///
    /// - `res.finished()` — a layer completed the response; send it.
    /// - [`Flow::Fail`] — the stack was exhausted with an error still in
    ///   flight; the caller owns the failure response.
    /// - [`Flow::Next`] with an unfinished response — nothing matched;
    ///   the caller owns the not-found response.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Flow {
        self.dispatch_inner(req, res).await
    }

    /// Boxed recursion point. Each nesting level is one heap-allocated
    /// future, so mount depth never grows the native stack unboundedly.
    fn dispatch_inner<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> Pin<Box<dyn Future<Output = Flow> + Send + 'a>> {
        Box::pin(async move {
            let entry_params = std::mem::take(req.params_mut());
            let mut called: HashMap<String, ParamCalled> = HashMap::new();
            let mut error: Option<RouteError> = None;
            // Allowed methods gathered from routes that matched the path
            // but not the method, for the automatic OPTIONS response.
            let mut options: Vec<Method> = Vec::new();
            let protohost_len = protohost(req.url()).len();

            for layer in &self.stack {
                if res.finished() {
                    *req.params_mut() = entry_params;
                    return Flow::Next;
                }

                let path = req.path().to_owned();
                let matched = match layer.matches(&path) {
                    Ok(m) => m,
                    Err(e) => {
                        // Decode failure: the layer is skipped and the
                        // failure goes in flight unless one already is.
                        error.get_or_insert(e);
                        continue;
                    }
                };
                let Some(matched) = matched else { continue };

                if let Endpoint::Route(route) = &layer.endpoint {
                    // Routes do not match while an error is in flight: their
                    // error layers live inside the chain, and a route passed
                    // over during propagation contributes nothing to the
                    // automatic OPTIONS response either.
                    if error.is_some() {
                        continue;
                    }
                    if !route.handles_method(req.method()) {
                        if req.method() == Method::Options {
                            append_methods(&mut options, route.allowed_methods());
                        }
                        continue;
                    }
                } else {
                    match &layer.endpoint {
                        Endpoint::Handle(_) | Endpoint::Mount(_) if error.is_some() => continue,
                        Endpoint::Catch(_) if error.is_none() => continue,
                        _ => {}
                    }
                }

                debug!(path = layer.path(), url = req.url(), "dispatching layer");

                // The layer's captures become the request's params for the
                // duration of this layer.
                *req.params_mut() = matched.params.iter().cloned().collect();

                match self.process_params(&matched.params, &mut called, req, res).await {
                    Flow::Next => {}
                    Flow::SkipRoute => continue,
                    Flow::Fail(e) => {
                        // An in-flight error outranks a preprocessing one.
                        error.get_or_insert(e.normalized());
                        continue;
                    }
                }

                // Trim the mount prefix for the duration of this layer.
                let saved_url = if layer.pattern.trims() && matched.matched_len > 0 {
                    let url = req.url().to_owned();
                    let rest = &url[protohost_len + matched.matched_len..];
                    let trimmed = if protohost_len == 0 && !rest.starts_with('/') {
                        format!("/{rest}")
                    } else {
                        format!("{}{}", &url[..protohost_len], rest)
                    };
                    debug!(from = %url, to = %trimmed, "trim mount prefix");
                    req.set_url(trimmed);
                    Some(url)
                } else {
                    None
                };

                let flow = match &layer.endpoint {
                    Endpoint::Handle(h) => {
                        diagnostics::publish(REQUEST_CHANNEL, &LayerEvent {
                            request: req,
                            response: res,
                            layer_path: layer.path(),
                            error: None,
                        });
                        h.call(req, res).await
                    }
                    Endpoint::Catch(h) => {
                        let err = error.take().unwrap_or_default();
                        diagnostics::publish(ERROR_CHANNEL, &LayerEvent {
                            request: req,
                            response: res,
                            layer_path: layer.path(),
                            error: Some(&err),
                        });
                        h.call(&err, req, res).await
                    }
                    Endpoint::Route(route) => route.dispatch(req, res).await,
                    Endpoint::Mount(router) => router.dispatch_inner(req, res).await,
                };

                if let Some(url) = saved_url {
                    req.set_url(url);
                }
                if res.finished() {
                    *req.params_mut() = entry_params;
                    return Flow::Next;
                }
                match flow {
                    // Outside a route, a skip is just a continue.
                    Flow::Next | Flow::SkipRoute => error = None,
                    Flow::Fail(e) => error = Some(e.normalized()),
                }
            }

            *req.params_mut() = entry_params;

            if let Some(e) = error {
                return Flow::Fail(e);
            }

            // Stack exhausted cleanly: synthesize the OPTIONS response if
            // any route matched the path. An explicit OPTIONS layer would
            // have completed the response before reaching here.
            if req.method() == Method::Options && !options.is_empty() {
                let allow = options
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                res.set_status(200);
                res.header("Allow", allow.clone());
                res.end(allow);
            }

            Flow::Next
        })
    }

    /// Runs the registered preprocessors for each captured parameter, in
    /// capture declaration order, memoizing per (name, value) so a chain
    /// runs at most once per distinct value per request.
    async fn process_params(
        &self,
        captured: &[(String, String)],
        called: &mut HashMap<String, ParamCalled>,
        req: &mut Request,
        res: &mut Response,
    ) -> Flow {
        if self.params.is_empty() {
            return Flow::Next;
        }

        for (name, _) in captured {
            let Some(handlers) = self.params.get(name) else { continue };
            let Some(value) = req.param(name).map(str::to_owned) else { continue };

            if let Some(prior) = called.get(name) {
                // Replay on an identical value; a failure replays on any
                // value, a skip only on an identical one.
                let replay =
                    prior.matched == value || matches!(prior.outcome, ParamOutcome::Fail(_));
                if replay {
                    req.set_param(name.clone(), prior.value.clone());
                    match prior.outcome.clone() {
                        ParamOutcome::Ok => continue,
                        ParamOutcome::Skip => return Flow::SkipRoute,
                        ParamOutcome::Fail(e) => return Flow::Fail(e),
                    }
                }
            }

            debug!(name = %name, value = %value, "resolving param");
            let mut outcome = ParamOutcome::Ok;
            for handler in handlers {
                match handler.call(req, res, &value).await {
                    Flow::Next => {}
                    Flow::SkipRoute => {
                        outcome = ParamOutcome::Skip;
                        break;
                    }
                    Flow::Fail(e) => {
                        outcome = ParamOutcome::Fail(e.normalized());
                        break;
                    }
                }
            }

            let kept = req.param(name).map_or_else(|| value.clone(), str::to_owned);
            called.insert(
                name.clone(),
                ParamCalled { matched: value, value: kept, outcome: outcome.clone() },
            );
            match outcome {
                ParamOutcome::Ok => {}
                ParamOutcome::Skip => return Flow::SkipRoute,
                ParamOutcome::Fail(e) => return Flow::Fail(e),
            }
        }

        Flow::Next
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `methods` to `into`, keeping first appearance order, no
/// duplicates.
fn append_methods(into: &mut Vec<Method>, methods: Vec<Method>) {
    for m in methods {
        if !into.contains(&m) {
            into.push(m);
        }
    }
}
