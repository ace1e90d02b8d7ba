//! A route: the handler chains for one path pattern, organized by method.

use crate::diagnostics::{self, ERROR_CHANNEL, LayerEvent, REQUEST_CHANNEL};
use crate::error::RouteError;
use crate::flow::Flow;
use crate::handler::{
    BoxedErrorHandler, BoxedHandler, ErrorHandler, Handler, erase, erase_error,
};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

enum RouteEndpoint {
    Handle(BoxedHandler),
    Catch(BoxedErrorHandler),
}

struct RouteLayer {
    /// `None` for all-method and error layers.
    method: Option<Method>,
    endpoint: RouteEndpoint,
}

/// The handler chains registered for one path pattern.
///
/// Obtained from [`Router::route`](crate::Router::route); every per-method
/// registration on the owning router also creates one of these under the
/// hood. Methods chain:
///
/// ```rust
/// use trellis::{Flow, Request, Response, Router};
///
/// async fn list(_req: &mut Request, res: &mut Response) -> Flow {
///     res.end("users");
///     Flow::Next
/// }
/// # async fn create(_req: &mut Request, res: &mut Response) -> Flow {
/// #     res.end("created");
/// #     Flow::Next
/// # }
///
/// let mut router = Router::new();
/// router.route("/users").get(list).post(create);
/// ```
pub struct Route {
    path: String,
    stack: Vec<RouteLayer>,
    /// Explicitly registered methods, first-registration order, no "all".
    methods: Vec<Method>,
    all: bool,
}

impl Route {
    pub(crate) fn new(path: &str) -> Self {
        Self { path: path.to_owned(), stack: Vec::new(), methods: Vec::new(), all: false }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Appends a handler for one specific method.
    pub fn on<H>(&mut self, method: Method, handler: H) -> &mut Self
    where
        H: for<'a> Handler<'a>,
    {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self.stack.push(RouteLayer {
            method: Some(method),
            endpoint: RouteEndpoint::Handle(erase(handler)),
        });
        self
    }

    /// Appends a handler that runs for every method.
    pub fn all<H>(&mut self, handler: H) -> &mut Self
    where
        H: for<'a> Handler<'a>,
    {
        self.all = true;
        self.stack.push(RouteLayer {
            method: None,
            endpoint: RouteEndpoint::Handle(erase(handler)),
        });
        self
    }

    /// Appends an error handler. It runs, for any method, only while an
    /// error raised earlier in this route's chain is in flight.
    pub fn catch<H>(&mut self, handler: H) -> &mut Self
    where
        H: for<'a> ErrorHandler<'a>,
    {
        self.stack.push(RouteLayer {
            method: None,
            endpoint: RouteEndpoint::Catch(erase_error(handler)),
        });
        self
    }

    pub fn get<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Get, handler)
    }

    pub fn post<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Post, handler)
    }

    pub fn put<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Put, handler)
    }

    pub fn delete<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Delete, handler)
    }

    pub fn patch<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Patch, handler)
    }

    pub fn head<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Head, handler)
    }

    pub fn options<H: for<'a> Handler<'a>>(&mut self, handler: H) -> &mut Self {
        self.on(Method::Options, handler)
    }

    /// True when a request with `method` would run at least one layer here.
    /// HEAD is handled whenever GET is, even without an explicit HEAD layer.
    pub(crate) fn handles_method(&self, method: Method) -> bool {
        if self.all || self.methods.contains(&method) {
            return true;
        }
        method == Method::Head && self.methods.contains(&Method::Get)
    }

    /// The explicitly registered methods, de-duplicated, in
    /// first-registration order, with HEAD inserted immediately after GET
    /// when GET is present and HEAD is not. All-method layers do not
    /// contribute. This is what the automatic OPTIONS response advertises.
    pub(crate) fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = self.methods.clone();
        if let Some(i) = methods.iter().position(|m| *m == Method::Get)
            && !methods.contains(&Method::Head)
        {
            methods.insert(i + 1, Method::Head);
        }
        methods
    }

    /// Runs this route's chain for the request.
    ///
    /// A HEAD request with no explicit HEAD layer reuses the GET chain, so
    /// HEAD response semantics match GET here (body suppression is the
    /// transport's concern). A [`Flow::SkipRoute`] from any handler
    /// abandons the rest of the chain without an error; an in-flight error
    /// skips forward to the next error layer of this same chain.
    pub(crate) async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Flow {
        let mut method = req.method();
        if method == Method::Head && !self.methods.contains(&Method::Head) {
            method = Method::Get;
        }

        let mut error: Option<RouteError> = None;

        for layer in &self.stack {
            if res.finished() {
                return Flow::Next;
            }
            if let Some(m) = layer.method
                && m != method
            {
                continue;
            }

            let flow = match (&layer.endpoint, &error) {
                (RouteEndpoint::Handle(h), None) => {
                    diagnostics::publish(REQUEST_CHANNEL, &LayerEvent {
                        request: req,
                        response: res,
                        layer_path: &self.path,
                        error: None,
                    });
                    h.call(req, res).await
                }
                (RouteEndpoint::Catch(h), Some(_)) => {
                    let err = error.take().unwrap_or_default();
                    diagnostics::publish(ERROR_CHANNEL, &LayerEvent {
                        request: req,
                        response: res,
                        layer_path: &self.path,
                        error: Some(&err),
                    });
                    h.call(&err, req, res).await
                }
                // Normal layer with an error in flight, or an error layer
                // with nothing to catch.
                _ => continue,
            };

            if res.finished() {
                return Flow::Next;
            }
            match flow {
                Flow::Next => error = None,
                Flow::SkipRoute => return Flow::Next,
                Flow::Fail(e) => error = Some(e.normalized()),
            }
        }

        match error {
            Some(e) => Flow::Fail(e),
            None => Flow::Next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Route;
    use crate::flow::Flow;
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::Response;

    async fn noop(_req: &mut Request, _res: &mut Response) -> Flow {
        Flow::Next
    }

    #[test]
    fn allowed_methods_inserts_head_after_get() {
        let mut route = Route::new("/users");
        route.delete(noop).get(noop).put(noop);
        assert_eq!(
            route.allowed_methods(),
            vec![Method::Delete, Method::Get, Method::Head, Method::Put]
        );
    }

    #[test]
    fn allowed_methods_dedupes_and_keeps_registration_order() {
        let mut route = Route::new("/users");
        route.get(noop).put(noop).get(noop);
        assert_eq!(
            route.allowed_methods(),
            vec![Method::Get, Method::Head, Method::Put]
        );
    }

    #[test]
    fn allowed_methods_excludes_all_layers() {
        let mut route = Route::new("/users");
        route.get(noop).all(noop);
        assert_eq!(route.allowed_methods(), vec![Method::Get, Method::Head]);
    }

    #[test]
    fn explicit_head_suppresses_the_insertion() {
        let mut route = Route::new("/users");
        route.head(noop).get(noop);
        assert_eq!(route.allowed_methods(), vec![Method::Head, Method::Get]);
    }

    #[test]
    fn head_is_handled_through_get() {
        let mut route = Route::new("/users");
        route.get(noop);
        assert!(route.handles_method(Method::Head));
        assert!(route.handles_method(Method::Get));
        assert!(!route.handles_method(Method::Post));
    }

    #[test]
    fn all_handles_every_method() {
        let mut route = Route::new("/users");
        route.all(noop);
        assert!(route.handles_method(Method::Options));
        assert!(route.handles_method(Method::Patch));
    }
}
