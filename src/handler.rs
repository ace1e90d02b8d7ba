//! Handler traits and type erasure.
//!
//! # Three handler classes, decided at registration
//!
//! The dispatcher distinguishes handlers by *which trait they were
//! registered through*, never by inspecting their shape at runtime:
//!
//! - [`Handler`] — a normal layer: `(&mut Request, &mut Response) -> Flow`.
//!   Skipped whenever an error is in flight.
//! - [`ErrorHandler`] — an error layer:
//!   `(&RouteError, &mut Request, &mut Response) -> Flow`. Skipped unless
//!   an error is in flight.
//! - [`ParamHandler`] — a parameter preprocessor:
//!   `(&mut Request, &mut Response, &str) -> Flow`, the `&str` being the
//!   decoded captured value.
//!
//! # How async handlers are stored
//!
//! The layer stack holds handlers of *different* concrete types, so each is
//! boxed behind an erased dispatch trait. The chain from user code to
//! vtable call:
//!
//! ```text
//! async fn hello(req: &mut Request, res: &mut Response) -> Flow { … }
//!        ↓ router.get("/", hello)
//! Box::new(FnHandler(hello))               stored as Box<dyn ErasedHandler>
//!        ↓ at dispatch time
//! handler.call(req, res)                   one vtable call
//!        ↓
//! Box::pin(hello(req, res))                a BoxFuture the dispatcher awaits
//! ```
//!
//! The traits carry a lifetime parameter because handler futures borrow
//! their request and response for the duration of one invocation. Any
//! `async fn` with the right signature satisfies the higher-ranked bound
//! `for<'a> Handler<'a>` through the blanket impls below.

use std::future::Future;
use std::pin::Pin;

use crate::error::RouteError;
use crate::flow::Flow;
use crate::request::Request;
use crate::response::Response;

/// A heap-allocated, type-erased future borrowing its invocation for `'a`.
pub(crate) type BoxFuture<'a> = Pin<Box<dyn Future<Output = Flow> + Send + 'a>>;

// ── Public handler traits ─────────────────────────────────────────────────────

/// Implemented for every valid normal-layer handler.
///
/// You never implement this yourself: the blanket impl covers any
/// `async fn(&mut Request, &mut Response) -> Flow` (and any `Fn` returning
/// a `Send` future of `Flow`). Registration surfaces take
/// `H: for<'a> Handler<'a>`.
pub trait Handler<'a>: Send + Sync + 'static {
    type Future: Future<Output = Flow> + Send + 'a;

    fn call(&'a self, req: &'a mut Request, res: &'a mut Response) -> Self::Future;
}

impl<'a, F, Fut> Handler<'a> for F
where
    F: Fn(&'a mut Request, &'a mut Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'a,
{
    type Future = Fut;

    fn call(&'a self, req: &'a mut Request, res: &'a mut Response) -> Fut {
        self(req, res)
    }
}

/// Implemented for every valid error-layer handler:
/// `async fn(&RouteError, &mut Request, &mut Response) -> Flow`.
pub trait ErrorHandler<'a>: Send + Sync + 'static {
    type Future: Future<Output = Flow> + Send + 'a;

    fn call(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> Self::Future;
}

impl<'a, F, Fut> ErrorHandler<'a> for F
where
    F: Fn(&'a RouteError, &'a mut Request, &'a mut Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'a,
{
    type Future = Fut;

    fn call(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> Fut {
        self(err, req, res)
    }
}

/// Implemented for every valid parameter preprocessor:
/// `async fn(&mut Request, &mut Response, &str) -> Flow`.
pub trait ParamHandler<'a>: Send + Sync + 'static {
    type Future: Future<Output = Flow> + Send + 'a;

    fn call(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        value: &'a str,
    ) -> Self::Future;
}

impl<'a, F, Fut> ParamHandler<'a> for F
where
    F: Fn(&'a mut Request, &'a mut Response, &'a str) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'a,
{
    type Future = Fut;

    fn call(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        value: &'a str,
    ) -> Fut {
        self(req, res, value)
    }
}

// ── Erased dispatch interfaces ────────────────────────────────────────────────

pub(crate) trait ErasedHandler: Send + Sync {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a>;
}

pub(crate) trait ErasedErrorHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a>;
}

pub(crate) trait ErasedParamHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        value: &'a str,
    ) -> BoxFuture<'a>;
}

pub(crate) type BoxedHandler = Box<dyn ErasedHandler>;
pub(crate) type BoxedErrorHandler = Box<dyn ErasedErrorHandler>;
pub(crate) type BoxedParamHandler = Box<dyn ErasedParamHandler>;

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype bridging a concrete handler to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: for<'a> Handler<'a>,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a> {
        Box::pin(Handler::call(&self.0, req, res))
    }
}

struct FnErrorHandler<F>(F);

impl<F> ErasedErrorHandler for FnErrorHandler<F>
where
    F: for<'a> ErrorHandler<'a>,
{
    fn call<'a>(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a> {
        Box::pin(ErrorHandler::call(&self.0, err, req, res))
    }
}

struct FnParamHandler<F>(F);

impl<F> ErasedParamHandler for FnParamHandler<F>
where
    F: for<'a> ParamHandler<'a>,
{
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        value: &'a str,
    ) -> BoxFuture<'a> {
        Box::pin(ParamHandler::call(&self.0, req, res, value))
    }
}

pub(crate) fn erase<H: for<'a> Handler<'a>>(handler: H) -> BoxedHandler {
    Box::new(FnHandler(handler))
}

pub(crate) fn erase_error<H: for<'a> ErrorHandler<'a>>(handler: H) -> BoxedErrorHandler {
    Box::new(FnErrorHandler(handler))
}

pub(crate) fn erase_param<H: for<'a> ParamHandler<'a>>(handler: H) -> BoxedParamHandler {
    Box::new(FnParamHandler(handler))
}
