//! # trellis
//!
//! A layered HTTP request router. An ordered stack of handlers, matched by
//! path and method, executed in registration order, with explicit control
//! flow between them. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Every handler finishes by returning a [`Flow`]:
//!
//! - [`Flow::Next`] — advance to the next matching layer.
//! - [`Flow::SkipRoute`] — abandon the rest of the current route; later
//!   routes stay eligible.
//! - [`Flow::Fail`] — put a [`RouteError`] in flight; normal layers are
//!   skipped until an error layer (registered through [`Router::catch`] or
//!   [`Route::catch`]) consumes it.
//!
//! A handler that calls [`Response::end`] completes the response and stops
//! the dispatch. If the stack runs out first, control returns to whoever
//! invoked the router — the [`Server`] turns that into a 404 or an error
//! page; an embedder calling [`Router::dispatch`] directly applies its own
//! policy. Because `dispatch` has the same shape as a handler, routers
//! nest: see [`Router::mount`].
//!
//! What the router does for you along the way:
//!
//! - **Parameter preprocessing** — [`Router::param`] functions run when a
//!   `:name` segment is captured, once per distinct value per request.
//! - **Automatic OPTIONS** — an OPTIONS request with no explicit OPTIONS
//!   layer is answered with the methods registered on matching routes.
//! - **HEAD via GET** — a HEAD request reuses the GET chain when no
//!   explicit HEAD layer exists.
//! - **Mount trimming** — a mounted subtree sees its path prefix stripped
//!   from the URL and restored afterward; query strings and absolute-form
//!   authorities are never touched.
//! - **Diagnostics** — [`diagnostics`] publishes observational events
//!   before each layer runs and before each error is handled.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{Flow, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Router::new();
//!     app.get("/users/:id", get_user);
//!     app.post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: &mut Request, res: &mut Response) -> Flow {
//!     let id = req.param("id").unwrap_or("unknown");
//!     res.header("content-type", "application/json");
//!     res.end(format!(r#"{{"id":"{id}"}}"#));
//!     Flow::Next
//! }
//!
//! async fn create_user(req: &mut Request, res: &mut Response) -> Flow {
//!     if req.body().is_empty() {
//!         res.set_status(400);
//!         res.end("missing body");
//!     } else {
//!         res.set_status(201);
//!         res.header("location", "/users/99");
//!         res.end("created");
//!     }
//!     Flow::Next
//! }
//! ```

mod error;
mod flow;
mod handler;
mod layer;
mod method;
mod pattern;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod diagnostics;
pub mod health;

pub use error::{Error, RouteError};
pub use flow::Flow;
pub use handler::{ErrorHandler, Handler, ParamHandler};
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use route::Route;
pub use router::Router;
pub use server::Server;
