//! Minimal trellis example — layered routing, params, and error handling.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc          # guard skips to 404
//!   curl -X OPTIONS -i http://localhost:3000/users/42
//!   curl http://localhost:3000/admin/stats
//!   curl http://localhost:3000/boom
//!   curl http://localhost:3000/healthz

use trellis::{Flow, Request, Response, RouteError, Router, Server, health};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // A sub-application mounted under /admin. It sees URLs with the
    // /admin prefix already stripped.
    let mut admin = Router::new();
    admin.get("/stats", stats);

    let mut app = Router::new();
    app.layer(log_request);
    app.param("id", require_numeric_id);
    app.get("/users/:id", get_user);
    app.delete("/users/:id", delete_user);
    app.mount("/admin", admin);
    app.get("/boom", boom);
    app.catch(explain_error);
    app.get("/healthz", health::liveness);
    app.get("/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// Runs for every request, before anything matches.
async fn log_request(req: &mut Request, _res: &mut Response) -> Flow {
    tracing::info!(method = %req.method(), url = req.url(), "incoming");
    Flow::Next
}

// Param preprocessor: non-numeric ids skip the route entirely, so
// /users/abc falls through to the terminal 404 instead of reaching the
// handler.
async fn require_numeric_id(req: &mut Request, _res: &mut Response, value: &str) -> Flow {
    if value.chars().all(|c| c.is_ascii_digit()) {
        req.set_param("id", value);
        Flow::Next
    } else {
        Flow::SkipRoute
    }
}

async fn get_user(req: &mut Request, res: &mut Response) -> Flow {
    let id = req.param("id").unwrap_or("unknown");
    res.header("content-type", "application/json");
    res.end(format!(r#"{{"id":"{id}","name":"alice"}}"#));
    Flow::Next
}

async fn delete_user(_req: &mut Request, res: &mut Response) -> Flow {
    res.set_status(204);
    res.end("");
    Flow::Next
}

async fn stats(_req: &mut Request, res: &mut Response) -> Flow {
    res.end("admin stats");
    Flow::Next
}

async fn boom(_req: &mut Request, _res: &mut Response) -> Flow {
    Flow::fail("boom")
}

// Error layer: turns any in-flight error into a friendly page instead of
// letting the terminal responder write the bare error text.
async fn explain_error(err: &RouteError, _req: &mut Request, res: &mut Response) -> Flow {
    res.set_status(err.status().unwrap_or(500));
    res.end(format!("something went wrong: {}", err.message()));
    Flow::Next
}
