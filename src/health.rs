//! Built-in health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can it serve traffic? Failure → pulled from rotation. |
//!
//! Register them like any other handler:
//!
//! ```rust
//! use trellis::{Router, health};
//!
//! let mut app = Router::new();
//! app.get("/healthz", health::liveness)
//!    .get("/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler to gate on dependency
//! availability (database connections, downstream services).

use crate::{Flow, Request, Response};

/// Liveness probe handler.
///
/// Always `200 OK` with body `"ok"`. If the process can respond to HTTP at
/// all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness(_req: &mut Request, res: &mut Response) -> Flow {
    res.end("ok");
    Flow::Next
}

/// Readiness probe handler (default implementation).
///
/// Always `200 OK` with body `"ready"`. Swap in your own handler if the
/// application needs a warm-up period or must verify dependencies first.
pub async fn readiness(_req: &mut Request, res: &mut Response) -> Flow {
    res.end("ready");
    Flow::Next
}
