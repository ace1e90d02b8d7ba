//! Dispatch diagnostics channels.
//!
//! The channels are process-wide, so every subscriber here filters on a
//! URL prefix unique to its own test before recording anything.

use std::sync::{Arc, Mutex};

use trellis::diagnostics::{self, ERROR_CHANNEL, REQUEST_CHANNEL};
use trellis::{Flow, Method, Request, Response, RouteError, Router};

async fn run(router: &Router, method: Method, url: &str) -> (Response, Flow) {
    let mut req = Request::new(method, url);
    let mut res = Response::new();
    let flow = router.dispatch(&mut req, &mut res).await;
    (res, flow)
}

async fn noop(_req: &mut Request, _res: &mut Response) -> Flow {
    Flow::Next
}

async fn saw(req: &mut Request, res: &mut Response) -> Flow {
    res.end(format!("saw {} {}", req.method(), req.url()));
    Flow::Next
}

async fn boom(_req: &mut Request, _res: &mut Response) -> Flow {
    Flow::fail("boom")
}

async fn recover(err: &RouteError, _req: &mut Request, res: &mut Response) -> Flow {
    res.set_status(500);
    res.end(format!("caught: {err}"));
    Flow::Next
}

#[tokio::test]
async fn request_events_fire_before_each_normal_layer() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let record = Arc::clone(&seen);
    let sub = diagnostics::subscribe(REQUEST_CHANNEL, move |event| {
        if event.layer_path.starts_with("/obs-req") {
            assert!(event.error.is_none());
            record.lock().unwrap().push(event.layer_path.to_owned());
        }
    });

    let mut router = Router::new();
    router.layer_at("/obs-req/scope", noop);
    router.get("/obs-req/scope/users", saw);

    let (res, _) = run(&router, Method::Get, "/obs-req/scope/users").await;
    assert!(res.finished());
    assert_eq!(
        *seen.lock().unwrap(),
        ["/obs-req/scope", "/obs-req/scope/users"]
    );

    sub.unsubscribe();
    let _ = run(&router, Method::Get, "/obs-req/scope/users").await;
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn error_events_carry_the_in_flight_error() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let record = Arc::clone(&seen);
    let sub = diagnostics::subscribe(ERROR_CHANNEL, move |event| {
        if event.request.url().starts_with("/obs-err") {
            let err = event.error.map(ToString::to_string).unwrap_or_default();
            assert!(!event.response.finished());
            record.lock().unwrap().push(err);
        }
    });

    let mut router = Router::new();
    router.get("/obs-err/panel", boom);
    router.catch(recover);

    let (res, _) = run(&router, Method::Get, "/obs-err/panel").await;
    assert_eq!(res.body_str(), "caught: Error: boom");
    assert_eq!(*seen.lock().unwrap(), ["Error: boom"]);

    sub.unsubscribe();
}

#[tokio::test]
async fn a_quiet_dispatch_publishes_nothing_on_the_error_channel() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let record = Arc::clone(&seen);
    let sub = diagnostics::subscribe(ERROR_CHANNEL, move |event| {
        if event.request.url().starts_with("/obs-quiet") {
            record.lock().unwrap().push(event.layer_path.to_owned());
        }
    });

    let mut router = Router::new();
    router.get("/obs-quiet/users", saw);
    router.catch(recover);

    let (res, _) = run(&router, Method::Get, "/obs-quiet/users").await;
    assert!(res.finished());
    assert!(seen.lock().unwrap().is_empty());

    sub.unsubscribe();
}
