//! Automatic OPTIONS response synthesis.

use trellis::{Flow, Method, Request, Response, RouteError, Router};

async fn run(router: &Router, method: Method, url: &str) -> (Response, Flow) {
    let mut req = Request::new(method, url);
    let mut res = Response::new();
    let flow = router.dispatch(&mut req, &mut res).await;
    (res, flow)
}

async fn saw(req: &mut Request, res: &mut Response) -> Flow {
    let msg = format!("saw {} {}", req.method(), req.url());
    res.set_status(200);
    res.header("content-type", "text/plain");
    res.end(msg);
    Flow::Next
}

async fn set_hit_1(_req: &mut Request, res: &mut Response) -> Flow {
    res.header("x-fn-1", "hit");
    Flow::Next
}

#[tokio::test]
async fn responds_with_defined_routes() {
    let mut router = Router::new();
    router.delete("/", saw);
    router.get("/users", saw);
    router.post("/users", saw);
    router.put("/users", saw);

    let (res, _) = run(&router, Method::Options, "/users").await;
    assert!(res.finished());
    assert_eq!(res.status(), 200);
    assert_eq!(res.get_header("Allow"), Some("GET, HEAD, POST, PUT"));
    assert_eq!(res.body_str(), "GET, HEAD, POST, PUT");
}

#[tokio::test]
async fn does_not_repeat_methods() {
    let mut router = Router::new();
    router.delete("/", saw);
    router.get("/users", saw);
    router.put("/users", saw);
    router.get("/users", saw);

    let (res, _) = run(&router, Method::Options, "/users").await;
    assert_eq!(res.get_header("Allow"), Some("GET, HEAD, PUT"));
    assert_eq!(res.body_str(), "GET, HEAD, PUT");
}

#[tokio::test]
async fn excludes_all_method_routes_but_still_runs_them() {
    let mut router = Router::new();
    router.get("/", saw);
    router.get("/users", saw);
    router.put("/users", saw);
    router.all("/users", set_hit_1);

    let (res, _) = run(&router, Method::Options, "/users").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.get_header("x-fn-1"), Some("hit"));
    assert_eq!(res.get_header("Allow"), Some("GET, HEAD, PUT"));
    assert_eq!(res.body_str(), "GET, HEAD, PUT");
}

#[tokio::test]
async fn does_not_respond_without_a_matching_path() {
    let mut router = Router::new();
    router.get("/users", saw);

    let (res, flow) = run(&router, Method::Options, "/").await;
    assert!(!res.finished());
    assert!(matches!(flow, Flow::Next));
}

async fn boom(_req: &mut Request, _res: &mut Response) -> Flow {
    Flow::fail("boom")
}

async fn swallow(_err: &RouteError, _req: &mut Request, _res: &mut Response) -> Flow {
    Flow::Next
}

#[tokio::test]
async fn routes_passed_over_during_error_propagation_contribute_nothing() {
    let mut router = Router::new();
    router.layer(boom);
    router.get("/users", saw);
    router.catch(swallow);

    // The route was scanned while the error was in flight, so even though
    // the error layer later cleared it, no methods were gathered and no
    // automatic response is synthesized.
    let (res, flow) = run(&router, Method::Options, "/users").await;
    assert!(!res.finished());
    assert!(matches!(flow, Flow::Next));
}

#[tokio::test]
async fn explicit_options_route_takes_precedence() {
    let mut router = Router::new();
    router.get("/users", saw);
    router.options("/users", saw);

    let (res, _) = run(&router, Method::Options, "/users").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_str(), "saw OPTIONS /users");
}
