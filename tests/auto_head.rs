//! HEAD falls back to the GET chain when no explicit HEAD layer exists.

use trellis::{Flow, Method, Request, Response, Router};

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

async fn set_hit_2(_req: &mut Request, res: &mut Response) -> Flow {
    res.header("x-fn-2", "hit");
    Flow::Next
}

#[tokio::test]
async fn head_reuses_the_get_chain() {
    let mut router = Router::new();
    router.route("/users").get(set_hit_1).get(saw);

    let (res, _) = run(&router, Method::Head, "/users").await;
    assert!(res.finished());
    assert_eq!(res.status(), 200);
    assert_eq!(res.get_header("content-type"), Some("text/plain"));
    assert_eq!(res.get_header("x-fn-1"), Some("hit"));
}

#[tokio::test]
async fn explicit_head_route_wins_over_get() {
    let mut router = Router::new();
    router.route("/users").head(set_hit_1).head(saw);
    router.route("/users").get(set_hit_2).get(saw);

    let (res, _) = run(&router, Method::Head, "/users").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.get_header("x-fn-1"), Some("hit"));
    assert_eq!(res.get_header("x-fn-2"), None);
}
