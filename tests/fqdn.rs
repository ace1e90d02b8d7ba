//! Mount-prefix trimming: absolute-form targets, query strings, and URL
//! restoration after a scoped layer returns.

use trellis::{Flow, Method, Request, Response, Router};

async fn run(router: &Router, method: Method, url: &str) -> (Request, Response, Flow) {
    let mut req = Request::new(method, url);
    let mut res = Response::new();
    let flow = router.dispatch(&mut req, &mut res).await;
    (req, res, flow)
}

/// Every URL a recording layer observed, in order.
#[derive(Clone, Default)]
struct Seen(Vec<String>);

async fn record_url(req: &mut Request, _res: &mut Response) -> Flow {
    let mut seen = req.extensions().get::<Seen>().cloned().unwrap_or_default();
    seen.0.push(req.url().to_owned());
    req.extensions_mut().insert(seen);
    Flow::Next
}

async fn saw(req: &mut Request, res: &mut Response) -> Flow {
    res.end(format!("saw {} {}", req.method(), req.url()));
    Flow::Next
}

fn seen(req: &Request) -> Vec<String> {
    req.extensions().get::<Seen>().cloned().unwrap_or_default().0
}

#[tokio::test]
async fn does_not_obscure_absolute_form_targets() {
    let mut router = Router::new();
    router.layer(record_url);

    let (req, res, flow) = run(&router, Method::Get, "http://example.com/foo").await;
    assert!(matches!(flow, Flow::Next));
    assert!(!res.finished());
    assert_eq!(seen(&req), ["http://example.com/foo"]);
}

#[tokio::test]
async fn trims_a_scoped_prefix() {
    let mut router = Router::new();
    router.layer_at("/blog", record_url);

    let (req, _, _) = run(&router, Method::Get, "/blog/post/1").await;
    assert_eq!(seen(&req), ["/post/1"]);
}

#[tokio::test]
async fn trims_a_scoped_prefix_in_absolute_form() {
    let mut router = Router::new();
    router.layer_at("/blog", record_url);

    let (req, _, _) = run(&router, Method::Get, "http://example.com/blog/post/1").await;
    assert_eq!(seen(&req), ["http://example.com/post/1"]);
}

#[tokio::test]
async fn an_exact_prefix_match_leaves_the_root() {
    let mut router = Router::new();
    router.layer_at("/blog", record_url);

    let (req, _, _) = run(&router, Method::Get, "/blog").await;
    assert_eq!(seen(&req), ["/"]);
}

#[tokio::test]
async fn the_query_string_survives_trimming() {
    let mut router = Router::new();
    router.layer_at("/blog", record_url);

    let (req, _, _) = run(&router, Method::Get, "/blog/post/1?page=2").await;
    assert_eq!(seen(&req), ["/post/1?page=2"]);
}

#[tokio::test]
async fn restores_the_url_after_a_scoped_layer() {
    let mut router = Router::new();
    router.layer_at("/blog", record_url);
    router.layer(record_url);

    let (req, _, _) = run(&router, Method::Get, "/blog/post/1").await;
    assert_eq!(seen(&req), ["/post/1", "/blog/post/1"]);
}

#[tokio::test]
async fn a_mounted_router_sees_the_trimmed_url() {
    let mut blog = Router::new();
    blog.layer(record_url);

    let mut router = Router::new();
    router.mount("/blog", blog);
    router.layer(record_url);

    let (req, _, _) = run(&router, Method::Get, "http://example.com/blog/post/1").await;
    assert_eq!(
        seen(&req),
        ["http://example.com/post/1", "http://example.com/blog/post/1"]
    );
}

#[tokio::test]
async fn mounts_nest() {
    let mut leaf = Router::new();
    leaf.get("/users", saw);

    let mut inner = Router::new();
    inner.mount("/v1", leaf);

    let mut router = Router::new();
    router.mount("/api", inner);

    let (_, res, _) = run(&router, Method::Get, "/api/v1/users").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_str(), "saw GET /users");

    let (_, res, flow) = run(&router, Method::Get, "/api/v2/users").await;
    assert!(!res.finished());
    assert!(matches!(flow, Flow::Next));
}
