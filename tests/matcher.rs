//! End-to-end matching through the DFA matcher.

use std::sync::Arc;

use waypoint::error::MatchError;
use waypoint::routing::matching::{
    CandidateSet, DfaMatcher, DfaMatcherBuilder, EndpointSelector, MatchContext, MethodNotAllowed,
};
use waypoint::routing::metadata::{AcceptsMetadata, HostMetadata, HttpMethodMetadata};
use waypoint::routing::{Endpoint, EndpointBuilder};

fn endpoint(template: &str) -> Endpoint {
    EndpointBuilder::parse(template).unwrap().build()
}

fn named(template: &str, name: &str, order: i32) -> Endpoint {
    EndpointBuilder::parse(template)
        .unwrap()
        .display_name(name)
        .order(order)
        .build()
}

fn build(endpoints: impl IntoIterator<Item = Endpoint>) -> DfaMatcher {
    let mut builder = DfaMatcherBuilder::with_defaults();
    builder.add_endpoints(endpoints.into_iter().map(Arc::new));
    builder.build().unwrap()
}

async fn run(matcher: &DfaMatcher, mut ctx: MatchContext) -> MatchContext {
    matcher.match_request(&mut ctx).await.unwrap();
    ctx
}

async fn matched(matcher: &DfaMatcher, path: &str) -> Option<String> {
    run(matcher, MatchContext::new(path))
        .await
        .endpoint
        .map(|e| e.display_name().to_string())
}

fn catalog() -> Vec<Endpoint> {
    vec![
        endpoint("/"),
        endpoint("/products"),
        endpoint("/products/featured"),
        endpoint("/products/{id:int}"),
        endpoint("/products/{id:int}/reviews/{page?}"),
        endpoint("/products/{slug}"),
        endpoint("/images/{name}.{ext}"),
        endpoint("/files/{*path}"),
        endpoint("/{controller}/{action}/{id?}"),
    ]
}

#[tokio::test]
async fn catalog_routes_resolve() {
    let matcher = build(catalog());
    let cases = [
        ("/", Some("/")),
        ("/products", Some("/products")),
        ("/PRODUCTS/Featured", Some("/products/featured")),
        ("/products/42", Some("/products/{id:int}")),
        ("/products/42/", Some("/products/{id:int}")),
        ("/products/shoes", Some("/products/{slug}")),
        ("/products/42/reviews", Some("/products/{id:int}/reviews/{page?}")),
        ("/products/42/reviews/3", Some("/products/{id:int}/reviews/{page?}")),
        ("/images/cat.png", Some("/images/{name}.{ext}")),
        ("/files/a/b/c", Some("/files/{*path}")),
        ("/home/index", Some("/{controller}/{action}/{id?}")),
        ("/a/b/c/d", None),
        ("/single", None),
    ];
    for (path, expected) in cases {
        assert_eq!(matched(&matcher, path).await.as_deref(), expected, "path {path}");
    }
}

#[tokio::test]
async fn registration_order_does_not_change_the_result() {
    let paths = [
        "/", "/products", "/products/featured", "/products/7", "/products/x",
        "/products/7/reviews/2", "/images/a.b", "/files/x/y", "/a/b", "/a/b/c",
    ];
    let forward = build(catalog());
    let backward = build(catalog().into_iter().rev());
    let mut rotated_endpoints = catalog();
    rotated_endpoints.rotate_left(4);
    let rotated = build(rotated_endpoints);

    for path in paths {
        let expected = matched(&forward, path).await;
        assert_eq!(matched(&backward, path).await, expected, "path {path}");
        assert_eq!(matched(&rotated, path).await, expected, "path {path}");
    }
}

#[tokio::test]
async fn concurrent_matching_equals_sequential() {
    let matcher = Arc::new(build(catalog()));
    let paths = ["/products/1", "/products/x", "/files/a/b", "/images/x.y", "/nope/a/b/c"];

    let mut sequential = Vec::new();
    for path in paths {
        sequential.push(matched(&matcher, path).await);
    }

    let mut handles = Vec::new();
    for _ in 0..16 {
        let matcher = Arc::clone(&matcher);
        handles.push(tokio::spawn(async move {
            let mut results = Vec::new();
            for path in paths {
                results.push(matched(&matcher, path).await);
            }
            results
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), sequential);
    }
}

#[tokio::test]
async fn int_constraint_extracts_and_rejects() {
    let matcher = build([endpoint("/products/{id:int}")]);

    let ctx = run(&matcher, MatchContext::new("/products/42")).await;
    assert!(ctx.endpoint.is_some());
    assert_eq!(ctx.route_values.get("id"), Some("42"));
    assert_eq!(ctx.route_values.get_as::<i32>("id"), Some(42));

    let ctx = run(&matcher, MatchContext::new("/products/abc")).await;
    assert!(ctx.endpoint.is_none());
    assert!(ctx.route_values.is_empty());
}

#[tokio::test]
async fn literals_ignore_case_beyond_ascii() {
    let matcher = build([endpoint("/Ä/Straße"), endpoint("/München/{page}")]);
    assert_eq!(matched(&matcher, "/ä/STRAßE").await.as_deref(), Some("/Ä/Straße"));
    assert_eq!(
        matched(&matcher, "/MÜNCHEN/info").await.as_deref(),
        Some("/München/{page}")
    );
    assert_eq!(matched(&matcher, "/a/strasse").await, None);
}

#[tokio::test]
async fn lower_order_wins() {
    let matcher = build([named("/Teams", "teams-1", 1), named("/Teams", "teams-0", 0)]);
    assert_eq!(matched(&matcher, "/teams").await.as_deref(), Some("teams-0"));
}

#[tokio::test]
async fn ambiguity_names_only_the_tied_valid_endpoints() {
    let matcher = build([
        named("/{a:int}", "test1", 0),
        named("/{b}", "test2", 1),
        named("/{c}", "test3", 1),
    ]);

    let mut ctx = MatchContext::new("/x");
    let err = matcher.match_request(&mut ctx).await.unwrap_err();
    let MatchError::Ambiguous(ambiguous) = err else {
        panic!("expected an ambiguity, got {err:?}");
    };
    assert_eq!(ambiguous.endpoints, ["test2 (/{b})", "test3 (/{c})"]);
    assert!(ambiguous.to_string().starts_with("The request matched multiple endpoints."));
    assert!(ctx.endpoint.is_none());

    // The constrained endpoint ranks first when it accepts the value.
    assert_eq!(matched(&matcher, "/5").await.as_deref(), Some("test1"));
}

#[tokio::test]
async fn literal_beats_constrained_parameter() {
    let matcher = build([endpoint("/{p:int}"), endpoint("/1")]);
    assert_eq!(matched(&matcher, "/1").await.as_deref(), Some("/1"));
    assert_eq!(matched(&matcher, "/2").await.as_deref(), Some("/{p:int}"));
    assert_eq!(matched(&matcher, "/One").await, None);
}

#[tokio::test]
async fn catch_all_captures_the_remainder() {
    let matcher = build([endpoint("/files/{*path}")]);

    let ctx = run(&matcher, MatchContext::new("/files/a/b/c")).await;
    assert_eq!(ctx.route_values.get("path"), Some("a/b/c"));

    let ctx = run(&matcher, MatchContext::new("/files")).await;
    assert!(ctx.endpoint.is_some());
    assert_eq!(ctx.route_values.get("path"), None);
}

#[tokio::test]
async fn zero_endpoints_never_match() {
    let matcher = build([]);
    for path in ["", "/", "/a", "/a/b/c"] {
        let mut ctx = MatchContext::new(path);
        matcher.match_request(&mut ctx).await.unwrap();
        assert!(ctx.endpoint.is_none(), "path {path}");
    }
}

#[tokio::test]
async fn defaults_fill_missing_segments() {
    let matcher = build([endpoint("/docs/{page=index}/{format=html}")]);

    let ctx = run(&matcher, MatchContext::new("/docs")).await;
    assert_eq!(ctx.route_values.get("page"), Some("index"));
    assert_eq!(ctx.route_values.get("format"), Some("html"));

    let ctx = run(&matcher, MatchContext::new("/docs/intro")).await;
    assert_eq!(ctx.route_values.get("page"), Some("intro"));
    assert_eq!(ctx.route_values.get("format"), Some("html"));
}

#[tokio::test]
async fn complex_segment_splits_on_last_literal() {
    let matcher = build([endpoint("/images/{name}.{ext}")]);
    let ctx = run(&matcher, MatchContext::new("/images/archive.tar.gz")).await;
    assert_eq!(ctx.route_values.get("name"), Some("archive.tar"));
    assert_eq!(ctx.route_values.get("ext"), Some("gz"));

    assert_eq!(matched(&matcher, "/images/noextension").await, None);
}

#[tokio::test]
async fn method_mismatch_yields_405_endpoint() {
    let matcher = build([
        EndpointBuilder::parse("/orders")
            .unwrap()
            .metadata(HttpMethodMetadata::new(["POST"]))
            .build(),
        EndpointBuilder::parse("/orders")
            .unwrap()
            .display_name("list-orders")
            .metadata(HttpMethodMetadata::new(["GET"]))
            .build(),
    ]);

    let ctx = run(&matcher, MatchContext::new("/orders").with_method("get")).await;
    assert_eq!(ctx.endpoint.unwrap().display_name(), "list-orders");

    let ctx = run(&matcher, MatchContext::new("/orders").with_method("DELETE")).await;
    let endpoint = ctx.endpoint.unwrap();
    let rejection = endpoint.metadata().get_metadata::<MethodNotAllowed>().unwrap();
    assert_eq!(rejection.allowed_methods, ["GET", "POST"]);
}

fn with_methods(template: &str, methods: &[&str]) -> Endpoint {
    let mut builder = EndpointBuilder::parse(template).unwrap();
    if !methods.is_empty() {
        builder = builder.metadata(HttpMethodMetadata::new(methods));
    }
    builder.build()
}

#[tokio::test]
async fn constraint_failures_do_not_decide_405() {
    // `/abc` fails the int constraint, leaving only the GET endpoint in
    // play whether or not the int endpoint restricts methods.
    for int_methods in [&[][..], &["PUT"][..]] {
        let matcher = build([
            with_methods("/{id:int}", int_methods),
            with_methods("/{name}", &["GET"]),
        ]);
        let ctx = run(&matcher, MatchContext::new("/abc").with_method("POST")).await;
        let endpoint = ctx.endpoint.unwrap();
        let rejection = endpoint.metadata().get_metadata::<MethodNotAllowed>().unwrap();
        assert_eq!(rejection.allowed_methods, ["GET"]);
    }
}

#[tokio::test]
async fn host_specific_endpoint_ranks_first() {
    let matcher = build([
        EndpointBuilder::parse("/")
            .unwrap()
            .display_name("any")
            .build(),
        EndpointBuilder::parse("/")
            .unwrap()
            .display_name("api")
            .metadata(HostMetadata::new(["api.example.com"]))
            .build(),
        EndpointBuilder::parse("/")
            .unwrap()
            .display_name("tenant")
            .metadata(HostMetadata::new(["*.example.com:8080"]))
            .build(),
    ]);

    let host = |h: &str| MatchContext::new("/").with_host(h);
    let name = |ctx: MatchContext| ctx.endpoint.map(|e| e.display_name().to_string());

    assert_eq!(name(run(&matcher, host("API.example.com")).await).as_deref(), Some("api"));
    assert_eq!(name(run(&matcher, host("acme.example.com:8080")).await).as_deref(), Some("tenant"));
    assert_eq!(name(run(&matcher, host("acme.example.com")).await).as_deref(), Some("any"));
    assert_eq!(name(run(&matcher, MatchContext::new("/")).await).as_deref(), Some("any"));
}

#[tokio::test]
async fn content_type_selects_endpoint() {
    let matcher = build([
        EndpointBuilder::parse("/upload")
            .unwrap()
            .display_name("json")
            .metadata(AcceptsMetadata::new(["application/json"], false))
            .build(),
        EndpointBuilder::parse("/upload")
            .unwrap()
            .display_name("text")
            .metadata(AcceptsMetadata::new(["text/*"], false))
            .build(),
    ]);

    let upload = |content_type: &str| MatchContext::new("/upload").with_content_type(content_type);
    let name = |ctx: MatchContext| ctx.endpoint.map(|e| e.display_name().to_string());

    assert_eq!(
        name(run(&matcher, upload("application/json; charset=utf-8")).await).as_deref(),
        Some("json")
    );
    assert_eq!(name(run(&matcher, upload("text/csv")).await).as_deref(), Some("text"));
    assert_eq!(
        name(run(&matcher, upload("image/png")).await).as_deref(),
        Some("415 HTTP Unsupported Media Type")
    );
}

/// Takes the lowest ranked valid candidate instead of rejecting ties.
struct LastValid;

#[async_trait::async_trait]
impl EndpointSelector for LastValid {
    async fn select(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError> {
        if let Some((_, candidate)) = candidates.valid().last() {
            ctx.endpoint = Some(Arc::clone(&candidate.endpoint));
            ctx.route_values = candidate.values.clone().unwrap_or_default();
        }
        Ok(())
    }
}

#[tokio::test]
async fn custom_selector_replaces_the_default() {
    let mut builder = DfaMatcherBuilder::with_defaults().with_selector(Arc::new(LastValid));
    builder.add_endpoints(
        [named("/{a}", "first", 0), named("/{b}", "second", 1)]
            .into_iter()
            .map(Arc::new),
    );
    let matcher = builder.build().unwrap();

    let ctx = run(&matcher, MatchContext::new("/x")).await;
    assert_eq!(ctx.endpoint.unwrap().display_name(), "second");
    assert_eq!(ctx.route_values.get("b"), Some("x"));
}
