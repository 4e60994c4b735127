//! Middleware chain integration tests.
//!
//! These tests check the chain's contract end to end:
//!
//! 1. Steps run in declaration order and see earlier additions
//! 2. The final context is the union of all additions
//! 3. The first failure stops the chain
//! 4. Collisions, plain errors and panics are classified correctly

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keystone_core::{
    Additions, ContextValue, DomainError, InputChannels, PipelineError, RequestContext,
    RequestHead, ResponseHandle,
};
use keystone_middleware::{FnMiddleware, Middleware, MiddlewareChain};
use serde_json::{json, Value};

fn context() -> RequestContext {
    let head = RequestHead::new(
        http::Method::POST,
        "/orders".parse().unwrap(),
        http::HeaderMap::new(),
    );
    RequestContext::new(
        head,
        ResponseHandle::new(),
        InputChannels {
            params: ContextValue::new(json!({})),
            body: ContextValue::new(json!({"sku": "A-1"})),
            query: ContextValue::new(json!({})),
            cookies: ContextValue::new(json!({})),
        },
    )
}

fn adds(name: &'static str, key: &'static str, value: u32) -> impl Middleware {
    FnMiddleware::new(name, move |_ctx: RequestContext| {
        std::future::ready(Ok::<_, anyhow::Error>(Additions::new().with(key, value)))
    })
}

#[tokio::test]
async fn test_three_disjoint_steps_are_all_visible() {
    let chain = MiddlewareChain::new()
        .with(adds("one", "a", 1))
        .with(adds("two", "b", 2))
        .with(adds("three", "c", 3));

    let ctx = chain.run(context()).await.unwrap();

    assert_eq!(ctx.get::<u32>("a"), Some(&1));
    assert_eq!(ctx.get::<u32>("b"), Some(&2));
    assert_eq!(ctx.get::<u32>("c"), Some(&3));
    assert_eq!(ctx.body::<Value>().unwrap()["sku"], "A-1");
    for key in ["req", "res", "body", "query", "params", "cookies"] {
        assert!(ctx.contains_key(key), "missing reserved key {key}");
    }
}

#[tokio::test]
async fn test_steps_see_earlier_additions() {
    let chain = MiddlewareChain::new()
        .with(adds("base", "base", 10))
        .with(FnMiddleware::new("double", |ctx: RequestContext| async move {
            let base = *ctx.require::<u32>("base")?;
            Ok::<_, anyhow::Error>(Additions::new().with("double", base * 2))
        }));

    let ctx = chain.run(context()).await.unwrap();
    assert_eq!(ctx.get::<u32>("double"), Some(&20));
}

#[tokio::test]
async fn test_collision_aborts_with_step_name() {
    let chain = MiddlewareChain::new()
        .with(adds("first", "user", 1))
        .with(adds("second", "user", 2));

    let err = chain.run(context()).await.unwrap_err();
    match &err {
        PipelineError::Collision { step, source } => {
            assert_eq!(step, "second");
            assert_eq!(source.key, "user");
        }
        other => panic!("expected collision, got {other:?}"),
    }
    assert!(err.is_internal());
}

#[tokio::test]
async fn test_reserved_key_collision() {
    let chain = MiddlewareChain::new().with(adds("sneaky", "body", 0));
    let err = chain.run(context()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Collision { .. }));
}

#[tokio::test]
async fn test_domain_error_stops_later_steps() {
    let later_runs = Arc::new(AtomicUsize::new(0));
    let counter = later_runs.clone();

    let chain = MiddlewareChain::new()
        .with(FnMiddleware::new("auth", |_ctx: RequestContext| async {
            Err::<Additions, _>(DomainError::unauthorized("Missing token"))
        }))
        .with(FnMiddleware::new("later", move |_ctx: RequestContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>(Additions::new()) }
        }));

    let err = chain.run(context()).await.unwrap_err();
    match err {
        PipelineError::Domain(domain) => assert_eq!(domain.code().as_u16(), 401),
        other => panic!("expected domain error, got {other:?}"),
    }
    assert_eq!(later_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_plain_error_is_unexpected() {
    let chain = MiddlewareChain::new().with(FnMiddleware::new("db", |_ctx: RequestContext| async {
        Err::<Additions, _>(anyhow::anyhow!("connection refused"))
    }));

    let err = chain.run(context()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Unexpected(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_panic_is_caught() {
    let chain = MiddlewareChain::new().with(FnMiddleware::new("bad", |_ctx: RequestContext| async {
        if true {
            panic!("step exploded");
        }
        Ok::<_, anyhow::Error>(Additions::new())
    }));

    let err = chain.run(context()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Unexpected(_)));
    assert!(err.to_string().contains("step exploded"));
}

#[tokio::test]
async fn test_empty_chain_returns_context_unchanged() {
    let ctx = MiddlewareChain::new().run(context()).await.unwrap();
    assert_eq!(ctx.len(), 6);
}
