//! # Keystone Test
//!
//! In-memory testing for Keystone applications. Requests go straight into
//! [`keystone::App::handle`], through routing, validation, middleware and
//! the handler, without binding a port.
//!
//! ## Example
//!
//! ```
//! use keystone::prelude::*;
//! use keystone_test::TestClient;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let routes = RouteCollection::new()
//!     .route(
//!         Route::post("/users")
//!             .body(ObjectSchema::new().required("name", FieldType::String))
//!             .handle(|ctx: RequestContext| async move {
//!                 let body = ctx.body::<serde_json::Map<String, serde_json::Value>>().cloned();
//!                 Ok::<_, DomainError>(body)
//!             }),
//!     )
//!     .unwrap();
//! let client = TestClient::new(App::new(&routes).unwrap());
//!
//! client
//!     .post("/users")
//!     .json(&json!({ "name": "Alice" }))
//!     .send()
//!     .await
//!     .assert_status(200)
//!     .assert_json_field("name", &json!("Alice"));
//!
//! client
//!     .post("/users")
//!     .json(&json!({}))
//!     .send()
//!     .await
//!     .assert_error("BAD_REQUEST", 400);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/keystone-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
