//! In-process HTTP client for the router.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Drives the router through `oneshot`, no socket involved.
pub struct TestClient {
    app: Router,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.get_with_headers(uri, std::iter::empty::<(&str, &str)>()).await
    }

    pub async fn get_with_headers<'a>(
        &self,
        uri: &str,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> TestResponse {
        let request = headers
            .into_iter()
            .fold(Request::get(uri), |builder, (name, value)| {
                builder.header(name, value)
            })
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes().to_vec();

        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// Fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({}): {}", e, self.body_lossy()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn body_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            self.body_lossy()
        );
        self
    }

    /// Checks the `origin` field of a dataset response.
    pub fn assert_origin(&self, expected: &str) -> &Self {
        assert_eq!(self.json()["origin"], expected, "unexpected dataset origin");
        self
    }

    pub fn assert_header_exists(&self, name: &str) -> &Self {
        assert!(self.headers.contains_key(name), "missing header '{}'", name);
        self
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header '{}'", name);
        self
    }
}
