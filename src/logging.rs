//! Middleware for logging requests and responses.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, header::CONTENT_LENGTH, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};

/// Log the request line and the response status for each request.
///
/// Bodies are not buffered since uploads may be large. Only the declared
/// content type and length are logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    tracing::info!(
        "Received request: {method} {uri} ({})",
        describe_body(request.headers())
    );

    let start = Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        "Sending response: {method} {uri} -> {} ({}) in {}ms",
        response.status(),
        describe_body(response.headers()),
        start.elapsed().as_millis()
    );

    response
}

fn describe_body(headers: &HeaderMap) -> String {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("no content type");

    match headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
    {
        Some(length) => format!("{content_type}, {length} bytes"),
        None => content_type.to_owned(),
    }
}

#[cfg(test)]
mod logging_middleware_tests {
    use axum::{
        Router,
        http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_LENGTH, header::CONTENT_TYPE},
        middleware,
        routing::get,
    };
    use axum_test::TestServer;

    use super::{describe_body, logging_middleware};

    #[tokio::test]
    async fn passes_response_through() {
        let app = Router::new()
            .route("/", get(|| async { (StatusCode::CREATED, "hello") }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server.get("/").await;

        response.assert_status(StatusCode::CREATED);
        response.assert_text("hello");
    }

    #[test]
    fn describes_type_and_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(describe_body(&headers), "no content type");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        assert_eq!(describe_body(&headers), "text/csv");

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(describe_body(&headers), "text/csv, 42 bytes");
    }
}
