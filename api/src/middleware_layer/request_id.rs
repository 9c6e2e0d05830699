use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse the caller's `X-Request-Id` or mint one, and echo it on the response.
///
/// Handlers read the id from the request headers for their log lines.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let value = incoming_id(req.headers()).unwrap_or_else(generate_id);
    req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(REQUEST_ID_HEADER, value);
    res
}

/// Id for log lines, `-` when absent.
pub fn request_id_of(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}

fn incoming_id(headers: &HeaderMap) -> Option<HeaderValue> {
    let value = headers.get(REQUEST_ID_HEADER)?;
    let text = value.to_str().ok()?;
    (!text.trim().is_empty()).then(|| value.clone())
}

fn generate_id() -> HeaderValue {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    HeaderValue::from_str(&format!("req-{nanos}"))
        .unwrap_or_else(|_| HeaderValue::from_static("req-unknown"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_incoming_id_is_ignored() {
        let mut headers = HeaderMap::new();
        assert!(incoming_id(&headers).is_none());

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  "));
        assert!(incoming_id(&headers).is_none());

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-1"));
        assert_eq!(incoming_id(&headers).unwrap(), "abc-1");
        assert_eq!(request_id_of(&headers), "abc-1");
    }

    #[test]
    fn header_lookup_ignores_name_case() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::HeaderName::from_bytes(b"X-Request-Id").unwrap(),
            HeaderValue::from_static("trace-7"),
        );
        assert_eq!(request_id_of(&headers), "trace-7");
        assert_eq!(incoming_id(&headers).unwrap(), "trace-7");
    }

    #[test]
    fn generated_ids_are_prefixed() {
        let id = generate_id();
        assert!(id.to_str().unwrap().starts_with("req-"));
    }
}
