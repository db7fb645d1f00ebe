use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller-supplied ids longer than this are replaced with a generated one.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn accept_request_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic())
}

/// Tags every request with an id (the caller's `x-request-id` when usable,
/// otherwise a fresh UUID), echoes it on the response, and records it on the
/// request's tracing span.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| accept_request_id(v))
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut res = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_request_ids() {
        assert!(accept_request_id("req-123"));
        assert!(accept_request_id(&Uuid::new_v4().to_string()));
    }

    #[test]
    fn rejects_empty_long_or_spaced_request_ids() {
        assert!(!accept_request_id(""));
        assert!(!accept_request_id(&"a".repeat(MAX_REQUEST_ID_LEN + 1)));
        assert!(!accept_request_id("has space"));
    }
}
