use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const X_REQUEST_ID: &str = "x-request-id";

/// Propagate the caller's request ID, or mint one, on both request and response
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let header = HeaderName::from_static(X_REQUEST_ID);
    let request_id = req
        .headers()
        .get(&header)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .cloned()
        .unwrap_or_else(generate);

    req.headers_mut().insert(header.clone(), request_id.clone());

    let mut response = next.run(req).await;
    response.headers_mut().insert(header, request_id);
    response
}

fn generate() -> HeaderValue {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
