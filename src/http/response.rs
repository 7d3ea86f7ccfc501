//! HTTP response building module
//!
//! Builders for the handful of responses the dispatcher produces. View output
//! and error pages are HTML; `HEAD` keeps headers and drops the body.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Build 200 response carrying view output
pub fn build_text_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    build_html(StatusCode::OK, content, is_head, None)
}

/// Build 404 Not Found response
pub fn build_404_response(is_head: bool) -> Response<Full<Bytes>> {
    build_html(
        StatusCode::NOT_FOUND,
        error_page(
            StatusCode::NOT_FOUND,
            "The requested URL was not found on the server. If you entered the URL manually please check your spelling and try again.",
        ),
        is_head,
        None,
    )
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str, is_head: bool) -> Response<Full<Bytes>> {
    build_html(
        StatusCode::METHOD_NOT_ALLOWED,
        error_page(
            StatusCode::METHOD_NOT_ALLOWED,
            "The method is not allowed for the requested URL.",
        ),
        is_head,
        Some(allow),
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_html(
        StatusCode::PAYLOAD_TOO_LARGE,
        error_page(
            StatusCode::PAYLOAD_TOO_LARGE,
            "The data value transmitted exceeds the capacity limit.",
        ),
        false,
        None,
    )
}

/// Build 500 Internal Server Error response
pub fn build_500_response(is_head: bool) -> Response<Full<Bytes>> {
    build_html(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "The server encountered an internal error and was unable to complete your request.",
        ),
        is_head,
        None,
    )
}

/// Build automatic OPTIONS response
pub fn build_options_response(allow: &str) -> Response<Full<Bytes>> {
    build_html(StatusCode::OK, String::new(), false, Some(allow))
}

/// Stamp the `Server` header on an outgoing response
pub fn with_server_header(mut response: Response<Full<Bytes>>, server_name: &str) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(e) => {
            tracing::warn!(server_name, error = %e, "server name is not a valid header value");
        }
    }
    response
}

/// Render the HTML page used for error statuses
pub fn error_page(status: StatusCode, description: &str) -> String {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!doctype html>\n<html lang=en>\n<title>{code} {reason}</title>\n<h1>{reason}</h1>\n<p>{description}</p>\n"
    )
}

fn build_html(
    status: StatusCode,
    content: String,
    is_head: bool,
    allow: Option<&str>,
) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HTML_CONTENT_TYPE)
        .header(CONTENT_LENGTH, content_length);
    if let Some(allow) = allow {
        builder = builder.header(ALLOW, allow);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status, &e);
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = status;
        fallback
    })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    tracing::error!(%status, %error, "failed to build response");
}
