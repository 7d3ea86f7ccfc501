//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size check, rule
//! resolution, view invocation and access logging.

use crate::app::App;
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{allow_header, percent_decode, Resolution};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let access = state
        .access_log_enabled()
        .then(|| AccessLogEntry::from_request(&req, peer_addr));

    let response = match check_body_size(&req, state.config.http.max_body_size) {
        Some(resp) => resp,
        None => dispatch(&state.app, req.method(), req.uri().path()),
    };
    let response = http::with_server_header(response, &state.config.http.server_name);

    if let Some(entry) = access {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        let entry = entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &state.access_log_format);
    }

    Ok(response)
}

/// Resolve a request against the application and produce its response
pub fn dispatch(app: &App, method: &Method, raw_path: &str) -> Response<Full<Bytes>> {
    let is_head = *method == Method::HEAD;
    let path = percent_decode(raw_path);

    match app.routes().resolve(method, &path) {
        Resolution::Matched { route, params } => match (route.target())(&params) {
            Ok(body) => http::build_text_response(body, is_head),
            Err(e) => {
                tracing::error!(endpoint = route.endpoint(), %path, error = %e, "view failed");
                http::build_500_response(is_head)
            }
        },
        Resolution::Options { allowed } => http::build_options_response(&allow_header(&allowed)),
        Resolution::MethodNotAllowed { allowed } => {
            tracing::debug!(%method, %path, "method not allowed");
            http::build_405_response(&allow_header(&allowed), is_head)
        }
        Resolution::NotFound => {
            tracing::debug!(%method, %path, "no rule matched");
            http::build_404_response(is_head)
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            tracing::warn!("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                tracing::warn!(size, max_body_size, "request body too large");
                Some(http::build_413_response())
            }
            Err(_) => {
                tracing::warn!(value = size_str, "invalid Content-Length value, skipping size check");
                None
            }
            _ => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_app;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{ALLOW, SERVER};
    use hyper::StatusCode;

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Response<Full<Bytes>> {
        let app = create_app(None).unwrap();
        dispatch(&app, &Method::GET, path)
    }

    fn state() -> Arc<AppState> {
        let cfg = Config::from_toml("[logging]\naccess_log = false\n[http]\nmax_body_size = 16").unwrap();
        let app = create_app(Some(&cfg.app)).unwrap();
        Arc::new(AppState::new(cfg, app))
    }

    #[tokio::test]
    async fn test_index() {
        let response = get("/");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Hello Flask!");
    }

    #[tokio::test]
    async fn test_add() {
        let response = get("/add/2/3");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "2 + 3 = 6");
    }

    #[tokio::test]
    async fn test_add_sample_grid() {
        for (a, b) in [(0_i64, 0_i64), (1, 1), (40, 2), (999_999, 1), (123, 0)] {
            let response = get(&format!("/add/{a}/{b}"));
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_string(response).await, format!("{a} + {b} = {}", a + b + 1));
        }
    }

    #[test]
    fn test_non_integer_is_404() {
        assert_eq!(get("/add/2/foo").status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/add/foo/2").status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/add/2").status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/add/2/3/").status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/nothing-here").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_negative_is_404() {
        assert_eq!(get("/add/-1/5").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let response = get("/add/%32/3");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "2 + 3 = 6");
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let app = create_app(None).unwrap();
        let first = body_string(dispatch(&app, &Method::GET, "/add/7/8")).await;
        for _ in 0..5 {
            let again = body_string(dispatch(&app, &Method::GET, "/add/7/8")).await;
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn test_head() {
        let app = create_app(None).unwrap();
        let response = dispatch(&app, &Method::HEAD, "/");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "12");
        assert_eq!(body_string(response).await, "");
    }

    #[test]
    fn test_post_is_405() {
        let app = create_app(None).unwrap();
        let response = dispatch(&app, &Method::POST, "/");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD, OPTIONS");

        let response = dispatch(&app, &Method::DELETE, "/add/1/2");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_options() {
        let app = create_app(None).unwrap();
        let response = dispatch(&app, &Method::OPTIONS, "/add/1/2");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD, OPTIONS");

        let response = dispatch(&app, &Method::OPTIONS, "/add/x/2");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handle_request_sets_server_header() {
        let state = state();
        let req = Request::get("/add/1/1").body(()).unwrap();
        let response = handle_request(req, Arc::clone(&state), "127.0.0.1:4000".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[SERVER], state.config.http.server_name.as_str());
        assert_eq!(body_string(response).await, "1 + 1 = 3");
    }

    #[tokio::test]
    async fn test_handle_request_rejects_large_body() {
        let req = Request::post("/")
            .header(CONTENT_LENGTH, "17")
            .body(())
            .unwrap();
        let response = handle_request(req, state(), "127.0.0.1:4000".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_check_body_size_ignores_garbage() {
        let req = Request::post("/")
            .header(CONTENT_LENGTH, "lots")
            .body(())
            .unwrap();
        assert!(check_body_size(&req, 16).is_none());
    }
}
