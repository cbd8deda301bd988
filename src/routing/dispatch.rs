use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::{forward, health, llm, probe, settings};
use crate::state::AppState;

const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteMatch {
    Health,
    Llm,
    ConnectionTest,
    Forward,
    GetSettings,
    PutSettings,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching relay handler.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());
    tracing::trace!(method = %parts.method, path = parts.uri.path(), ?route, "dispatch");

    let response = match route {
        RouteMatch::Health => health::health_handler(State(state)).into_response(),
        RouteMatch::GetSettings => settings::get_handler(State(state), &parts.headers),
        RouteMatch::Llm | RouteMatch::ConnectionTest | RouteMatch::Forward | RouteMatch::PutSettings => {
            let body_bytes = match read_request_body(body).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            match route {
                RouteMatch::Llm => llm::handler(State(state), parts.headers, body_bytes).await,
                RouteMatch::ConnectionTest => {
                    probe::handler(State(state), parts.headers, body_bytes).await
                }
                RouteMatch::Forward => {
                    forward::handler(State(state), parts.headers, body_bytes).await
                }
                _ => settings::put_handler(State(state), &parts.headers, &body_bytes),
            }
        }
        RouteMatch::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        RouteMatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    };

    Ok(response)
}

async fn read_request_body(body: Body) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, DEFAULT_BODY_LIMIT_BYTES)
        .await
        .map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large (max 2MiB)",
            )
                .into_response()
        })
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    match path {
        "/" => only(method, &Method::GET, RouteMatch::Health),
        "/v1/llm" => only(method, &Method::POST, RouteMatch::Llm),
        "/v1/test" => only(method, &Method::POST, RouteMatch::ConnectionTest),
        "/v1/forward" => only(method, &Method::POST, RouteMatch::Forward),
        "/v1/settings" => {
            if method == Method::GET {
                RouteMatch::GetSettings
            } else if method == Method::PUT {
                RouteMatch::PutSettings
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        _ => RouteMatch::NotFound,
    }
}

fn only(method: &Method, allowed: &Method, route: RouteMatch) -> RouteMatch {
    if method == allowed {
        route
    } else {
        RouteMatch::MethodNotAllowed
    }
}
