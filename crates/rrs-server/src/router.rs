use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use rrs_protocol::{endpoints, Route, Verb};
use tower_http::trace::TraceLayer;

use crate::access_log;
use crate::auth::{self, request_user, CredentialValidator};
use crate::error::status_response;
use crate::handlers::{self, RequestContext};
use crate::state::AppState;

/// First value of the `create` query parameter.
///
/// Any query string is accepted; only repository creation ever looks at
/// the result.
fn create_param(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Option<String> {
    let Query(pairs) = query.ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == endpoints::CREATE_PARAM)
        .map(|(_, value)| value)
}

fn verb(method: &Method) -> Option<Verb> {
    match *method {
        Method::HEAD => Some(Verb::Head),
        Method::GET => Some(Verb::Get),
        Method::POST => Some(Verb::Post),
        Method::DELETE => Some(Verb::Delete),
        _ => None,
    }
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Body,
) -> Response {
    let Some(verb) = verb(&method) else {
        return status_response(StatusCode::METHOD_NOT_ALLOWED);
    };
    let Some(route) = Route::parse(verb, uri.path()) else {
        return status_response(StatusCode::NOT_FOUND);
    };
    let ctx = RequestContext {
        route,
        user: request_user(&headers),
        create: create_param(query),
    };
    handlers::handle(&state, ctx, body).await
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Some(text) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        None => status_response(StatusCode::NOT_FOUND),
    }
}

/// Build the axum router with every repository endpoint.
///
/// Routes are matched by [`Route::parse`] rather than by path patterns, so
/// the optional repository segment is decided once per request. With
/// `credentials` set, every route requires basic authentication.
pub fn build_router(
    state: AppState,
    credentials: Option<Arc<dyn CredentialValidator>>,
) -> Router {
    let mut router = Router::new();
    if state.config.metrics {
        router = router.route(endpoints::METRICS, get(metrics));
    }
    let access_log = state.access_log.clone();

    let mut router = router
        .route("/", any(dispatch))
        .route("/*path", any(dispatch))
        .with_state(state);

    if let Some(validator) = credentials {
        router = router.layer(middleware::from_fn_with_state(validator, auth::basic_auth));
    }
    if let Some(log) = access_log {
        router = router.layer(middleware::from_fn_with_state(log, access_log::record));
    }
    router.layer(TraceLayer::new_for_http())
}
