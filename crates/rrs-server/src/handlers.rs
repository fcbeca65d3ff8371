//! Operation handlers.
//!
//! Each handler resolves the request's storage path, applies the access
//! policy, calls the object store, and maps the outcome to a response.
//! Handlers hold no state between requests.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use rrs_protocol::{
    is_create_confirmed, repository_layout, resolve_blob_path, resolve_type_path, ObjectRef,
    ObjectType, Operation, ProtocolError, Route,
};
use rrs_store::{ObjectReader, StoreError};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, error, info, warn};

use crate::body::{IdleTimeout, MeteredStream};
use crate::error::{ServerError, ServerResult};
use crate::metrics::MetricLabels;
use crate::state::AppState;

/// Everything a handler needs to know about one request.
pub struct RequestContext {
    pub route: Route,
    /// Basic-auth user, or empty.
    pub user: String,
    /// First value of the `create` query parameter, if any.
    pub create: Option<String>,
}

impl RequestContext {
    fn labels(&self) -> MetricLabels {
        MetricLabels::new(
            self.user.clone(),
            self.route.repo_prefix(),
            self.route.type_label(),
        )
    }
}

/// Run the routed operation and map its outcome to a response.
pub async fn handle(state: &AppState, ctx: RequestContext, body: Body) -> Response {
    let op = ctx.route.operation.name();
    if state.debug() {
        debug!(operation = op, repo = ctx.route.repo_prefix(), "handling request");
    }

    let result = match &ctx.route.operation {
        Operation::CheckExists(target) => check_exists(state, &ctx, target).await,
        Operation::Get(target) => get(state, &ctx, target).await,
        Operation::Put(target) => put(state, &ctx, target, body).await,
        Operation::Delete(target) => delete(state, &ctx, target).await,
        Operation::List { object_type } => list(state, &ctx, object_type).await,
        Operation::CreateRepository => create_repository(state, &ctx).await,
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            if state.debug() {
                debug!(operation = op, error = %e, "request failed");
            }
            e.into_response()
        }
    }
}

/// Storage path of the config file or of a named object.
pub fn object_path(route: &Route, target: &ObjectRef) -> ServerResult<String> {
    let repo = route.repo_prefix();
    let path = match &target.name {
        None => resolve_type_path(repo, &target.object_type)?,
        Some(name) => resolve_blob_path(repo, &target.object_type, name)?,
    };
    Ok(path)
}

/// Missing objects become 404; anything else is a storage failure.
fn missing_or_internal(err: StoreError, path: &str) -> ServerError {
    match err {
        StoreError::NotFound(_) | StoreError::IsADirectory(_) | StoreError::NotADirectory(_) => {
            ServerError::NotFound(path.to_string())
        }
        other => ServerError::Store(other),
    }
}

fn content_length(size: u64) -> [(header::HeaderName, HeaderValue); 1] {
    [(header::CONTENT_LENGTH, HeaderValue::from(size))]
}

async fn check_exists(
    state: &AppState,
    ctx: &RequestContext,
    target: &ObjectRef,
) -> ServerResult<Response> {
    let path = object_path(&ctx.route, target)?;
    let meta = state
        .store
        .stat(&path)
        .await
        .map_err(|e| missing_or_internal(e, &path))?;
    Ok((StatusCode::OK, content_length(meta.size)).into_response())
}

async fn get(state: &AppState, ctx: &RequestContext, target: &ObjectRef) -> ServerResult<Response> {
    let path = object_path(&ctx.route, target)?;
    let (meta, reader) = state
        .store
        .open(&path)
        .await
        .map_err(|e| missing_or_internal(e, &path))?;

    let stream = MeteredStream::new(
        IdleTimeout::new(ReaderStream::new(reader), state.config.idle_timeout()),
        Arc::clone(&state.metrics),
        ctx.labels(),
    );
    Ok((
        StatusCode::OK,
        content_length(meta.size),
        Body::from_stream(stream),
    )
        .into_response())
}

async fn put(
    state: &AppState,
    ctx: &RequestContext,
    target: &ObjectRef,
    body: Body,
) -> ServerResult<Response> {
    let path = object_path(&ctx.route, target)?;
    let object_type: ObjectType = target.object_type.parse()?;
    if !state.access_mode().allows_write(object_type) {
        return Err(ServerError::Forbidden(path));
    }

    let incoming = IdleTimeout::new(
        body.into_data_stream().map_err(io::Error::other),
        state.config.idle_timeout(),
    );
    let reader: ObjectReader = Box::pin(StreamReader::new(incoming));
    let written = state
        .store
        .put(&path, reader)
        .await
        .map_err(|e| match e {
            StoreError::Io(err) if err.kind() == io::ErrorKind::TimedOut => ServerError::Timeout,
            other => ServerError::Store(other),
        })?;
    state.metrics.record_write(&ctx.labels(), written);
    Ok(StatusCode::OK.into_response())
}

async fn delete(
    state: &AppState,
    ctx: &RequestContext,
    target: &ObjectRef,
) -> ServerResult<Response> {
    let path = object_path(&ctx.route, target)?;
    let object_type: ObjectType = target.object_type.parse()?;
    if !state.access_mode().allows_delete(object_type) {
        return Err(ServerError::Forbidden(path));
    }

    let meta = state
        .store
        .stat(&path)
        .await
        .map_err(|e| missing_or_internal(e, &path))?;
    state
        .store
        .remove(&path)
        .await
        .map_err(|e| missing_or_internal(e, &path))?;
    state.metrics.record_delete(&ctx.labels(), meta.size);
    Ok(StatusCode::OK.into_response())
}

/// Names of the objects of one type, as a JSON array.
///
/// `data` is listed shard by shard, so names come out ordered by shard and
/// then by name within the shard.
async fn list(state: &AppState, ctx: &RequestContext, object_type: &str) -> ServerResult<Response> {
    let t: ObjectType = object_type.parse()?;
    if t.is_single_file() {
        return Err(ProtocolError::NotACollection(object_type.to_string()).into());
    }
    let dir = resolve_type_path(ctx.route.repo_prefix(), object_type)?;
    let listing_failed = |e: StoreError| {
        warn!(dir = %dir, error = %e, "listing failed");
        ServerError::NotFound(dir.clone())
    };

    let entries = state.store.list(&dir).await.map_err(listing_failed)?;
    let mut names = Vec::new();
    if t.is_sharded() {
        for shard in entries.iter().filter(|e| e.is_dir()) {
            let blobs = state.store.list(&shard.path).await.map_err(listing_failed)?;
            names.extend(
                blobs
                    .iter()
                    .filter(|e| !e.is_dir())
                    .map(|e| e.name().to_string()),
            );
        }
    } else {
        names.extend(
            entries
                .iter()
                .filter(|e| !e.is_dir())
                .map(|e| e.name().to_string()),
        );
    }
    Ok(Json(names).into_response())
}

/// Create the repository layout. Every directory is created even if it
/// exists, so a partially created repository can be completed by retrying.
async fn create_repository(state: &AppState, ctx: &RequestContext) -> ServerResult<Response> {
    if !is_create_confirmed(ctx.create.as_deref()) {
        return Err(ServerError::BadRequest(
            "repository creation requires create=true".into(),
        ));
    }
    let repo = ctx.route.repo_prefix();
    for dir in repository_layout(repo)? {
        if let Err(e) = state.store.mkdir(&dir).await {
            error!(dir = %dir, error = %e, "failed to create repository directory");
            return Err(e.into());
        }
    }
    info!(repo, "repository created");
    Ok(StatusCode::OK.into_response())
}
