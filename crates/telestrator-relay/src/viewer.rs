//! HTTP side: the `/img` MJPEG endpoint and optional static files.

use std::convert::Infallible;
use std::path::Path;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt as _;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::fanout::{FanoutHandle, MULTIPART_CONTENT_TYPE};

/// Path passive viewers (e.g. an OBS browser source) subscribe on.
pub const SNAPSHOT_PATH: &str = "/img";

pub fn router(fanout: FanoutHandle, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new().route(SNAPSHOT_PATH, get(snapshot_stream));
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    router
        .with_state(fanout)
        .layer(TraceLayer::new_for_http())
}

/// GET /img - long-lived multipart stream, one part per received frame.
async fn snapshot_stream(State(fanout): State<FanoutHandle>) -> Response {
    let parts = ReceiverStream::new(fanout.subscribe()).map(Ok::<_, Infallible>);
    debug!("Snapshot viewer connected");

    (
        [
            (header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "close"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}
