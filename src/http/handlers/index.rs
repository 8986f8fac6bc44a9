use std::io;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use log::{debug, info, warn};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    http::server::AppState,
    params::{self, Overrides},
    stream::{self, ChannelSink, ChunkPlan},
};

const LOG_TARGET: &str = "trickle::handler";

/// `GET /`: streams a body shaped by the `length`, `unit` and `time` query
/// parameters.
pub async fn handle_index(State(state): State<AppState>, query: Option<Query<Vec<(String, String)>>>) -> Response {
    // Waits here while every slot is busy streaming.
    let Ok(permit) = state.slots.clone().acquire_owned().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let overrides = query
        .map(|Query(pairs)| Overrides::from_pairs(pairs))
        .unwrap_or_default();

    let mut rng = state.seeds.next_rng();
    let params = params::resolve(&overrides, &state.limits, &mut rng);
    info!(
        target: LOG_TARGET,
        "| Response: length = {} [byte], unit = {} [byte], time = {} [sec]", params.length, params.unit, params.duration
    );
    if params.length < 0 {
        warn!(target: LOG_TARGET, "Negative length {} requested, sending an empty body", params.length);
    }

    let plan = ChunkPlan::new(&params);
    let headers = [
        (header::CONTENT_TYPE, "text/plain".to_string()),
        (header::CONTENT_LENGTH, plan.content_length().to_string()),
    ];
    if plan.chunk_count() == 0 {
        return (StatusCode::OK, headers, Body::empty()).into_response();
    }

    let (mut sink, source) = ChannelSink::pair();
    let write_timeout = state.write_timeout;
    tokio::spawn(async move {
        let outcome = tokio::time::timeout(write_timeout, stream::stream(&plan, &mut sink, &mut rng)).await;
        drop(permit);
        match outcome {
            Ok(Ok(written)) => debug!(target: LOG_TARGET, "Response complete: {} bytes", written),
            Ok(Err(e)) => debug!(target: LOG_TARGET, "Response aborted: {}", e),
            Err(_) => {
                warn!(target: LOG_TARGET, "Write timeout of {:?} exceeded, dropping response", write_timeout);
                sink.abort(io::Error::new(io::ErrorKind::TimedOut, "write timeout exceeded"))
                    .await;
            },
        }
    });

    (StatusCode::OK, headers, Body::from_stream(ReceiverStream::new(source))).into_response()
}
