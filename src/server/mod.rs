//! HTTP transport for the command protocol.
//!
//! The transport is deliberately thin: one POST route whose body is a
//! single command line. It talks to the core through exactly two calls,
//! parse-and-execute and format, and translates the result into a
//! `text/plain` response with status 200 or 400. Identity comes from the
//! `X-Client-Name` header; everything else is the engine's business.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use tracing::{info, warn};

use crate::command::CommandProcessor;
use crate::protocol::response;

/// Request header carrying the caller identity; its value partitions
/// transaction state.
const CLIENT_HEADER: &str = "X-Client-Name";

/// Configuration for the linekv server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,

    /// Directory holding the store image, lock sentinel, and transaction
    /// records.
    pub data_dir: PathBuf,
}

/// The linekv server: engine stack plus HTTP front end.
pub struct LinekvServer {
    config: ServerConfig,
    processor: Arc<CommandProcessor>,
}

impl LinekvServer {
    /// Opens the engine under the configured data directory.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let processor = CommandProcessor::open(&config.data_dir)?;
        Ok(Self { config, processor })
    }

    /// Serves requests until the shutdown future resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/", post(handle_command))
            .with_state(self.processor);

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        info!("Listening on http://{}", self.config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Resolves the client id. An absent or unreadable header yields a fresh
/// random 128-bit hex id, so anonymous callers get no transaction
/// continuity between requests. The value is caller-supplied and passed
/// through as-is; the transaction engine rejects ids that cannot safely
/// name a record file.
fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}

async fn handle_command(
    State(processor): State<Arc<CommandProcessor>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let client = client_id(&headers);

    // Store operations block on file I/O and lock backoff, so they run on
    // the blocking pool rather than a runtime worker.
    let outcome = tokio::task::spawn_blocking(move || {
        processor
            .parse_and_execute(&body, &client)
            .map(|outcome| response::format_success(&outcome))
            .map_err(|error| response::format_error(&error))
    })
    .await;

    match outcome {
        Ok(Ok(text)) => (StatusCode::OK, text),
        Ok(Err(text)) => (StatusCode::BAD_REQUEST, text),
        Err(e) => {
            warn!("Command task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ERR \"internal error\"".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_id_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-name", HeaderValue::from_static("client-7"));
        assert_eq!(client_id(&headers), "client-7");
    }

    #[test]
    fn test_anonymous_client_ids_are_fresh() {
        let headers = HeaderMap::new();
        let first = client_id(&headers);
        let second = client_id(&headers);
        assert_eq!(first.len(), 32);
        assert_ne!(first, second);
    }
}
