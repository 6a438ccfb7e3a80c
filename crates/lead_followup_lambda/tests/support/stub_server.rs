use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Throwaway upstream that answers every request with a canned reply.
pub struct StubServer {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    pub async fn spawn(status: u16, reply: Value) -> Self {
        Self::spawn_delayed(status, reply, Duration::ZERO).await
    }

    /// Holds every reply back by `delay`.
    pub async fn spawn_delayed(status: u16, reply: Value, delay: Duration) -> Self {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status: StatusCode::from_u16(status).expect("valid status code"),
            reply,
            delay,
            recorded: recorded.clone(),
        };
        let app = Router::new()
            .fallback(record_and_reply)
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub listener should bind");
        let addr: SocketAddr = listener.local_addr().expect("stub address");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        Self {
            base_url: format!("http://{addr}"),
            recorded,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().expect("poisoned mutex").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn record_and_reply(
    State(state): State<StubState>,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .recorded
        .lock()
        .expect("poisoned mutex")
        .push(RecordedRequest {
            path: uri.path().to_string(),
            query,
            authorization,
            body,
        });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, Json(state.reply))
}
