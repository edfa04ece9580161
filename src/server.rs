// HTTP front end for the MAC oracle and the forgery attack.
//
// A session is created by `/generate-tag` and lives until it is deleted or
// the process exits. `/verify-tag` is stateless and needs the key.

use crate::{
    api::{
        ErrorResponse, GenerateTagRequest, GenerateTagResponse, RunForgeryRequest,
        RunForgeryResponse, StatusResponse, TagRequest, TagResponse, VerifyTagRequest,
        VerifyTagResponse,
    },
    mac, AttackConfig, ForgeryAttacker, MacError, SessionId, SessionStore,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{info, warn};

use std::sync::Arc;

const GENERATED_LEN: usize = 16;
const STATUS_MESSAGE: &str = "MAC Server is running correctly";

/// Shared state behind every request handler.
#[derive(Debug, Clone)]
pub struct MacService {
    sessions: Arc<SessionStore>,
    attacker: ForgeryAttacker,
}

impl MacService {
    pub fn new(sessions: SessionStore, attack: AttackConfig) -> Self {
        Self {
            sessions: Arc::new(sessions),
            attacker: ForgeryAttacker::new(attack),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(status))
            .route("/generate-tag", post(generate_tag))
            .route("/tag", post(tag))
            .route("/verify-tag", post(verify_tag))
            .route("/run-forgery", post(run_forgery))
            .route("/sessions/:session_id", delete(discard_session))
            .with_state(self)
    }
}

/// Serve `service` on `address` in a background task and return its base
/// URL.
pub async fn spawn_server(
    address: impl ToSocketAddrs,
    service: MacService,
) -> std::io::Result<String> {
    let listener = TcpListener::bind(address).await?;
    let addr = listener.local_addr()?;
    let app = service.router();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("server stopped: {}", e);
        }
    });
    Ok(format!("http://{}", addr))
}

/// A `MacError` on its way back to the client.
///
/// All of them are the client's fault, so none map to a 5xx.
#[derive(Debug)]
pub struct ApiError(MacError);

impl From<MacError> for ApiError {
    fn from(err: MacError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            MacError::UnknownSession(_) => StatusCode::NOT_FOUND,
            MacError::InvalidKey | MacError::InsufficientHistory { .. } => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
    })
}

async fn generate_tag(
    State(service): State<MacService>,
    Json(request): Json<GenerateTagRequest>,
) -> Result<Json<GenerateTagResponse>, ApiError> {
    let sessions = service.sessions();
    let message = or_random(request.message, sessions);
    let key = or_random(request.key, sessions);

    let session_id = sessions.create(&key)?;
    let tag = sessions.tag(&session_id, &message)?;
    info!(%session_id, message_len = message.chars().count(), "created session");

    Ok(Json(GenerateTagResponse {
        message,
        key,
        tag,
        session_id,
    }))
}

async fn tag(
    State(service): State<MacService>,
    Json(request): Json<TagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let (tag, observed) = service
        .sessions()
        .with_oracle(&request.session_id, |oracle| {
            (oracle.get_tag(&request.message), oracle.get_observed().len())
        })?;
    Ok(Json(TagResponse {
        message: request.message,
        tag,
        observed,
    }))
}

async fn verify_tag(
    Json(request): Json<VerifyTagRequest>,
) -> Result<Json<VerifyTagResponse>, ApiError> {
    let computed_tag = mac(&request.key, &request.message)?;
    let is_valid = computed_tag == request.tag;
    Ok(Json(VerifyTagResponse {
        is_valid,
        computed_tag,
    }))
}

async fn run_forgery(
    State(service): State<MacService>,
    Json(request): Json<RunForgeryRequest>,
) -> Result<Json<RunForgeryResponse>, ApiError> {
    let forgery = service
        .sessions()
        .run_forgery(&request.session_id, &service.attacker)?;
    info!(
        session_id = %request.session_id,
        success = forgery.success,
        "forgery attempted"
    );
    Ok(Json(RunForgeryResponse {
        forged_message: forgery.message,
        forged_tag: forgery.tag,
        success: forgery.success,
        attack_steps: forgery.trace,
    }))
}

async fn discard_session(
    State(service): State<MacService>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    service.sessions().discard(&session_id)?;
    info!(%session_id, "discarded session");
    Ok(StatusCode::NO_CONTENT)
}

fn or_random(value: String, sessions: &SessionStore) -> String {
    if value.is_empty() {
        sessions.random_string(GENERATED_LEN)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{ClientError, MacClient};

    use futures::future::join_all;

    async fn spawn_test_server(attack: AttackConfig) -> MacClient {
        let service = MacService::new(SessionStore::seeded(101), attack);
        let address = spawn_server("127.0.0.1:0", service).await.unwrap();
        MacClient::new(&address)
    }

    fn api_status(result: Result<impl std::fmt::Debug, ClientError>) -> u16 {
        match result {
            Err(ClientError::Api { status, .. }) => status,
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_reports_running() {
        let client = spawn_test_server(AttackConfig::default()).await;

        let status = client.status().await.unwrap();

        assert_eq!(status.status, STATUS_MESSAGE);
    }

    #[tokio::test]
    async fn generate_tag_uses_given_message_and_key() {
        let client = spawn_test_server(AttackConfig::default()).await;

        let generated = client
            .generate_tag("helloworld12", "secretkey")
            .await
            .unwrap();

        assert_eq!(generated.message, "helloworld12");
        assert_eq!(generated.key, "secretkey");
        assert_eq!(generated.tag, "pngejbcokrebrl");
        assert_eq!(generated.session_id.as_str().len(), 8);
    }

    #[tokio::test]
    async fn generate_tag_fills_in_missing_values() {
        let client = spawn_test_server(AttackConfig::default()).await;

        let generated = client.generate_tag("", "").await.unwrap();

        assert_eq!(generated.message.len(), 16);
        assert_eq!(generated.key.len(), 16);
        assert_eq!(
            generated.tag,
            mac(&generated.key, &generated.message).unwrap()
        );
    }

    #[tokio::test]
    async fn tag_adds_to_existing_session() {
        let client = spawn_test_server(AttackConfig::default()).await;
        let generated = client.generate_tag("AAAABBBB", "K").await.unwrap();

        let tagged = client
            .tag(&generated.session_id, "CCCCDDDD")
            .await
            .unwrap();

        assert_eq!(tagged.tag, "tiiiispppp");
        assert_eq!(tagged.observed, 2);
    }

    #[tokio::test]
    async fn verify_tag_reports_validity_and_computed_tag() {
        let client = spawn_test_server(AttackConfig::default()).await;

        let valid = client
            .verify_tag("AAAADDDD", "K", "tkkkkspppp")
            .await
            .unwrap();
        let invalid = client
            .verify_tag("AAAADDDD", "K", "tkkkispppp")
            .await
            .unwrap();

        assert!(valid.is_valid);
        assert!(!invalid.is_valid);
        assert_eq!(valid.computed_tag, "tkkkkspppp");
        assert_eq!(invalid.computed_tag, valid.computed_tag);
    }

    #[tokio::test]
    async fn verify_tag_with_empty_key_is_bad_request() {
        let client = spawn_test_server(AttackConfig::default()).await;

        let result = client.verify_tag("message", "", "tag").await;

        assert_eq!(api_status(result), 400);
    }

    #[tokio::test]
    async fn run_forgery_returns_trace_of_attack() {
        let client = spawn_test_server(AttackConfig::default()).await;
        let generated = client.generate_tag("", "").await.unwrap();

        let forgery = client.run_forgery(&generated.session_id).await.unwrap();

        let steps = &forgery.attack_steps;
        assert_eq!(steps.oracle_queries.len(), 5);
        assert_eq!(
            steps.oracle_queries.iter().map(|q| q.step).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(steps.forgery_explanation.forged_message, forgery.forged_message);
        assert_eq!(steps.forgery_explanation.verification, forgery.success);
        let check = client
            .verify_tag(&forgery.forged_message, &generated.key, &forgery.forged_tag)
            .await
            .unwrap();
        assert_eq!(check.is_valid, forgery.success);
    }

    #[tokio::test]
    async fn run_forgery_without_history_is_bad_request() {
        let client = spawn_test_server(AttackConfig {
            queries: 0,
            probe_len: 16,
        })
        .await;
        let generated = client.generate_tag("", "").await.unwrap();

        let result = client.run_forgery(&generated.session_id).await;

        assert_eq!(api_status(result), 400);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let client = spawn_test_server(AttackConfig::default()).await;
        let missing = SessionId::from("nosuchid");

        assert_eq!(api_status(client.run_forgery(&missing).await), 404);
        assert_eq!(api_status(client.tag(&missing, "message").await), 404);
        assert_eq!(api_status(client.discard_session(&missing).await), 404);
    }

    #[tokio::test]
    async fn discarded_session_can_no_longer_be_attacked() {
        let client = spawn_test_server(AttackConfig::default()).await;
        let generated = client.generate_tag("", "").await.unwrap();

        client.discard_session(&generated.session_id).await.unwrap();

        assert_eq!(
            api_status(client.run_forgery(&generated.session_id).await),
            404
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_on_one_session_keep_history_consistent() {
        let client = spawn_test_server(AttackConfig::default()).await;
        let generated = client.generate_tag("", "").await.unwrap();

        let tags = (0..10).map(|i| {
            let client = client.clone();
            let session_id = generated.session_id.clone();
            async move { client.tag(&session_id, &format!("message{i}")).await }
        });
        let forgeries = (0..3).map(|_| {
            let client = client.clone();
            let session_id = generated.session_id.clone();
            async move { client.run_forgery(&session_id).await }
        });
        let (tags, forgeries) = tokio::join!(join_all(tags), join_all(forgeries));

        assert!(tags.iter().all(Result::is_ok));
        assert!(forgeries.iter().all(Result::is_ok));
        let last = client
            .tag(&generated.session_id, "last")
            .await
            .unwrap();
        assert_eq!(last.observed, 1 + 10 + 3 * 5 + 1);
    }
}
