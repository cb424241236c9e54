//! Relay — stateless translation between one client call and one provider invocation.
//! All provider access goes through the `ChatProvider` in `AppState`.

pub mod handlers;
pub mod invocation;
pub mod prompts;

use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::{extract::extract_reply, Credentials};
use crate::models::chat::{ChatRequest, ChatResponse, Role, Turn};
use crate::state::AppState;

use invocation::{Invocation, Phase};

/// Runs one chat invocation end to end.
///
/// The returned history is always the input history with exactly one user and
/// one assistant turn appended. Nothing is kept between calls.
pub async fn relay_chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, AppError> {
    let mut invocation = Invocation::start();
    let result = run(state, request, &mut invocation)
        .await
        .map_err(|err| invocation.fail(err));
    debug!(invocation = %invocation.id, phase = %invocation.phase(), "chat invocation finished");
    result
}

async fn run(
    state: &AppState,
    request: ChatRequest,
    invocation: &mut Invocation,
) -> Result<ChatResponse, AppError> {
    invocation.advance(Phase::Validating)?;

    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Message is required".to_string()))?;
    let history = request.conversation_history.unwrap_or_default();

    let credentials = state
        .config
        .provider
        .credentials
        .as_ref()
        .ok_or_else(|| AppError::Configuration("Azure API key not configured".to_string()))?;

    info!(
        invocation = %invocation.id,
        "chat called - message length: {}, history turns: {}",
        message.len(),
        history.len()
    );

    if matches!(credentials, Credentials::ServicePrincipal { .. }) {
        invocation.advance(Phase::Authenticating)?;
    }
    let auth = state.provider.authorize(credentials).await?;

    invocation.advance(Phase::Forwarding)?;
    let user_turn = Turn::new(Role::User, message);
    let messages = outbound_messages(&state.system_instruction, &history, &user_turn);
    let body = state.provider.complete(&auth, &messages).await?;

    invocation.advance(Phase::ExtractingResponse)?;
    let (reply, source) = extract_reply(&body)?;
    debug!(invocation = %invocation.id, "reply extracted via {source:?}");

    let mut conversation_history = history;
    conversation_history.push(user_turn);
    conversation_history.push(Turn::new(Role::Assistant, reply.clone()));

    invocation.advance(Phase::Completed)?;
    Ok(ChatResponse {
        response: reply,
        conversation_history,
    })
}

/// System instruction, then the prior history verbatim, then the new user turn.
pub fn outbound_messages(system_instruction: &str, history: &[Turn], user_turn: &Turn) -> Vec<Turn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Turn::new(Role::System, system_instruction));
    messages.extend_from_slice(history);
    messages.push(user_turn.clone());
    messages
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Config, ProviderConfig};
    use crate::llm_client::{Authorization, ChatProvider, LlmError, Protocol};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Provider double that replays queued bodies and records what it was sent.
    #[derive(Default)]
    pub(crate) struct MockProvider {
        pub replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub auth_error: Mutex<Option<LlmError>>,
        pub sent: Mutex<Vec<Vec<Turn>>>,
        pub authorize_calls: Mutex<u32>,
    }

    impl MockProvider {
        pub(crate) fn replying(bodies: &[&str]) -> Self {
            let provider = Self::default();
            provider
                .replies
                .lock()
                .unwrap()
                .extend(bodies.iter().map(|b| Ok(b.to_string())));
            provider
        }

        pub(crate) fn failing(err: LlmError) -> Self {
            let provider = Self::default();
            provider.replies.lock().unwrap().push_back(Err(err));
            provider
        }
    }

    #[async_trait]
    impl ChatProvider for MockProvider {
        async fn authorize(&self, credentials: &Credentials) -> Result<Authorization, LlmError> {
            *self.authorize_calls.lock().unwrap() += 1;
            if let Some(err) = self.auth_error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(match credentials {
                Credentials::ApiKey(k) => Authorization::ApiKey(k.clone()),
                Credentials::ServicePrincipal { .. } => Authorization::Bearer("token".into()),
            })
        }

        async fn complete(&self, _auth: &Authorization, messages: &[Turn]) -> Result<String, LlmError> {
            self.sent.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"output_text":"default reply"}"#.to_string()))
        }
    }

    pub(crate) fn test_state(provider: Arc<MockProvider>, credentials: Option<Credentials>) -> AppState {
        let config = Config {
            provider: ProviderConfig {
                endpoint: "http://unused".to_string(),
                deployment: "gpt-4o".to_string(),
                protocol: Protocol::ChatCompletions,
                api_version: "2024-10-21".to_string(),
                responses_url: "http://unused/openai/responses".to_string(),
                authority_host: "http://unused".to_string(),
                token_scope: "scope".to_string(),
                credentials,
            },
            port: 0,
            rust_log: "debug".to_string(),
        };
        AppState::new(config, provider)
    }

    fn api_key() -> Option<Credentials> {
        Some(Credentials::ApiKey("k".to_string()))
    }

    fn request(message: &str, history: Vec<Turn>) -> ChatRequest {
        ChatRequest {
            message: Some(message.to_string()),
            conversation_history: Some(history),
        }
    }

    #[tokio::test]
    async fn test_history_grows_by_exactly_user_then_assistant() {
        let provider = Arc::new(MockProvider::replying(&[
            r#"{"choices":[{"message":{"content":"**Resume:** LLM_MLOPS_Engineer"}}]}"#,
        ]));
        let state = test_state(provider.clone(), api_key());
        let prior = vec![
            Turn::new(Role::User, "earlier posting"),
            Turn::new(Role::Assistant, "earlier answer"),
        ];

        let response = relay_chat(&state, request("RAG pipelines and agents", prior.clone()))
            .await
            .unwrap();

        assert_eq!(response.response, "**Resume:** LLM_MLOPS_Engineer");
        assert_eq!(response.conversation_history.len(), prior.len() + 2);
        assert_eq!(&response.conversation_history[..2], &prior[..]);
        assert_eq!(
            response.conversation_history[2],
            Turn::new(Role::User, "RAG pipelines and agents")
        );
        assert_eq!(
            response.conversation_history[3],
            Turn::new(Role::Assistant, "**Resume:** LLM_MLOPS_Engineer")
        );
    }

    #[tokio::test]
    async fn test_outbound_list_is_system_history_user() {
        let provider = Arc::new(MockProvider::replying(&[r#"{"output_text":"ok"}"#]));
        let state = test_state(provider.clone(), api_key());
        let prior = vec![
            Turn::new(Role::User, "a"),
            Turn::new(Role::Assistant, "b"),
        ];

        relay_chat(&state, request("c", prior)).await.unwrap();

        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let roles: Vec<Role> = sent[0].iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(sent[0][0].content, state.system_instruction.as_ref());
        assert_eq!(sent[0][3].content, "c");
    }

    #[tokio::test]
    async fn test_system_instruction_never_enters_history() {
        let provider = Arc::new(MockProvider::replying(&[r#"{"output_text":"ok"}"#]));
        let state = test_state(provider, api_key());

        let response = relay_chat(&state, request("hello", vec![])).await.unwrap();
        assert!(response
            .conversation_history
            .iter()
            .all(|t| t.role != Role::System));
    }

    #[tokio::test]
    async fn test_missing_or_blank_message_is_validation_error() {
        let provider = Arc::new(MockProvider::default());
        let state = test_state(provider.clone(), api_key());

        let missing = relay_chat(&state, ChatRequest::default()).await.unwrap_err();
        assert!(matches!(missing, AppError::Validation(_)));

        let blank = relay_chat(&state, request("  \n\t", vec![])).await.unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));

        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration_error() {
        let provider = Arc::new(MockProvider::default());
        let state = test_state(provider.clone(), None);

        let err = relay_chat(&state, request("hi", vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(*provider.authorize_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_token_exchange_failure_skips_provider_call() {
        let provider = Arc::new(MockProvider::default());
        *provider.auth_error.lock().unwrap() = Some(LlmError::TokenExchange("denied".into()));
        let sp = Credentials::ServicePrincipal {
            client_id: "c".into(),
            client_secret: "s".into(),
            tenant_id: "t".into(),
        };
        let state = test_state(provider.clone(), Some(sp));

        let err = relay_chat(&state, request("hi", vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamAuth(_)));
        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_status_is_propagated() {
        let provider = Arc::new(MockProvider::failing(LlmError::Api {
            status: 503,
            message: "unavailable".into(),
        }));
        let state = test_state(provider, api_key());

        let err = relay_chat(&state, request("hi", vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unrecognised_body_falls_back_to_raw_json() {
        let provider = Arc::new(MockProvider::replying(&[r#"{"weird":true}"#]));
        let state = test_state(provider, api_key());

        let response = relay_chat(&state, request("hi", vec![])).await.unwrap();
        assert_eq!(response.response, r#"{"weird":true}"#);
        assert_eq!(response.conversation_history[1].content, r#"{"weird":true}"#);
    }

    #[tokio::test]
    async fn test_concurrent_calls_do_not_mix_histories() {
        let provider = Arc::new(MockProvider::default());
        let state = test_state(provider, api_key());

        let history_a = vec![
            Turn::new(Role::User, "A1"),
            Turn::new(Role::Assistant, "A2"),
        ];
        let history_b = vec![Turn::new(Role::User, "B1")];

        let (a, b) = tokio::join!(
            relay_chat(&state, request("A3", history_a.clone())),
            relay_chat(&state, request("B2", history_b.clone())),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(&a.conversation_history[..2], &history_a[..]);
        assert_eq!(a.conversation_history[2].content, "A3");
        assert!(a.conversation_history.iter().all(|t| !t.content.starts_with('B')));

        assert_eq!(&b.conversation_history[..1], &history_b[..]);
        assert_eq!(b.conversation_history[1].content, "B2");
        assert!(b.conversation_history.iter().all(|t| !t.content.starts_with('A')));
    }
}
