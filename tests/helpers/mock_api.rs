// ABOUTME: Scripted in-memory DeepSeek API for dispatcher and transport tests
// ABOUTME: Returns queued results in order and records every request it receives

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deepseek_mcp_server::conversation::ConversationStore;
use deepseek_mcp_server::errors::ApiError;
use deepseek_mcp_server::llm::{
    ChatChoice, ChatCompletionExecutionResult, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage, CompletionExecutionResult, CompletionRequest, DeepSeekApi, Extra, ModelInfo,
    ModelList, TextChoice, TextCompletionResponse, UserBalance,
};
use deepseek_mcp_server::mcp::{McpRequestProcessor, ServerResources};

type ChatOutcome = Result<ChatCompletionExecutionResult, ApiError>;
type CompletionOutcome = Result<CompletionExecutionResult, ApiError>;

/// In-memory `DeepSeekApi` with queued outcomes
#[derive(Default)]
pub struct MockDeepSeekApi {
    chat_outcomes: Mutex<VecDeque<ChatOutcome>>,
    completion_outcomes: Mutex<VecDeque<CompletionOutcome>>,
    chat_requests: Mutex<Vec<ChatCompletionRequest>>,
    completion_requests: Mutex<Vec<CompletionRequest>>,
}

impl MockDeepSeekApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_chat(&self, outcome: ChatOutcome) {
        self.chat_outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn push_completion(&self, outcome: CompletionOutcome) {
        self.completion_outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn chat_requests(&self) -> Vec<ChatCompletionRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn completion_requests(&self) -> Vec<CompletionRequest> {
        self.completion_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeepSeekApi for MockDeepSeekApi {
    async fn create_chat_completion(&self, request: ChatCompletionRequest) -> ChatOutcome {
        self.chat_requests.lock().unwrap().push(request);
        self.chat_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no chat outcome queued")
    }

    async fn create_completion(&self, request: CompletionRequest) -> CompletionOutcome {
        self.completion_requests.lock().unwrap().push(request);
        self.completion_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no completion outcome queued")
    }

    async fn list_models(&self) -> Result<ModelList, ApiError> {
        Ok(ModelList {
            object: "list".into(),
            data: vec![ModelInfo {
                id: "deepseek-chat".into(),
                object: "model".into(),
                owned_by: "deepseek".into(),
                extra: Extra::new(),
            }],
            extra: Extra::new(),
        })
    }

    async fn get_user_balance(&self) -> Result<UserBalance, ApiError> {
        Err(ApiError::upstream(401, "Authentication Fails", None))
    }
}

/// Chat result whose first choice says `text`
pub fn chat_result(model: &str, text: &str) -> ChatCompletionExecutionResult {
    ChatCompletionExecutionResult {
        response: ChatCompletionResponse {
            id: "chatcmpl-test".into(),
            object: "chat.completion".into(),
            created: 1_700_000_000,
            model: model.into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: Some("stop".into()),
                extra: Extra::new(),
            }],
            usage: None,
            extra: Extra::new(),
        },
        fallback: None,
        stream_chunk_count: None,
    }
}

/// Completion result with one choice
pub fn completion_result(text: &str, used_beta_base: bool) -> CompletionExecutionResult {
    CompletionExecutionResult {
        response: TextCompletionResponse {
            id: "cmpl-test".into(),
            object: "text_completion".into(),
            created: 1_700_000_000,
            model: "deepseek-chat".into(),
            choices: vec![TextChoice {
                index: 0,
                text: text.into(),
                finish_reason: Some("stop".into()),
                extra: Extra::new(),
            }],
            usage: None,
            extra: Extra::new(),
        },
        used_beta_base,
        stream_chunk_count: None,
    }
}

/// Processor over `api` with a fresh store capped at `max_messages`
pub fn processor_with(api: Arc<MockDeepSeekApi>, max_messages: usize) -> McpRequestProcessor {
    let resources = ServerResources::new(
        api,
        Arc::new(ConversationStore::new(max_messages)),
        "deepseek-chat",
    );
    McpRequestProcessor::new(Arc::new(resources))
}
