//! Assistant/thread session surface over the oracle's asynchronous run API.
//!
//! A session bundles an oracle-side assistant and conversation thread. Runs
//! are started explicitly and observed through `poll` until they reach a
//! terminal state; `delete_session` releases both server-side handles and
//! must be called on every exit path.

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::error;

use super::OracleClient;

#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub assistant_id: String,
    pub thread_id: String,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Done,
    Failed,
}

#[derive(Debug, Deserialize)]
struct IdBody {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    content: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct MessagePart {
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

impl OracleClient {
    fn beta_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers()?;
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
        Ok(headers)
    }

    async fn create_object(&self, url: String, body: serde_json::Value, what: &str) -> Result<IdBody> {
        let obj: IdBody = self
            .http
            .post(url)
            .headers(self.beta_headers()?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to create {}", what))?
            .error_for_status()?
            .json()
            .await?;
        Ok(obj)
    }

    async fn fetch_object<T: for<'de> Deserialize<'de>>(&self, url: String, what: &str) -> Result<T> {
        let obj: T = self
            .http
            .get(url)
            .headers(self.beta_headers()?)
            .send()
            .await
            .with_context(|| format!("failed to retrieve {}", what))?
            .error_for_status()?
            .json()
            .await?;
        Ok(obj)
    }

    /// Best-effort delete. Cleanup trouble is logged and swallowed so it
    /// can never mask the primary result.
    async fn delete_object(&self, url: String, what: &str) {
        match self.beta_headers() {
            Ok(headers) => {
                if let Err(e) = self.http.delete(url).headers(headers).send().await {
                    error!("error deleting {}: {}", what, e);
                }
            }
            Err(e) => error!("error deleting {}: {}", what, e),
        }
    }

    /// Create an assistant plus an empty thread to converse on. If the
    /// thread cannot be created the assistant is released before erroring.
    pub async fn create_session(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
    ) -> Result<SessionHandle> {
        let body = serde_json::json!({
            "name": name,
            "instructions": instructions,
            "model": model,
        });
        let assistant = self
            .create_object(format!("{}/assistants", self.base_url()), body, "assistant")
            .await?;

        let url = format!("{}/threads", self.base_url());
        let thread = match self.create_object(url, serde_json::json!({}), "thread").await {
            Ok(t) => t,
            Err(e) => {
                let url = format!("{}/assistants/{}", self.base_url(), assistant.id);
                self.delete_object(url, "assistant").await;
                return Err(e);
            }
        };

        Ok(SessionHandle {
            assistant_id: assistant.id,
            thread_id: thread.id,
            run_id: None,
        })
    }

    /// Post a user message and start a run over the session's thread.
    pub async fn start_run(&self, handle: &mut SessionHandle, content: &str) -> Result<()> {
        let url = format!("{}/threads/{}/messages", self.base_url(), handle.thread_id);
        let body = serde_json::json!({ "role": "user", "content": content });
        self.create_object(url, body, "message").await?;

        let url = format!("{}/threads/{}/runs", self.base_url(), handle.thread_id);
        let body = serde_json::json!({ "assistant_id": handle.assistant_id });
        let run = self.create_object(url, body, "run").await?;
        handle.run_id = Some(run.id);
        Ok(())
    }

    /// Observe the current run. Latency and transient failure states are
    /// normal here, not exceptional; only transport problems error.
    pub async fn poll(&self, handle: &SessionHandle) -> Result<RunState> {
        let run_id = handle
            .run_id
            .as_deref()
            .ok_or_else(|| anyhow!("session has no active run"))?;
        let url = format!(
            "{}/threads/{}/runs/{}",
            self.base_url(),
            handle.thread_id,
            run_id
        );
        let run: RunBody = self.fetch_object(url, "run").await?;

        Ok(match run.status.as_str() {
            "completed" => RunState::Done,
            "failed" | "cancelled" | "expired" => RunState::Failed,
            _ => RunState::Pending,
        })
    }

    /// Fetch the newest assistant message text from the session's thread.
    pub async fn fetch_result(&self, handle: &SessionHandle) -> Result<String> {
        let url = format!("{}/threads/{}/messages", self.base_url(), handle.thread_id);
        let list: MessageList = self.fetch_object(url, "messages").await?;

        for message in list.data {
            if message.role == "assistant" {
                if let Some(text) = message.content.into_iter().find_map(|p| p.text) {
                    return Ok(text.value);
                }
            }
        }
        Err(anyhow!("no assistant response in thread"))
    }

    /// Release the session's server-side handles.
    pub async fn delete_session(&self, handle: &SessionHandle) {
        let url = format!("{}/threads/{}", self.base_url(), handle.thread_id);
        self.delete_object(url, "thread").await;
        let url = format!("{}/assistants/{}", self.base_url(), handle.assistant_id);
        self.delete_object(url, "assistant").await;
    }
}
