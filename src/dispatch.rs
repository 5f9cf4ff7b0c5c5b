//! Sequential delivery of batches to a downstream chat endpoint.
//!
//! Each batch becomes its own POST request carrying
//! `{"messages":[{"role":"user","content":…}]}`. Requests are sent one at a
//! time, in order. Each reply's `response` field is appended, followed by a
//! newline. The first failure stops the run and the text gathered so far is
//! dropped.
//!
//! No timeout or retry is applied here; both are the caller's policy, set on
//! the `reqwest::Client` passed to [`Dispatcher::with_client`].

use crate::batch::{Batch, Batcher};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::tokens::TokenCounter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Batch],
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// Sends batches to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: DispatchConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send every batch in order and concatenate the replies.
    ///
    /// # Errors
    /// The first transport failure, non-2xx status or malformed reply aborts
    /// the run; later batches are never sent.
    pub async fn dispatch(&self, batches: &[Batch]) -> Result<String, DispatchError> {
        info!("Dispatching {} batches to {}", batches.len(), self.endpoint);

        let mut combined = String::new();
        for (i, batch) in batches.iter().enumerate() {
            let reply = self.send_batch(i + 1, batch).await?;
            combined.push_str(&reply);
            combined.push('\n');
        }
        Ok(combined)
    }

    /// Join `messages` with single spaces, re-batch the result without
    /// attachments, and dispatch it.
    pub async fn send_messages<C: TokenCounter>(
        &self,
        messages: &[Batch],
        batcher: &Batcher<C>,
    ) -> Result<String, DispatchError> {
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let batches = batcher.batch(&joined, &[]);
        self.dispatch(&batches).await
    }

    async fn send_batch(&self, batch_num: usize, batch: &Batch) -> Result<String, DispatchError> {
        let body = ChatRequest {
            messages: std::slice::from_ref(batch),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|source| DispatchError::Request {
                batch: batch_num,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Batch {}: endpoint returned {}", batch_num, status);
            return Err(DispatchError::Status {
                batch: batch_num,
                status: status.as_u16(),
            });
        }

        let reply: ChatReply =
            response
                .json()
                .await
                .map_err(|e| DispatchError::InvalidResponse {
                    batch: batch_num,
                    detail: e.to_string(),
                })?;

        debug!("Batch {}: {} bytes of reply", batch_num, reply.response.len());
        Ok(reply.response)
    }
}
