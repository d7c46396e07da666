//! Shared HTTP client that runs every call under the retry policy

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

use super::policy::{parse_retry_after, RetryPolicy};
use super::CallError;

/// Longest slice of an error body kept in a `CallError::Status`
const MAX_ERROR_BODY: usize = 512;

/// Process-wide HTTP client with retry, backoff and split timeouts.
///
/// Cloning is cheap: the connection pool and the policy are shared.
/// Retry state lives on the stack of each call, never in the client.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: Client,
    policy: Arc<RetryPolicy>,
}

impl ResilientClient {
    /// Build the pooled client for `policy`
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(policy.connect_timeout)
            .read_timeout(policy.read_timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            policy: Arc::new(policy),
        })
    }

    /// The policy every call runs under
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B>(&self, url: &str, body: &B) -> std::result::Result<Value, CallError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.execute(url, |client| client.post(url).json(body)).await?;
        decode_json(url, response).await
    }

    /// GET a URL and decode the JSON reply
    pub async fn get_json(&self, url: &str) -> std::result::Result<Value, CallError> {
        let response = self.execute(url, |client| client.get(url)).await?;
        decode_json(url, response).await
    }

    /// Single reachability probe: no retries, own timeout, `true` iff status < 400
    pub async fn probe(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response.status().as_u16() < 400,
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed");
                false
            }
        }
    }

    /// Run one logical call: attempt, classify, back off, repeat until the
    /// budget is spent. The last error is returned unchanged.
    async fn execute<F>(&self, url: &str, build: F) -> std::result::Result<Response, CallError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut retry: u32 = 0;

        loop {
            let (err, retry_after) = match build(&self.client).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let retry_after = parse_retry_after(response.headers());
                    let mut body = response.text().await.unwrap_or_default();
                    truncate_body(&mut body);
                    (
                        CallError::Status {
                            url: url.to_string(),
                            status,
                            body,
                        },
                        retry_after,
                    )
                }
                Err(e) => (CallError::from_reqwest(url, e), None),
            };

            if retry >= self.policy.max_retries || !self.policy.should_retry(&err) {
                if retry > 0 {
                    tracing::warn!(url, attempts = retry + 1, error = %err, "giving up after retries");
                }
                return Err(err);
            }

            let delay = self.policy.delay_for(retry, retry_after);
            tracing::warn!(
                url,
                attempt = retry + 1,
                max_attempts = self.policy.max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            sleep(delay).await;
            retry += 1;
        }
    }
}

async fn decode_json(url: &str, response: Response) -> std::result::Result<Value, CallError> {
    response.json::<Value>().await.map_err(|source| CallError::Decode {
        url: url.to_string(),
        source,
    })
}

fn truncate_body(body: &mut String) {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_policy() {
        let client = ResilientClient::new(RetryPolicy::default()).unwrap();
        assert_eq!(client.policy().max_retries, 3);
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundary() {
        let mut body = "é".repeat(400);
        truncate_body(&mut body);
        assert!(body.len() <= MAX_ERROR_BODY);
        assert!(body.chars().all(|c| c == 'é'));
    }
}
