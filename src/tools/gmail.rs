//! Gmail connector tool
//!
//! Lists the subjects of the most recent inbox messages using the `google`
//! connector token from the caller's credential. The token is sent to the
//! Gmail API as a bearer token and nowhere else.

use super::schema;
use crate::error::{Result, ToolError};
use crate::session::ToolContext;
use http::header::ACCEPT;
use rmcp::model::{CallToolResult, Content, Tool};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const NAME: &str = "gmail_list_messages";

/// Connector whose token this tool needs.
pub const CONNECTOR: &str = "google";

const MAX_MESSAGES: usize = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

/// Minimal Gmail REST client
#[derive(Clone, Debug)]
pub struct GmailClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GmailClient {
    /// `base_url` is the API root, e.g. `https://gmail.googleapis.com`.
    pub fn new(base_url: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Subjects of the first ten inbox messages.
    ///
    /// A message that cannot be fetched is logged and skipped, as is one with
    /// no or an empty subject.
    pub async fn list_message_subjects(&self, access_token: &str) -> Result<Vec<String>> {
        let list_url = self.base_url.join("gmail/v1/users/me/messages")?;

        let listing: MessageList = self
            .http
            .get(list_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = listing.messages.len(), "Listed Gmail messages");

        let mut subjects = Vec::new();
        for message in listing.messages.iter().take(MAX_MESSAGES) {
            match self.fetch_subject(access_token, &message.id).await {
                Ok(Some(subject)) => subjects.push(subject),
                Ok(None) => {}
                Err(e) => warn!(message_id = %message.id, error = %e, "Failed to fetch message"),
            }
        }

        Ok(subjects)
    }

    async fn fetch_subject(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<Option<String>> {
        let message_url = self
            .base_url
            .join(&format!("gmail/v1/users/me/messages/{}", message_id))?;

        let message: Message = self
            .http
            .get(message_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(message.payload.and_then(|payload| {
            payload
                .headers
                .into_iter()
                .find(|header| header.name == "Subject")
                .map(|header| header.value)
                .filter(|subject| !subject.is_empty())
        }))
    }
}

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Lists the subjects of the first messages in the caller's Gmail inbox. \
         Uses the `google` connector token from the authorization header.",
        schema(json!({ "type": "object", "properties": {} })),
    )
}

pub async fn call(
    client: &GmailClient,
    ctx: &ToolContext,
) -> std::result::Result<CallToolResult, ToolError> {
    let tokens = ctx.tokens()?;

    let access_token = match tokens.connector_token(CONNECTOR) {
        Ok(token) => token,
        Err(e) => {
            warn!(connector = CONNECTOR, "Connector token missing");
            return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
        }
    };

    let subjects = client.list_message_subjects(access_token).await?;

    Ok(CallToolResult::success(vec![Content::text(
        json!({ "message_subjects": subjects }).to_string(),
    )]))
}
