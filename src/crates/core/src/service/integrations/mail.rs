//! Gmail fetcher

use super::merge::Timestamped;
use crate::util::errors::AtelierResult;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAIL_QUERY: &str = "in:inbox";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    pub thread_id: String,
    pub account: String,
    pub from: String,
    pub subject: String,
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    pub unread: bool,
}

impl Timestamped for MailMessage {
    fn timestamp(&self) -> DateTime<Utc> {
        self.received_at
    }
}

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
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    thread_id: String,
    #[serde(default)]
    snippet: String,
    internal_date: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl GmailMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.headers.iter().find_map(|h| {
            if h.name.eq_ignore_ascii_case(name) {
                Some(h.value.as_str())
            } else {
                None
            }
        })
    }
}

fn normalize_message(message: GmailMessage, account: &str) -> Option<MailMessage> {
    let millis: i64 = message.internal_date.as_deref()?.parse().ok()?;
    let received_at = Utc.timestamp_millis_opt(millis).single()?;
    Some(MailMessage {
        from: message.header("From").unwrap_or_default().to_string(),
        subject: message
            .header("Subject")
            .unwrap_or("(no subject)")
            .to_string(),
        unread: message.label_ids.iter().any(|label| label == "UNREAD"),
        id: message.id,
        thread_id: message.thread_id,
        account: account.to_string(),
        snippet: message.snippet,
        received_at,
    })
}

#[derive(Clone)]
pub struct GmailClient {
    client: reqwest::Client,
    base_url: String,
    query: String,
    max_results: u32,
}

impl GmailClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            query: DEFAULT_MAIL_QUERY.to_string(),
            max_results: 20,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url)
    }

    async fn fetch_message(&self, access_token: &str, id: &str) -> AtelierResult<GmailMessage> {
        let response = self
            .client
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// One page of recent messages matching the configured query.
    pub async fn list_recent(
        &self,
        access_token: &str,
        account: &str,
    ) -> AtelierResult<Vec<MailMessage>> {
        let max_results = self.max_results.to_string();
        let list: MessageList = self
            .client
            .get(self.messages_url())
            .bearer_auth(access_token)
            .query(&[("q", self.query.as_str()), ("maxResults", max_results.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(
            "Mail page listed: account={}, messages={}",
            account,
            list.messages.len()
        );

        let details = join_all(
            list.messages
                .iter()
                .map(|message| self.fetch_message(access_token, &message.id)),
        )
        .await;

        Ok(details
            .into_iter()
            .filter_map(|detail| match detail {
                Ok(message) => normalize_message(message, account),
                Err(e) => {
                    warn!("Skipping unreadable message: account={}, error={}", account, e);
                    None
                }
            })
            .collect())
    }
}
