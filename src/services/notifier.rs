use crate::config::{NotifierConfig, NotifierKind};
use crate::models::RankChangeEvent;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Invalid message template: {0}")]
    Template(String),

    #[error("Notifier configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Relay rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A field of a rank change event that a template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ProductId,
    ProductName,
    PreviousRank,
    CurrentRank,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "product_id" => Some(Field::ProductId),
            "product_name" => Some(Field::ProductName),
            "previous_rank" => Some(Field::PreviousRank),
            "current_rank" => Some(Field::CurrentRank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Per-event line template with `{product_id}`, `{product_name}`,
/// `{previous_rank}` and `{current_rank}` placeholders
///
/// The template is split into literal text and fields once; field values
/// are written out verbatim and never scanned for placeholders.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Parse a template, rejecting unknown or unterminated placeholders
    pub fn new(template: impl Into<String>) -> Result<Self, NotifierError> {
        let template = template.into();
        let mut segments = Vec::new();

        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| NotifierError::Template(format!("unterminated placeholder in {:?}", template)))?;
            let name = &after[..close];
            let field = Field::from_name(name)
                .ok_or_else(|| NotifierError::Template(format!("unknown placeholder {{{}}}", name)))?;

            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Field(field));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, event: &RankChangeEvent) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Field(Field::ProductId) => line.push_str(&event.product_id),
                Segment::Field(Field::ProductName) => line.push_str(&event.product_name),
                Segment::Field(Field::PreviousRank) => line.push_str(&event.previous_rank.to_string()),
                Segment::Field(Field::CurrentRank) => line.push_str(&event.current_rank.to_string()),
            }
        }
        line
    }

    /// One rendered line per event, in input order
    pub fn render_batch(&self, events: &[RankChangeEvent]) -> String {
        events
            .iter()
            .map(|e| self.render(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Receives the batch of rank changes detected in one run
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, events: &[RankChangeEvent]) -> Result<(), NotifierError>;
}

/// Writes rendered rank changes to the log
pub struct LogNotifier {
    subject: String,
    template: MessageTemplate,
}

impl LogNotifier {
    pub fn new(subject: impl Into<String>, template: MessageTemplate) -> Self {
        Self {
            subject: subject.into(),
            template,
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, events: &[RankChangeEvent]) -> Result<(), NotifierError> {
        info!("{} ({} changes)", self.subject, events.len());
        for event in events {
            info!("{}", self.template.render(event));
        }
        Ok(())
    }
}

/// JSON message accepted by the mail relay
#[derive(Debug, Serialize)]
pub struct RelayMessage<'a> {
    pub from: &'a str,
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub body: String,
    pub events: &'a [RankChangeEvent],
}

/// Hands rendered rank changes to an HTTP mail relay
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    sender: String,
    recipients: Vec<String>,
    subject: String,
    template: MessageTemplate,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        sender: impl Into<String>,
        recipients: Vec<String>,
        subject: impl Into<String>,
        template: MessageTemplate,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            sender: sender.into(),
            recipients,
            subject: subject.into(),
            template,
            timeout,
        }
    }

    pub fn message<'a>(&'a self, events: &'a [RankChangeEvent]) -> RelayMessage<'a> {
        RelayMessage {
            from: &self.sender,
            recipients: &self.recipients,
            subject: &self.subject,
            body: self.template.render_batch(events),
            events,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, events: &[RankChangeEvent]) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.message(events))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mail relay returned {}", status);
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            "Sent {} rank changes to {} recipients via {}",
            events.len(),
            self.recipients.len(),
            self.url
        );
        Ok(())
    }
}

/// Build the notifier selected by configuration
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifierError> {
    let template = MessageTemplate::new(config.template.clone())?;

    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier::new(config.subject.clone(), template))),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .ok_or_else(|| NotifierError::Config("webhook url is not set".to_string()))?;
            Ok(Arc::new(WebhookNotifier::new(
                url,
                config.sender.clone(),
                config.recipients.clone(),
                config.subject.clone(),
                template,
                config.timeout(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEMPLATE;

    fn event() -> RankChangeEvent {
        RankChangeEvent {
            product_id: "P1".to_string(),
            product_name: "Garmin Venu 3".to_string(),
            previous_rank: 2,
            current_rank: 1,
        }
    }

    #[test]
    fn test_default_template_renders_all_fields() {
        let template = MessageTemplate::new(DEFAULT_TEMPLATE).unwrap();
        assert_eq!(
            template.render(&event()),
            "Product ID: P1 (Garmin Venu 3), Previous Rank: 2, Current Rank: 1"
        );
    }

    #[test]
    fn test_batch_renders_one_line_per_event() {
        let template = MessageTemplate::new("{product_id}: {previous_rank} -> {current_rank}").unwrap();
        let mut second = event();
        second.product_id = "P2".to_string();
        second.current_rank = 3;

        assert_eq!(template.render_batch(&[event(), second]), "P1: 2 -> 1\nP2: 2 -> 3");
    }

    #[test]
    fn test_field_values_are_not_substituted() {
        let template = MessageTemplate::new("{product_id} {product_name}: {previous_rank} -> {current_rank}").unwrap();
        let event = RankChangeEvent {
            product_id: "P{current_rank}".to_string(),
            product_name: "Box {previous_rank}".to_string(),
            previous_rank: 2,
            current_rank: 1,
        };

        assert_eq!(
            template.render(&event),
            "P{current_rank} Box {previous_rank}: 2 -> 1"
        );
    }

    #[test]
    fn test_template_without_placeholders_is_literal() {
        let template = MessageTemplate::new("ranks changed").unwrap();
        assert_eq!(template.render(&event()), "ranks changed");
    }

    #[test]
    fn test_template_rejects_unknown_placeholder() {
        assert!(matches!(
            MessageTemplate::new("{product} moved"),
            Err(NotifierError::Template(_))
        ));
        assert!(matches!(
            MessageTemplate::new("rank {current_rank"),
            Err(NotifierError::Template(_))
        ));
    }

    #[test]
    fn test_relay_message_shape() {
        let notifier = WebhookNotifier::new(
            "http://relay.local/send",
            "monitor@example.com",
            vec!["ops@example.com".to_string()],
            "Rank changes",
            MessageTemplate::new(DEFAULT_TEMPLATE).unwrap(),
            Duration::from_secs(5),
        );
        let events = vec![event()];

        let json = serde_json::to_value(notifier.message(&events)).unwrap();

        assert_eq!(json["from"], "monitor@example.com");
        assert_eq!(json["subject"], "Rank changes");
        assert_eq!(json["recipients"][0], "ops@example.com");
        assert!(json.get("to").is_none());
        assert_eq!(json["events"][0]["current_rank"], 1);
        assert!(json["body"].as_str().unwrap().contains("Previous Rank: 2"));
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_batch() {
        let notifier = LogNotifier::new("Rank changes", MessageTemplate::new(DEFAULT_TEMPLATE).unwrap());
        assert!(notifier.notify(&[event()]).await.is_ok());
        assert_eq!(notifier.name(), "log");
    }

    #[test]
    fn test_build_notifier_from_config() {
        let config = NotifierConfig::default();
        assert_eq!(build_notifier(&config).unwrap().name(), "log");

        let bad = NotifierConfig {
            template: "{oops}".to_string(),
            ..NotifierConfig::default()
        };
        assert!(build_notifier(&bad).is_err());
    }
}
