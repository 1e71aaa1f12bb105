//! Operator e-mail notifications

use crate::adapters::platform::PlatformHttp;
use crate::config::schema::with_trailing_slash;
use crate::config::ArchivelinkConfig;
use crate::domain::{ArchiveError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// E-mail to the operators of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorNotification {
    /// Reference shown in the notification log, usually the instance id
    pub senders_reference: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, notification: OperatorNotification) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailOrderRequest<'a> {
    senders_reference: &'a str,
    subject: &'a str,
    body: &'a str,
    content_type: &'a str,
    recipients: Vec<EmailRecipient<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailRecipient<'a> {
    email_address: &'a str,
}

/// Notification orders through the platform notifications API
#[derive(Clone)]
pub struct HttpEmailNotifier {
    http: PlatformHttp,
    endpoint: String,
}

impl HttpEmailNotifier {
    pub fn new(config: &ArchivelinkConfig, http: PlatformHttp) -> Self {
        Self {
            http,
            endpoint: with_trailing_slash(&config.platform.notifications_endpoint),
        }
    }
}

#[async_trait]
impl OperatorNotifier for HttpEmailNotifier {
    async fn notify(&self, notification: OperatorNotification) -> Result<()> {
        if notification.recipients.is_empty() {
            return Err(ArchiveError::Notification(
                "Notification has no recipients".to_string(),
            ));
        }

        let request = EmailOrderRequest {
            senders_reference: &notification.senders_reference,
            subject: &notification.subject,
            body: &notification.body,
            content_type: "Plain",
            recipients: notification
                .recipients
                .iter()
                .map(|r| EmailRecipient { email_address: r })
                .collect(),
        };

        let url = format!("{}orders/email", self.endpoint);
        self.http
            .send(self.http.client().post(url).json(&request))
            .await
            .map_err(|e| ArchiveError::Notification(e.to_string()))?;

        tracing::info!(
            senders_reference = %notification.senders_reference,
            recipients = notification.recipients.len(),
            "Operator notification ordered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_config;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_email_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Home/GetTestOrgToken")
            .match_query(Matcher::Any)
            .with_body("token")
            .create_async()
            .await;
        let mock = server
            .mock("POST", "/notifications/api/v1/orders/email")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "sendersReference": "501337/abc",
                "subject": "Arkivering feilet",
                "contentType": "Plain",
                "recipients": [{ "emailAddress": "arkiv@kommune.no" }]
            })))
            .with_status(202)
            .with_body("{}")
            .create_async()
            .await;

        let mut config = sample_config();
        config.platform.notifications_endpoint =
            format!("{}/notifications/api/v1", server.url());
        config.platform.auth.local_token_url = format!("{}/Home/GetTestOrgToken", server.url());
        let notifier = HttpEmailNotifier::new(&config, PlatformHttp::new(&config).unwrap());

        notifier
            .notify(OperatorNotification {
                senders_reference: "501337/abc".to_string(),
                recipients: vec!["arkiv@kommune.no".to_string()],
                subject: "Arkivering feilet".to_string(),
                body: "Feil".to_string(),
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notification_without_recipients_fails() {
        let config = sample_config();
        let notifier = HttpEmailNotifier::new(&config, PlatformHttp::new(&config).unwrap());
        let result = notifier
            .notify(OperatorNotification {
                senders_reference: "x".to_string(),
                recipients: vec![],
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ArchiveError::Notification(_))));
    }
}
