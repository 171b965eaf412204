use super::{ListFilter, NotificationApi};
use crate::config::ApiConfig;
use crate::credentials::CredentialSource;
use crate::error::{RemoteAction, Result, SyncError};
use crate::models::{Notification, NotificationId, NotificationPage};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use resilience::timeout::{with_timeout_result, TimeoutError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// reqwest-backed client for the notification endpoints
///
/// The session token is read on every call so a rotated credential is picked
/// up without rebuilding the client.
#[derive(Clone)]
pub struct HttpNotificationApi {
    http_client: reqwest::Client,
    config: ApiConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpNotificationApi {
    pub fn new(config: ApiConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/notifications/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str, action: RemoteAction) -> Result<RequestBuilder> {
        let token = self.credentials.session_token().ok_or_else(|| {
            SyncError::Auth(format!("no session credential for {}", action))
        })?;

        Ok(self
            .http_client
            .request(method, self.url(path))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.config.auth_scheme, token.expose()),
            ))
    }

    async fn execute(&self, request: RequestBuilder, action: RemoteAction) -> Result<reqwest::Response> {
        let response = with_timeout_result(self.config.request_timeout, request.send())
            .await
            .map_err(|e| match e {
                TimeoutError::Elapsed(d) => {
                    SyncError::remote(action, format!("timed out after {:?}", d))
                }
                TimeoutError::OperationFailed(e) => SyncError::remote(action, e.to_string()),
            })?;

        let status = response.status();
        debug!("{} -> {}", action, status);

        if status.is_success() {
            Ok(response)
        } else {
            Err(SyncError::remote(action, describe_status(status)))
        }
    }

    /// Decode the body under the same limit as the request itself
    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        action: RemoteAction,
    ) -> Result<T> {
        with_timeout_result(self.config.request_timeout, response.json::<T>())
            .await
            .map_err(|e| match e {
                TimeoutError::Elapsed(d) => {
                    SyncError::remote(action, format!("response body timed out after {:?}", d))
                }
                TimeoutError::OperationFailed(e) => {
                    SyncError::remote(action, format!("invalid response body: {}", e))
                }
            })
    }

    async fn acknowledge(&self, method: Method, path: &str, action: RemoteAction) -> Result<()> {
        let request = self.request(method, path, action)?;
        self.execute(request, action).await?;
        Ok(())
    }
}

fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("session rejected ({})", status)
        }
        StatusCode::NOT_FOUND => "notification not found".to_string(),
        other => format!("unexpected status {}", other),
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, page: u32, filter: ListFilter) -> Result<Vec<Notification>> {
        let action = RemoteAction::ListNotifications;
        let request = self
            .request(Method::GET, "", action)?
            .query(&[("page", page), ("page_size", self.config.page_size)])
            .query(&filter);

        let response = self.execute(request, action).await?;
        let page: NotificationPage = self.read_json(response, action).await?;

        Ok(page.into_results())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<()> {
        self.acknowledge(Method::PUT, &format!("{}/read/", id), RemoteAction::MarkRead(id))
            .await
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.acknowledge(Method::PUT, "mark-all-read/", RemoteAction::MarkAllRead)
            .await
    }

    async fn dismiss(&self, id: NotificationId) -> Result<()> {
        self.acknowledge(Method::DELETE, &format!("{}/dismiss/", id), RemoteAction::Dismiss(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::credentials::StaticCredentials;

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let mut config = SyncConfig::default().api;
        config.base_url = "http://localhost:8000/api/admin/".to_string();
        let api = HttpNotificationApi::new(config, Arc::new(StaticCredentials::new("t")));

        assert_eq!(
            api.url("12/read/"),
            "http://localhost:8000/api/admin/notifications/12/read/"
        );
        assert_eq!(api.url(""), "http://localhost:8000/api/admin/notifications/");
    }

    #[tokio::test]
    async fn test_missing_credential_is_auth_error() {
        let api = HttpNotificationApi::new(
            SyncConfig::default().api,
            Arc::new(StaticCredentials::none()),
        );

        let result = api.mark_all_read().await;
        assert!(matches!(result, Err(SyncError::Auth(_))));
    }
}
