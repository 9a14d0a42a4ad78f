use async_trait::async_trait;
use planner_core::{
    ApiResponse, ChangeStatusRequest, CreateTaskRequest, RemoteTaskRecord, SyncError,
    SyncResult, UpdateTaskRequest,
};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ClientConfig;

/// The remote source of truth for today's to-dos.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Items for the server's current day only.
    async fn list_today(&self) -> SyncResult<Vec<RemoteTaskRecord>>;
    async fn create(&self, title: &str) -> SyncResult<RemoteTaskRecord>;
    async fn change_status(&self, request: ChangeStatusRequest) -> SyncResult<()>;
    async fn rename(&self, request: UpdateTaskRequest) -> SyncResult<()>;
    async fn delete(&self, id: i64) -> SyncResult<()>;
}

const TODOS_PATH: &str = "/api/v1/todos";

/// REST implementation of [`TaskGateway`].
#[derive(Clone)]
pub struct HttpTaskGateway {
    base_url: String,
    access_token: Option<String>,
    http: HttpClient,
}

impl HttpTaskGateway {
    pub fn new(base_url: &str, access_token: Option<String>, timeout: Duration) -> SyncResult<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            http,
        })
    }

    pub fn from_config(config: &ClientConfig) -> SyncResult<Self> {
        Self::new(
            &config.api_base_url,
            config.access_token.clone(),
            config.request_timeout(),
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and unwraps the response envelope. `Ok(None)` means
    /// the call succeeded without a result payload.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> SyncResult<Option<T>> {
        let resp = builder.send().await.map_err(network_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(network_error)?;

        if body.trim().is_empty() {
            if status.is_success() {
                return Ok(None);
            }
            return Err(rejected(status, None, None));
        }

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(rejected(status, None, None)),
            Err(e) => return Err(e.into()),
        };

        if !status.is_success() || !envelope.is_success {
            return Err(rejected(status, envelope.code, envelope.message));
        }

        Ok(envelope.result)
    }
}

fn network_error(err: reqwest::Error) -> SyncError {
    SyncError::Network(err.to_string())
}

fn rejected(status: StatusCode, code: Option<String>, message: Option<String>) -> SyncError {
    SyncError::RemoteRejected {
        code: code.unwrap_or_else(|| status.as_u16().to_string()),
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn list_today(&self) -> SyncResult<Vec<RemoteTaskRecord>> {
        let records = self
            .send::<Vec<RemoteTaskRecord>>(self.request(Method::GET, TODOS_PATH))
            .await?;
        Ok(records.unwrap_or_default())
    }

    async fn create(&self, title: &str) -> SyncResult<RemoteTaskRecord> {
        let body = CreateTaskRequest {
            title: title.to_string(),
        };
        let record = self
            .send::<RemoteTaskRecord>(self.request(Method::POST, TODOS_PATH).json(&body))
            .await?;
        Ok(record.unwrap_or_default())
    }

    async fn change_status(&self, request: ChangeStatusRequest) -> SyncResult<()> {
        let path = format!("{}/{}/status", TODOS_PATH, request.id);
        self.send::<serde_json::Value>(self.request(Method::PATCH, &path).json(&request))
            .await?;
        Ok(())
    }

    async fn rename(&self, request: UpdateTaskRequest) -> SyncResult<()> {
        let path = format!("{}/{}", TODOS_PATH, request.id);
        self.send::<serde_json::Value>(self.request(Method::PUT, &path).json(&request))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> SyncResult<()> {
        let path = format!("{}/{}", TODOS_PATH, id);
        self.send::<serde_json::Value>(self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }
}
