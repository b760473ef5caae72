//! HTTP 后端实现
//!
//! 通过 reqwest 调用后端 JSON API；请求与流式读取使用各自的超时。
//! 非成功响应读取 `{detail}` 转为 ApiError::Backend。

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::api::error::ApiError;
use crate::api::sse::narration_stream;
use crate::api::traits::{GameBackend, NarrationStream};
use crate::api::types::{
    AgentKind, AgentProcessRequest, AgentReply, PlayReply, PlayRequest, SessionCreateRequest,
    SessionCreated, SessionStatus,
};

/// HTTP 后端：持有 base_url 与两个 Client（普通请求 / 流式读取）
pub struct HttpBackend {
    client: Client,
    stream_client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, request_timeout_secs: u64, stream_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_secs))
            .build()
            .unwrap_or_default();
        let stream_client = Client::builder()
            .timeout(std::time::Duration::from_secs(stream_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            stream_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 非成功状态转为携带 detail 的错误
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status_body(status.as_u16(), &body))
    }
}

#[async_trait]
impl GameBackend for HttpBackend {
    async fn create_session(
        &self,
        proposed_id: Option<String>,
    ) -> Result<SessionCreated, ApiError> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&SessionCreateRequest {
                session_id: proposed_id,
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{}", session_id)))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn process(
        &self,
        agent: AgentKind,
        session_id: &str,
        user_input: &str,
    ) -> Result<AgentReply, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/agents/{}/process", agent.as_str())))
            .json(&AgentProcessRequest {
                session_id: session_id.to_string(),
                user_input: user_input.to_string(),
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn play(&self, request: PlayRequest) -> Result<PlayReply, ApiError> {
        let response = self
            .client
            .post(self.url("/game/play"))
            .json(&request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn play_stream(&self, request: PlayRequest) -> Result<NarrationStream, ApiError> {
        let response = self
            .stream_client
            .post(self.url("/game/play/stream"))
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        // 协商的内容类型不对视为打开失败
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("text/event-stream") {
            return Err(ApiError::InvalidContentType(content_type));
        }

        Ok(narration_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let b = HttpBackend::new("http://127.0.0.1:8000/api/", 60, 120);
        assert_eq!(b.url("/sessions"), "http://127.0.0.1:8000/api/sessions");
    }
}
