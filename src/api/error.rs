//! API 边界错误类型
//!
//! 非成功响应携带 `{detail}`，能解析时以 detail 作为用户可见信息，否则用通用提示。

use serde::Deserialize;
use thiserror::Error;

/// 后端调用过程中可能出现的错误（传输、非成功状态、流格式等）
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error("Unexpected content type: {0}")]
    InvalidContentType(String),

    #[error("Stream failed: {0}")]
    Stream(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// FastAPI 风格错误体
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// 从非成功响应体构造：优先取 `{detail}`，否则通用提示
    pub fn from_status_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| "服务端返回了错误".to_string());
        ApiError::Backend { status, detail }
    }

    /// 展示给玩家的错误文案
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { detail, .. } => detail.clone(),
            ApiError::Network(_) => "无法连接到游戏服务器".to_string(),
            ApiError::InvalidContentType(_) => "服务端返回了意外的流格式".to_string(),
            ApiError::Stream(_) => "叙事流中断".to_string(),
            ApiError::Decode(_) => "无法解析服务端响应".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_extracted_from_body() {
        let e = ApiError::from_status_body(404, r#"{"detail": "会话不存在"}"#);
        assert_eq!(e.user_message(), "会话不存在");
    }

    #[test]
    fn test_fallback_on_opaque_body() {
        let e = ApiError::from_status_body(502, "<html>Bad Gateway</html>");
        assert_eq!(e.user_message(), "服务端返回了错误");
    }
}
