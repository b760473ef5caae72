//! 编排器错误类型
//!
//! 就绪等待的两种终止错误需要与普通请求失败区分：
//! 查询失败是致命的（不再重试），超时只在没有其他错误时记录。

use thiserror::Error;

use crate::api::ApiError;

/// 会话推进过程中的错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Readiness probe failed: {0}")]
    ReadinessProbeFailed(String),

    #[error("Readiness never observed within the timeout")]
    ReadinessTimeout,
}

impl SessionError {
    /// 展示给玩家的错误文案
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            SessionError::ReadinessProbeFailed(detail) => {
                format!("无法确认游戏准备状态：{}", detail)
            }
            SessionError::ReadinessTimeout => "等待游戏准备超时，请重新开始".to_string(),
        }
    }
}
