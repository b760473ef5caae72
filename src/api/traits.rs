//! 后端抽象
//!
//! 所有后端（HTTP / Mock）实现 GameBackend；流式叙事以带标签的事件序列表达：
//! Chunk(文本) 或 Done，错误作为流元素的 Err 出现。序列有限且不可重启，
//! 以 Done、流自然结束或 Err 终止。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::api::error::ApiError;
use crate::api::types::{
    AgentKind, AgentReply, PlayReply, PlayRequest, SessionCreated, SessionStatus,
};

/// 流式叙事事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NarrationEvent {
    /// 一段原样追加的叙事文本
    Chunk(String),
    /// 完成哨兵（或流自然结束）
    Done,
}

/// 叙事事件流
pub type NarrationStream = Pin<Box<dyn Stream<Item = Result<NarrationEvent, ApiError>> + Send>>;

/// 游戏后端 trait：会话创建、状态查询、Agent 调度、叙事回合
#[async_trait]
pub trait GameBackend: Send + Sync {
    /// POST /sessions
    async fn create_session(&self, proposed_id: Option<String>)
        -> Result<SessionCreated, ApiError>;

    /// GET /sessions/{id}
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, ApiError>;

    /// POST /agents/{kind}/process，单次请求/响应
    async fn process(
        &self,
        agent: AgentKind,
        session_id: &str,
        user_input: &str,
    ) -> Result<AgentReply, ApiError>;

    /// POST /game/play，非流式叙事回合
    async fn play(&self, request: PlayRequest) -> Result<PlayReply, ApiError>;

    /// POST /game/play/stream，打开叙事事件流
    async fn play_stream(&self, request: PlayRequest) -> Result<NarrationStream, ApiError>;
}
