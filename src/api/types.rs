//! 后端 API 的请求/响应类型
//!
//! 与后端 JSON 契约一一对应；updated_state 保持松散 Value，
//! 由会话层在边界处转为静态形状。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{CharacterState, WorldState};

/// 可调用的后端 Agent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    WorldBuilder,
    CharacterManager,
}

impl AgentKind {
    /// URL 路径段
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::WorldBuilder => "world-builder",
            AgentKind::CharacterManager => "character-manager",
        }
    }
}

/// POST /sessions 请求体
#[derive(Debug, Serialize)]
pub struct SessionCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// POST /sessions 响应
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
    /// 欢迎语，作为系统消息展示
    pub message: String,
}

/// GET /sessions/{id} 响应（就绪轮询用）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionStatus {
    pub session_id: String,
    pub world_complete: bool,
    pub character_complete: bool,
    pub ready_for_game: bool,
    pub world_state: WorldState,
    pub character_state: CharacterState,
}

/// POST /agents/{kind}/process 请求体
#[derive(Debug, Serialize)]
pub struct AgentProcessRequest {
    pub session_id: String,
    pub user_input: String,
}

/// POST /agents/{kind}/process 响应
#[derive(Debug, Clone, Deserialize)]
pub struct AgentReply {
    pub response: String,
    pub is_complete: bool,
    #[serde(default)]
    pub updated_state: Value,
}

/// POST /game/play 与 /game/play/stream 请求体
#[derive(Debug, Serialize)]
pub struct PlayRequest {
    pub session_id: String,
    pub user_input: String,
}

/// POST /game/play 响应（非流式）
#[derive(Debug, Clone, Deserialize)]
pub struct PlayReply {
    pub narrative: String,
    #[serde(default)]
    pub inner_monologue: String,
    #[serde(default)]
    pub is_game_over: bool,
}
