//! Mock 后端（离线演示与测试用，无需服务器）
//!
//! 每个端点持有一个脚本队列，队列取空后落回内置的演示响应：
//! Agent 一轮即完成、就绪查询立即就绪、叙事流推送一小段开场。
//! 测试通过 push_* 预置响应与错误，并读取调用计数验证门禁行为。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::traits::{GameBackend, NarrationEvent, NarrationStream};
use crate::api::types::{AgentKind, AgentReply, PlayReply, PlayRequest, SessionCreated, SessionStatus};

/// Mock 后端：脚本化响应 + 调用记录
#[derive(Default)]
pub struct MockBackend {
    create_replies: Mutex<VecDeque<Result<SessionCreated, ApiError>>>,
    process_replies: Mutex<VecDeque<Result<AgentReply, ApiError>>>,
    status_replies: Mutex<VecDeque<Result<SessionStatus, ApiError>>>,
    play_replies: Mutex<VecDeque<Result<PlayReply, ApiError>>>,
    stream_scripts: Mutex<VecDeque<Vec<Result<NarrationEvent, ApiError>>>>,
    /// process 调用前的延迟，用于制造「请求在途」窗口
    process_delay: Mutex<Duration>,

    process_calls: AtomicUsize,
    status_calls: AtomicUsize,
    play_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    /// 发往 Agent 与叙事端点的 user_input 记录
    sent_inputs: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create(&self, reply: Result<SessionCreated, ApiError>) {
        self.create_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_process(&self, reply: Result<AgentReply, ApiError>) {
        self.process_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_status(&self, reply: Result<SessionStatus, ApiError>) {
        self.status_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_play(&self, reply: Result<PlayReply, ApiError>) {
        self.play_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_stream(&self, events: Vec<Result<NarrationEvent, ApiError>>) {
        self.stream_scripts.lock().unwrap().push_back(events);
    }

    pub fn set_process_delay(&self, delay: Duration) {
        *self.process_delay.lock().unwrap() = delay;
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn sent_inputs(&self) -> Vec<String> {
        self.sent_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameBackend for MockBackend {
    async fn create_session(
        &self,
        proposed_id: Option<String>,
    ) -> Result<SessionCreated, ApiError> {
        if let Some(reply) = self.create_replies.lock().unwrap().pop_front() {
            return reply;
        }
        Ok(SessionCreated {
            session_id: proposed_id.unwrap_or_else(|| "mock-session".to_string()),
            message: "（离线演示）欢迎来到 AI 地下城主世界！".to_string(),
        })
    }

    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = self.status_replies.lock().unwrap().pop_front() {
            return reply;
        }
        Ok(SessionStatus {
            session_id: session_id.to_string(),
            world_complete: true,
            character_complete: true,
            ready_for_game: true,
            ..SessionStatus::default()
        })
    }

    async fn process(
        &self,
        agent: AgentKind,
        _session_id: &str,
        user_input: &str,
    ) -> Result<AgentReply, ApiError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_inputs
            .lock()
            .unwrap()
            .push(user_input.to_string());

        let delay = *self.process_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = self.process_replies.lock().unwrap().pop_front() {
            return reply;
        }
        let (response, updated_state) = match agent {
            AgentKind::WorldBuilder => (
                "（离线演示）一个雾气缭绕的森林世界已经成形。",
                json!({"name": "迷雾森林", "geography": "古树与沼泽"}),
            ),
            AgentKind::CharacterManager => (
                "（离线演示）你的冒险者已就位。",
                json!({"name": "无名旅人", "background": "失忆的游侠"}),
            ),
        };
        Ok(AgentReply {
            response: response.to_string(),
            is_complete: true,
            updated_state,
        })
    }

    async fn play(&self, request: PlayRequest) -> Result<PlayReply, ApiError> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_inputs.lock().unwrap().push(request.user_input);
        if let Some(reply) = self.play_replies.lock().unwrap().pop_front() {
            return reply;
        }
        Ok(PlayReply {
            narrative: "（离线演示）夜色降临，篝火噼啪作响。".to_string(),
            inner_monologue: String::new(),
            is_game_over: false,
        })
    }

    async fn play_stream(&self, request: PlayRequest) -> Result<NarrationStream, ApiError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_inputs.lock().unwrap().push(request.user_input);
        let events = self
            .stream_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                vec![
                    Ok(NarrationEvent::Chunk("（离线演示）风从林间穿过，".to_string())),
                    Ok(NarrationEvent::Chunk("你的冒险开始了。".to_string())),
                    Ok(NarrationEvent::Done),
                ]
            });
        Ok(Box::pin(stream::iter(events)))
    }
}
