//! 会话编排器：主控循环
//!
//! 负责：选择后端（HTTP / Mock）、建立 cmd/state 双通道，并在后台任务中消费
//! 用户命令（Submit/NewGame/Quit）与在途操作回报的内部事件，驱动阶段状态机。
//! 所有会话状态由编排器任务独占；网络操作以独立任务发出，结果经内部事件
//! 通道带着「局号」送回，旧局的事件一律丢弃。

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{
    AgentKind, AgentReply, ApiError, GameBackend, HttpBackend, MockBackend, NarrationEvent,
    PlayReply, PlayRequest, SessionCreated,
};
use crate::config::{AppConfig, GameSection};
use crate::core::error::SessionError;
use crate::core::readiness::{poll_until_ready, PollOutcome};
use crate::core::state::{SessionRecord, UiState};
use crate::session::{CharacterState, GamePhase, Sender, StreamingEntry, WorldState};

/// 世界/角色创建阶段的固定开场白（合成输入，不进时间线）
const OPENING_GREETING: &str = "你好";
/// 进入冒险阶段的隐式首回合触发词（发给后端但从时间线中抑制）
const GAMEPLAY_TRIGGER: &str = "begin";
/// 后端在终局叙事中嵌入的结束标记
const GAME_OVER_MARKER: &str = "游戏结束";

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交玩家输入，按当前阶段分派
    Submit(String),
    /// 重开新局（启动时也会自动触发一次）
    NewGame,
    /// 退出应用
    Quit,
}

/// 在途操作的结果，由后台任务送回编排器
enum SessionEvent {
    SessionCreated(Result<SessionCreated, ApiError>),
    AgentReplied {
        agent: AgentKind,
        result: Result<AgentReply, ApiError>,
    },
    /// 叙事流握手成功，可以打开流式条目
    StreamOpened,
    NarrationChunk(String),
    /// 叙事流终止：Ok 表示完成（哨兵或自然结束），Err 表示打开失败或中途出错
    NarrationClosed(Result<(), ApiError>),
    PlayReplied(Result<PlayReply, ApiError>),
    Readiness(PollOutcome),
}

/// 根据配置选择后端：配置了 base_url 走 HTTP，否则落回离线 Mock
pub fn create_backend_from_config(cfg: &AppConfig) -> Arc<dyn GameBackend> {
    match cfg.server.base_url.as_deref().filter(|s| !s.is_empty()) {
        Some(url) => {
            tracing::info!("Using HTTP backend ({})", url);
            Arc::new(HttpBackend::new(
                url,
                cfg.server.request_timeout_secs,
                cfg.server.stream_timeout_secs,
            ))
        }
        None => {
            tracing::warn!("No server base_url configured, using offline mock backend");
            Arc::new(MockBackend::new())
        }
    }
}

/// 创建会话运行时：返回命令发送端与状态接收端；后台任务消费命令并投影状态。
/// 启动时自动发起一次会话创建。
pub fn create_runtime(
    backend: Arc<dyn GameBackend>,
    game_cfg: GameSection,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::default());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<(u64, SessionEvent)>();

    let mut orch = Orchestrator {
        backend,
        cfg: game_cfg,
        record: SessionRecord::new(),
        generation: 0,
        poller_cancel: CancellationToken::new(),
        open_entry: None,
        event_tx,
        state_tx,
    };

    tokio::spawn(async move {
        orch.start_new_game();
        loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => match cmd {
                    Command::Submit(input) => orch.handle_submit(input),
                    Command::NewGame => orch.start_new_game(),
                    Command::Quit => {
                        orch.poller_cancel.cancel();
                        break;
                    }
                },
                Some((gen, event)) = event_rx.recv() => {
                    if gen == orch.generation {
                        orch.handle_event(event);
                    } else {
                        tracing::debug!("stale event from a previous game dropped");
                    }
                }
                else => break,
            }
        }
    });

    (cmd_tx, state_rx)
}

/// 配置一步到位的运行时创建（main 用）
pub fn create_session_runtime(
    cfg: &AppConfig,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let backend = create_backend_from_config(cfg);
    create_runtime(backend, cfg.game.clone())
}

struct Orchestrator {
    backend: Arc<dyn GameBackend>,
    cfg: GameSection,
    record: SessionRecord,
    /// 局号：NewGame 时递增，旧局在途事件据此丢弃
    generation: u64,
    poller_cancel: CancellationToken,
    open_entry: Option<StreamingEntry>,
    event_tx: mpsc::UnboundedSender<(u64, SessionEvent)>,
    state_tx: watch::Sender<UiState>,
}

impl Orchestrator {
    fn push_state(&self) {
        let _ = self.state_tx.send(self.record.project());
    }

    /// 重建会话记录并发起 POST /sessions
    fn start_new_game(&mut self) {
        self.generation += 1;
        self.poller_cancel.cancel();
        self.poller_cancel = CancellationToken::new();
        self.record = SessionRecord::new();
        self.open_entry = None;
        self.record.busy = true;
        self.push_state();

        let gen = self.generation;
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = backend
                .create_session(Some(Uuid::new_v4().to_string()))
                .await;
            let _ = tx.send((gen, SessionEvent::SessionCreated(result)));
        });
    }

    fn handle_submit(&mut self, input: String) {
        let input = input.trim().to_string();
        if input.is_empty() {
            return;
        }
        if self.record.input_locked() {
            tracing::debug!("input ignored while busy/awaiting or phase disallows");
            return;
        }
        // 缺少会话 id 属于调用时序 bug，静默忽略而不提示玩家
        let Some(session_id) = self.record.session_id.clone() else {
            tracing::warn!("submit without an active session ignored");
            return;
        };

        self.record.last_error = None;
        self.record.transcript.append(Sender::Player, input.as_str());
        match self.record.phase {
            GamePhase::WorldCreation => {
                self.dispatch_agent(AgentKind::WorldBuilder, session_id, input)
            }
            GamePhase::CharacterCreation => {
                self.dispatch_agent(AgentKind::CharacterManager, session_id, input)
            }
            GamePhase::Gameplay => self.dispatch_turn(session_id, input),
            GamePhase::Init | GamePhase::GameOver => {}
        }
        self.push_state();
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SessionCreated(Ok(created)) => {
                self.record.busy = false;
                self.record.session_id = Some(created.session_id);
                self.record
                    .transcript
                    .append(Sender::System, created.message);
                self.record.phase = GamePhase::WorldCreation;
                tracing::info!("session created, entering world creation");
                self.open_phase_dispatch(AgentKind::WorldBuilder);
            }
            SessionEvent::SessionCreated(Err(e)) => {
                tracing::warn!("session create failed: {}", e);
                self.record.busy = false;
                self.record.last_error = Some(e.user_message());
            }
            SessionEvent::AgentReplied { agent, result } => self.on_agent_replied(agent, result),
            SessionEvent::StreamOpened => {
                self.open_entry = Some(
                    self.record
                        .transcript
                        .open_streaming(Sender::DungeonMaster),
                );
            }
            SessionEvent::NarrationChunk(text) => {
                if let Some(entry) = &self.open_entry {
                    self.record.transcript.append_chunk(entry, &text);
                }
            }
            SessionEvent::NarrationClosed(result) => self.on_narration_closed(result),
            SessionEvent::PlayReplied(result) => self.on_play_replied(result),
            SessionEvent::Readiness(outcome) => self.on_readiness(outcome),
        }
        self.push_state();
    }

    /// 阶段开场的合成调度：固定开场白，不追加玩家消息
    fn open_phase_dispatch(&mut self, agent: AgentKind) {
        let Some(session_id) = self.record.session_id.clone() else {
            return;
        };
        self.dispatch_agent(agent, session_id, OPENING_GREETING.to_string());
    }

    fn dispatch_agent(&mut self, agent: AgentKind, session_id: String, input: String) {
        self.record.busy = true;
        let gen = self.generation;
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = backend.process(agent, &session_id, &input).await;
            let _ = tx.send((gen, SessionEvent::AgentReplied { agent, result }));
        });
    }

    /// 冒险回合：按配置走流式或非流式端点
    fn dispatch_turn(&mut self, session_id: String, input: String) {
        self.record.busy = true;
        let gen = self.generation;
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        let request = PlayRequest {
            session_id,
            user_input: input,
        };

        if self.cfg.streaming {
            tokio::spawn(async move {
                match backend.play_stream(request).await {
                    Ok(mut stream) => {
                        let _ = tx.send((gen, SessionEvent::StreamOpened));
                        while let Some(event) = stream.next().await {
                            match event {
                                Ok(NarrationEvent::Chunk(text)) => {
                                    let _ = tx.send((gen, SessionEvent::NarrationChunk(text)));
                                }
                                Ok(NarrationEvent::Done) => {
                                    let _ =
                                        tx.send((gen, SessionEvent::NarrationClosed(Ok(()))));
                                    return;
                                }
                                Err(e) => {
                                    let _ =
                                        tx.send((gen, SessionEvent::NarrationClosed(Err(e))));
                                    return;
                                }
                            }
                        }
                        // 哨兵之前流自然结束，同样视为完成
                        let _ = tx.send((gen, SessionEvent::NarrationClosed(Ok(()))));
                    }
                    Err(e) => {
                        let _ = tx.send((gen, SessionEvent::NarrationClosed(Err(e))));
                    }
                }
            });
        } else {
            tokio::spawn(async move {
                let result = backend.play(request).await;
                let _ = tx.send((gen, SessionEvent::PlayReplied(result)));
            });
        }
    }

    fn on_agent_replied(&mut self, agent: AgentKind, result: Result<AgentReply, ApiError>) {
        self.record.busy = false;
        let reply = match result {
            Ok(r) => r,
            Err(e) => {
                // 阶段不变，清除 busy 后玩家可从原阶段重试
                tracing::warn!(agent = agent.as_str(), "agent dispatch failed: {}", e);
                self.record.last_error = Some(e.user_message());
                return;
            }
        };

        self.record
            .transcript
            .append(Sender::DungeonMaster, reply.response);

        match agent {
            AgentKind::WorldBuilder => {
                self.record.world = WorldState::from_value(reply.updated_state);
                if reply.is_complete && self.record.phase == GamePhase::WorldCreation {
                    self.record.phase = GamePhase::CharacterCreation;
                    tracing::info!("world complete, entering character creation");
                    self.open_phase_dispatch(AgentKind::CharacterManager);
                }
            }
            AgentKind::CharacterManager => {
                self.record.character = CharacterState::from_value(reply.updated_state);
                if reply.is_complete && self.record.phase == GamePhase::CharacterCreation {
                    self.start_readiness_poll();
                }
            }
        }
    }

    /// 角色创建完成并不直接进入冒险：先等后端就绪
    fn start_readiness_poll(&mut self) {
        let Some(session_id) = self.record.session_id.clone() else {
            return;
        };
        self.record.awaiting_readiness = true;
        tracing::info!("character complete, polling backend readiness");

        let gen = self.generation;
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        let cancel = self.poller_cancel.child_token();
        let interval = Duration::from_millis(self.cfg.readiness_poll_interval_ms);
        let max_ticks = self.cfg.readiness_timeout_ticks;
        tokio::spawn(async move {
            if let Some(outcome) =
                poll_until_ready(backend, session_id, interval, max_ticks, cancel).await
            {
                let _ = tx.send((gen, SessionEvent::Readiness(outcome)));
            }
        });
    }

    fn on_readiness(&mut self, outcome: PollOutcome) {
        // 已重开或已推进的过期结果直接抑制
        if !self.record.awaiting_readiness || self.record.phase != GamePhase::CharacterCreation {
            tracing::debug!("readiness outcome after the wait was settled, dropped");
            return;
        }
        self.record.awaiting_readiness = false;

        match outcome {
            PollOutcome::Ready => {
                self.record.phase = GamePhase::Gameplay;
                tracing::info!("backend ready, entering gameplay");
                if let Some(session_id) = self.record.session_id.clone() {
                    self.dispatch_turn(session_id, GAMEPLAY_TRIGGER.to_string());
                }
            }
            PollOutcome::ProbeFailed(e) => {
                self.record.last_error =
                    Some(SessionError::ReadinessProbeFailed(e.user_message()).user_message());
            }
            PollOutcome::TimedOut => {
                if self.record.last_error.is_none() {
                    self.record.last_error = Some(SessionError::ReadinessTimeout.user_message());
                }
            }
        }
    }

    fn on_narration_closed(&mut self, result: Result<(), ApiError>) {
        self.record.busy = false;
        let final_text = self
            .open_entry
            .take()
            .map(|entry| self.record.transcript.close_streaming(entry));

        match result {
            Ok(()) => {
                if final_text
                    .as_deref()
                    .is_some_and(|t| t.contains(GAME_OVER_MARKER))
                {
                    self.record.phase = GamePhase::GameOver;
                    tracing::info!("game over marker observed in narration");
                }
            }
            Err(e) => {
                // 已接收的部分叙事保留在时间线上
                tracing::warn!("narration stream failed: {}", e);
                self.record.last_error = Some(e.user_message());
            }
        }
    }

    fn on_play_replied(&mut self, result: Result<PlayReply, ApiError>) {
        self.record.busy = false;
        match result {
            Ok(reply) => {
                self.record
                    .transcript
                    .append(Sender::DungeonMaster, reply.narrative);
                if reply.is_game_over {
                    self.record.phase = GamePhase::GameOver;
                    tracing::info!("game over reported by play endpoint");
                }
            }
            Err(e) => {
                self.record.last_error = Some(e.user_message());
            }
        }
    }
}
