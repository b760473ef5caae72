//! 会话编排集成测试
//!
//! 用脚本化的 Mock 后端驱动完整运行时：预置各端点的响应队列，
//! 通过 cmd_tx 发命令，在 state_rx 上等待投影满足断言条件。

use std::sync::Arc;
use std::time::Duration;

use aidm::api::{AgentReply, ApiError, MockBackend, NarrationEvent, PlayReply, SessionStatus};
use aidm::config::GameSection;
use aidm::core::{create_runtime, Command, UiState};
use aidm::session::{GamePhase, Sender};
use serde_json::json;
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(2);

async fn wait_for(
    rx: &mut watch::Receiver<UiState>,
    pred: impl FnMut(&UiState) -> bool,
) -> UiState {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("state change timed out")
        .expect("runtime dropped")
        .clone()
}

/// 轮询间隔缩到毫秒级，让超时场景在测试中可等待
fn fast_game() -> GameSection {
    GameSection {
        readiness_poll_interval_ms: 10,
        readiness_timeout_ticks: 3,
        streaming: true,
    }
}

fn world_reply(response: &str, is_complete: bool, state: serde_json::Value) -> AgentReply {
    AgentReply {
        response: response.to_string(),
        is_complete,
        updated_state: state,
    }
}

fn not_ready_status() -> SessionStatus {
    SessionStatus {
        session_id: "s1".to_string(),
        ..SessionStatus::default()
    }
}

#[tokio::test]
async fn test_demo_game_reaches_gameplay() {
    let backend = Arc::new(MockBackend::new());
    let (_cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    let state = wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::Gameplay && !s.input_locked
    })
    .await;

    // 开局回合由触发词隐式发起，触发词只发给后端，不进时间线
    assert!(backend.sent_inputs().iter().any(|i| i == "begin"));
    assert!(state.messages.iter().all(|m| m.text != "begin"));

    // 默认脚本的流式开场叙事拼为一条 DM 消息
    let dm_text = &state
        .messages
        .iter()
        .rev()
        .find(|m| m.sender == Sender::DungeonMaster)
        .expect("DM narration present")
        .text;
    assert_eq!(dm_text, "（离线演示）风从林间穿过，你的冒险开始了。");

    // 创建阶段从未调用过叙事端点
    assert_eq!(backend.play_calls(), 0);
    assert_eq!(backend.stream_calls(), 1);
}

#[tokio::test]
async fn test_world_incomplete_reply_keeps_phase() {
    let backend = Arc::new(MockBackend::new());
    // 开场调度的回复
    backend.push_process(Ok(world_reply("欢迎，说说你想要的世界。", false, json!({}))));
    // 玩家输入的回复
    backend.push_process(Ok(world_reply(
        "Name your world",
        false,
        json!({"geography": "forest"}),
    )));

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::WorldCreation && !s.input_locked
    })
    .await;

    cmd_tx.send(Command::Submit("Hello".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.messages.iter().any(|m| m.text == "Name your world")
    })
    .await;

    assert_eq!(state.phase, GamePhase::WorldCreation);
    assert_eq!(state.world_progress, (1, 5));

    let tail: Vec<_> = state.messages.iter().rev().take(2).collect();
    assert_eq!(tail[1].sender, Sender::Player);
    assert_eq!(tail[1].text, "Hello");
    assert_eq!(tail[0].sender, Sender::DungeonMaster);
    assert_eq!(tail[0].text, "Name your world");

    // 创建阶段不得触发叙事回合
    assert_eq!(backend.play_calls(), 0);
    assert_eq!(backend.stream_calls(), 0);

    // 下一轮回复整体替换世界状态：geography 不再保留
    backend.push_process(Ok(world_reply(
        "世界有名字了",
        false,
        json!({"name": "艾泽"}),
    )));
    cmd_tx.send(Command::Submit("叫艾泽吧".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.messages.iter().any(|m| m.text == "世界有名字了")
    })
    .await;
    assert_eq!(state.world_progress, (1, 5));
}

#[tokio::test]
async fn test_world_complete_auto_dispatches_character_agent() {
    let backend = Arc::new(MockBackend::new());
    backend.push_process(Ok(world_reply("开始创建世界。", false, json!({}))));
    backend.push_process(Ok(world_reply(
        "世界已经完整。",
        true,
        json!({"name": "艾泽", "geography": "群山"}),
    )));
    // 自动发起的角色开场调度
    backend.push_process(Ok(world_reply("现在来创建你的角色。", false, json!({}))));

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::WorldCreation && !s.input_locked
    })
    .await;
    cmd_tx.send(Command::Submit("就这样吧".to_string())).unwrap();

    let state = wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::CharacterCreation && !s.input_locked
    })
    .await;

    // 开场 + 玩家一轮 + 自动角色开场
    assert_eq!(backend.process_calls(), 3);
    assert!(state
        .messages
        .iter()
        .any(|m| m.text == "现在来创建你的角色。"));
}

#[tokio::test]
async fn test_busy_gate_drops_second_submit() {
    let backend = Arc::new(MockBackend::new());
    backend.push_process(Ok(world_reply("开场。", false, json!({}))));
    backend.push_process(Ok(world_reply("收到第一条。", false, json!({}))));

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());
    wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::WorldCreation && !s.input_locked
    })
    .await;

    // 拉长在途窗口，保证第二条提交落在 busy 期间
    backend.set_process_delay(Duration::from_millis(150));
    cmd_tx.send(Command::Submit("第一条".to_string())).unwrap();
    cmd_tx.send(Command::Submit("第二条".to_string())).unwrap();

    let state = wait_for(&mut state_rx, |s| {
        s.messages.iter().any(|m| m.text == "收到第一条。")
    })
    .await;

    // busy 期间的第二条：不追加消息，也不发起网络调用
    assert_eq!(backend.process_calls(), 2);
    assert!(state.messages.iter().all(|m| m.text != "第二条"));
}

#[tokio::test]
async fn test_dispatch_failure_keeps_phase_and_player_message() {
    let backend = Arc::new(MockBackend::new());
    backend.push_process(Ok(world_reply("开场。", false, json!({}))));
    backend.push_process(Err(ApiError::Backend {
        status: 500,
        detail: "处理失败".to_string(),
    }));
    // 重试用
    backend.push_process(Ok(world_reply("这次成功了。", false, json!({}))));

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());
    wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::WorldCreation && !s.input_locked
    })
    .await;

    cmd_tx.send(Command::Submit("测试".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| s.error_message.is_some()).await;

    // 失败不追加 DM 消息，玩家消息保留，阶段不变，busy 已清除
    assert_eq!(state.phase, GamePhase::WorldCreation);
    assert!(!state.input_locked);
    assert_eq!(state.error_message.as_deref(), Some("处理失败"));
    let last = state.messages.last().unwrap();
    assert_eq!(last.sender, Sender::Player);
    assert_eq!(last.text, "测试");

    // 同一阶段可直接重试，错误随之清除
    cmd_tx.send(Command::Submit("再试".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.messages.iter().any(|m| m.text == "这次成功了。")
    })
    .await;
    assert!(state.error_message.is_none());
}

#[tokio::test]
async fn test_readiness_timeout_keeps_character_phase() {
    let backend = Arc::new(MockBackend::new());
    backend.push_process(Ok(world_reply("世界好了。", true, json!({"name": "w"}))));
    backend.push_process(Ok(world_reply("角色也好了。", true, json!({"name": "c"}))));
    for _ in 0..10 {
        backend.push_status(Ok(not_ready_status()));
    }

    let (_cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    let state = wait_for(&mut state_rx, |s| {
        s.error_message.as_deref().is_some_and(|e| e.contains("超时"))
    })
    .await;

    assert_eq!(state.phase, GamePhase::CharacterCreation);
    assert!(!state.awaiting_readiness);
    // 超时前从未进入冒险阶段
    assert_eq!(backend.stream_calls(), 0);
}

#[tokio::test]
async fn test_readiness_probe_failure_is_fatal() {
    let backend = Arc::new(MockBackend::new());
    backend.push_process(Ok(world_reply("世界好了。", true, json!({"name": "w"}))));
    backend.push_process(Ok(world_reply("角色也好了。", true, json!({"name": "c"}))));
    backend.push_status(Err(ApiError::Backend {
        status: 404,
        detail: "会话不存在".to_string(),
    }));

    let (_cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    let state = wait_for(&mut state_rx, |s| {
        s.error_message
            .as_deref()
            .is_some_and(|e| e.contains("无法确认游戏准备状态"))
    })
    .await;

    assert_eq!(state.phase, GamePhase::CharacterCreation);
    // 单次查询失败即放弃，不再轮询
    assert_eq!(backend.status_calls(), 1);
}

#[tokio::test]
async fn test_stream_error_preserves_partial_narration() {
    let backend = Arc::new(MockBackend::new());
    backend.push_stream(vec![
        Ok(NarrationEvent::Chunk("雾中传来脚步声，".to_string())),
        Err(ApiError::Stream("connection reset".to_string())),
    ]);

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());
    let state = wait_for(&mut state_rx, |s| s.error_message.is_some()).await;

    // 已接收的部分叙事保留，busy 已清除，阶段未变
    assert_eq!(state.phase, GamePhase::Gameplay);
    assert!(!state.input_locked);
    assert!(state
        .messages
        .iter()
        .any(|m| m.sender == Sender::DungeonMaster && m.text == "雾中传来脚步声，"));

    // 下一回合可以正常发起（默认脚本完整走完）
    cmd_tx.send(Command::Submit("继续前进".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.messages
            .iter()
            .any(|m| m.text.contains("你的冒险开始了"))
    })
    .await;
    assert!(state.error_message.is_none());
    assert_eq!(backend.stream_calls(), 2);
}

#[tokio::test]
async fn test_game_over_marker_ends_session() {
    let backend = Arc::new(MockBackend::new());
    backend.push_stream(vec![
        Ok(NarrationEvent::Chunk("你战胜了巨龙。".to_string())),
        Ok(NarrationEvent::Chunk("游戏结束".to_string())),
        Ok(NarrationEvent::Done),
    ]);

    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());
    let state = wait_for(&mut state_rx, |s| s.phase == GamePhase::GameOver).await;
    assert!(state.input_locked);

    // 终态后的输入被忽略：不再有网络调用
    cmd_tx.send(Command::Submit("再来一回合".to_string())).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.stream_calls(), 1);
    let state = state_rx.borrow().clone();
    assert!(state.messages.iter().all(|m| m.text != "再来一回合"));
}

#[tokio::test]
async fn test_non_streaming_turn_reports_game_over() {
    let backend = Arc::new(MockBackend::new());
    backend.push_play(Ok(PlayReply {
        narrative: "故事落幕。游戏结束".to_string(),
        inner_monologue: String::new(),
        is_game_over: true,
    }));

    let cfg = GameSection {
        streaming: false,
        ..fast_game()
    };
    let (_cmd_tx, mut state_rx) = create_runtime(backend.clone(), cfg);

    let state = wait_for(&mut state_rx, |s| s.phase == GamePhase::GameOver).await;
    assert_eq!(backend.play_calls(), 1);
    assert_eq!(backend.stream_calls(), 0);
    assert!(state
        .messages
        .iter()
        .any(|m| m.sender == Sender::DungeonMaster && m.text.contains("故事落幕")));
}

#[tokio::test]
async fn test_new_game_resets_session() {
    let backend = Arc::new(MockBackend::new());
    let (cmd_tx, mut state_rx) = create_runtime(backend.clone(), fast_game());

    wait_for(&mut state_rx, |s| s.phase == GamePhase::Gameplay).await;

    // 新局的世界开场回复保持未完成，阶段停在世界创建
    backend.push_process(Ok(world_reply("新的世界开场。", false, json!({}))));
    cmd_tx.send(Command::NewGame).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.phase == GamePhase::WorldCreation
            && s.messages.iter().any(|m| m.text == "新的世界开场。")
    })
    .await;

    // 新局时间线只有欢迎语与世界开场回复
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.world_progress.0, 0);
}
