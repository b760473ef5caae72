//! 状态定义：SessionRecord 与 UiState 投影
//!
//! UI 只持有轻量的 UiState（阶段、时间线、锁、错误、进度）；
//! 完整的会话记录由编排器独占并在每次变更后投影到 UiState。

use serde::Serialize;

use crate::session::{CharacterState, ChatMessage, GamePhase, Transcript, WorldState};

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub phase: GamePhase,
    pub messages: Vec<ChatMessage>,
    /// (已填写, 总数)
    pub world_progress: (usize, usize),
    pub character_progress: (usize, usize),
    pub input_locked: bool,
    pub error_message: Option<String>,
    /// 就绪轮询进行中（状态栏提示用）
    pub awaiting_readiness: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            phase: GamePhase::Init,
            messages: Vec::new(),
            world_progress: (0, 5),
            character_progress: (0, 5),
            input_locked: true,
            error_message: None,
            awaiting_readiness: false,
        }
    }
}

/// 会话记录：编排器独占的完整内部状态
///
/// 不变式：同一时刻最多一个推进阶段的网络操作在途（busy 门禁）；
/// session_id 一经设置不再更改，仅在重开新局时整体重建记录。
#[derive(Debug, Default)]
pub struct SessionRecord {
    pub session_id: Option<String>,
    pub phase: GamePhase,
    pub busy: bool,
    pub awaiting_readiness: bool,
    pub last_error: Option<String>,
    pub transcript: Transcript,
    pub world: WorldState,
    pub character: CharacterState,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 玩家输入此刻是否应被忽略
    pub fn input_locked(&self) -> bool {
        self.busy || self.awaiting_readiness || !self.phase.accepts_player_input()
    }

    /// 投影出 UI 可渲染的状态
    pub fn project(&self) -> UiState {
        UiState {
            phase: self.phase,
            messages: self.transcript.messages().to_vec(),
            world_progress: self.world.filled_fields(),
            character_progress: self.character.filled_fields(),
            input_locked: self.input_locked(),
            error_message: self.last_error.clone(),
            awaiting_readiness: self.awaiting_readiness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_locks_input() {
        let r = SessionRecord::new();
        assert_eq!(r.phase, GamePhase::Init);
        assert!(r.input_locked());
    }

    #[test]
    fn test_busy_and_awaiting_lock_input() {
        let mut r = SessionRecord::new();
        r.phase = GamePhase::WorldCreation;
        assert!(!r.input_locked());
        r.busy = true;
        assert!(r.input_locked());
        r.busy = false;
        r.awaiting_readiness = true;
        assert!(r.input_locked());
    }

    #[test]
    fn test_projection_carries_progress() {
        let mut r = SessionRecord::new();
        r.world.geography = Some("forest".to_string());
        let ui = r.project();
        assert_eq!(ui.world_progress, (1, 5));
        assert_eq!(ui.character_progress, (0, 5));
    }
}
