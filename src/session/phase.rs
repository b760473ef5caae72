//! 游戏阶段状态机的状态集合
//!
//! Init → WorldCreation → CharacterCreation → Gameplay → GameOver；
//! GameOver 为终态。阶段只由编排器写入，其余组件只读。

use serde::Serialize;

/// 会话所处阶段
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// 会话尚未创建成功
    #[default]
    Init,
    WorldCreation,
    CharacterCreation,
    Gameplay,
    GameOver,
}

impl GamePhase {
    /// 当前阶段是否接受玩家输入（busy/awaiting 之外的阶段级门禁）
    pub fn accepts_player_input(&self) -> bool {
        matches!(
            self,
            GamePhase::WorldCreation | GamePhase::CharacterCreation | GamePhase::Gameplay
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::GameOver)
    }

    /// 状态栏显示用标签
    pub fn label(&self) -> &'static str {
        match self {
            GamePhase::Init => "未开始",
            GamePhase::WorldCreation => "创建世界",
            GamePhase::CharacterCreation => "创建角色",
            GamePhase::Gameplay => "冒险进行中",
            GamePhase::GameOver => "游戏结束",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_gate_per_phase() {
        assert!(!GamePhase::Init.accepts_player_input());
        assert!(GamePhase::WorldCreation.accepts_player_input());
        assert!(GamePhase::CharacterCreation.accepts_player_input());
        assert!(GamePhase::Gameplay.accepts_player_input());
        assert!(!GamePhase::GameOver.accepts_player_input());
    }

    #[test]
    fn test_game_over_is_terminal() {
        assert!(GamePhase::GameOver.is_terminal());
        assert!(!GamePhase::Gameplay.is_terminal());
    }
}
