//! 世界与角色的部分状态记录
//!
//! 字段与后端模型一致，均可缺省；每次对应阶段的 Agent 响应都会整体替换（而非合并）。
//! updated_state 是松散的 JSON，在 API 边界处校验并降级为默认值，绝不信任其形状。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 世界设定（创建过程中逐步填充）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldState {
    pub name: Option<String>,
    pub geography: Option<String>,
    pub history: Option<String>,
    pub cultures: Option<String>,
    pub magic_system: Option<String>,
    /// 后端返回的其余键原样保留
    #[serde(flatten)]
    pub additional_info: BTreeMap<String, Value>,
}

/// 角色卡（创建过程中逐步填充）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterState {
    pub name: Option<String>,
    pub physical_appearance: Option<String>,
    pub background: Option<String>,
    pub internal_motivation: Option<String>,
    pub unique_traits: Option<String>,
    #[serde(flatten)]
    pub additional_info: BTreeMap<String, Value>,
}

/// 将松散的 updated_state 解析为静态形状；失败时告警并返回默认值
fn decode_or_default<T: Default + for<'de> Deserialize<'de>>(value: Value, what: &str) -> T {
    match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("malformed {} payload, falling back to empty: {}", what, e);
            T::default()
        }
    }
}

impl WorldState {
    pub fn from_value(value: Value) -> Self {
        decode_or_default(value, "world_state")
    }

    /// (已填写字段数, 总字段数)，用于状态栏进度显示
    pub fn filled_fields(&self) -> (usize, usize) {
        let fields = [
            &self.name,
            &self.geography,
            &self.history,
            &self.cultures,
            &self.magic_system,
        ];
        (fields.iter().filter(|f| f.is_some()).count(), fields.len())
    }
}

impl CharacterState {
    pub fn from_value(value: Value) -> Self {
        decode_or_default(value, "character_state")
    }

    pub fn filled_fields(&self) -> (usize, usize) {
        let fields = [
            &self.name,
            &self.physical_appearance,
            &self.background,
            &self.internal_motivation,
            &self.unique_traits,
        ];
        (fields.iter().filter(|f| f.is_some()).count(), fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_world_state_from_partial_payload() {
        let w = WorldState::from_value(json!({"geography": "forest"}));
        assert_eq!(w.geography.as_deref(), Some("forest"));
        assert!(w.name.is_none());
        assert_eq!(w.filled_fields(), (1, 5));
    }

    #[test]
    fn test_malformed_payload_defaults() {
        let w = WorldState::from_value(json!("not an object"));
        assert!(w.name.is_none());
        assert_eq!(w.filled_fields().0, 0);

        let c = CharacterState::from_value(json!([1, 2, 3]));
        assert!(c.name.is_none());
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let w = WorldState::from_value(json!({"name": "艾泽", "climate": "寒冷"}));
        assert_eq!(w.name.as_deref(), Some("艾泽"));
        assert_eq!(
            w.additional_info.get("climate").and_then(|v| v.as_str()),
            Some("寒冷")
        );
    }
}
