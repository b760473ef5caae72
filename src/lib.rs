//! AIDM - AI 地下城主终端客户端
//!
//! 模块划分：
//! - **api**: 后端边界（GameBackend 抽象、HTTP/Mock 实现、DTO、事件流解析）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话编排（阶段状态机、就绪轮询、状态投影、主控循环）
//! - **observability**: 日志初始化
//! - **session**: 会话领域模型（阶段、消息时间线、世界/角色状态）
//! - **ui**: Ratatui TUI 界面

pub mod api;
pub mod config;
pub mod core;
pub mod observability;
pub mod session;
pub mod ui;
