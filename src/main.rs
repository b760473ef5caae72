//! AIDM - AI 地下城主终端客户端
//!
//! 入口：初始化日志、加载配置、创建会话运行时与 TUI，并运行主循环。

use aidm::{config::load_config, core::create_session_runtime, observability, ui::run_app};
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        aidm::config::AppConfig::default()
    });

    // 运行时启动即自动创建会话并进入世界创建阶段
    let (cmd_tx, state_rx) = create_session_runtime(&cfg);

    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
