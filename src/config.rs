//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AIDM__*` 覆盖（双下划线表示嵌套，如 `AIDM__SERVER__BASE_URL=...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub game: GameSection,
}

/// [server] 段：后端地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// 后端 API 根地址；留空时使用离线 Mock 后端
    pub base_url: Option<String>,
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 流式读取超时（秒）
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_stream_timeout() -> u64 {
    120
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: Some("http://127.0.0.1:8000/api".to_string()),
            request_timeout_secs: default_request_timeout(),
            stream_timeout_secs: default_stream_timeout(),
        }
    }
}

/// [game] 段：就绪轮询与叙事模式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameSection {
    /// 就绪轮询间隔（毫秒）
    #[serde(default = "default_poll_interval_ms")]
    pub readiness_poll_interval_ms: u64,
    /// 轮询上限（按间隔计的 tick 数），超出即判定超时
    #[serde(default = "default_poll_timeout_ticks")]
    pub readiness_timeout_ticks: u32,
    /// 叙事回合是否走流式端点
    #[serde(default = "default_streaming")]
    pub streaming: bool,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_ticks() -> u32 {
    20
}

fn default_streaming() -> bool {
    true
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            readiness_poll_interval_ms: default_poll_interval_ms(),
            readiness_timeout_ticks: default_poll_timeout_ticks(),
            streaming: default_streaming(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            game: GameSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 AIDM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AIDM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AIDM")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
