//! 可观测性
//!
//! 日志初始化：默认 info，可通过 RUST_LOG 覆盖。TUI 占用终端，
//! 日志默认写到 stderr，可重定向到文件查看。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
