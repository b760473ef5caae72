//! 核心编排层：错误类型、状态投影、就绪轮询、主控循环

pub mod error;
pub mod orchestrator;
pub mod readiness;
pub mod state;

pub use error::SessionError;
pub use orchestrator::{
    create_backend_from_config, create_runtime, create_session_runtime, Command,
};
pub use readiness::{poll_until_ready, PollOutcome};
pub use state::{SessionRecord, UiState};
