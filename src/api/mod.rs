//! 后端 API 层：抽象与实现（HTTP / Mock）、DTO、事件流解析

pub mod error;
pub mod http;
pub mod mock;
pub mod sse;
pub mod traits;
pub mod types;

pub use error::ApiError;
pub use http::HttpBackend;
pub use mock::MockBackend;
pub use sse::{EventStreamParser, DONE_SENTINEL};
pub use traits::{GameBackend, NarrationEvent, NarrationStream};
pub use types::{
    AgentKind, AgentProcessRequest, AgentReply, PlayReply, PlayRequest, SessionCreateRequest,
    SessionCreated, SessionStatus,
};
