//! 事件流（SSE）解析
//!
//! 后端以 `data: <payload>\n\n` 逐段推送叙事，结束时推送哨兵 `[DONE]`。
//! 解析按行缓冲：字节块可能在任意位置截断，跨块的行累积到 buffer；
//! 空行与 `:` 开头的注释行跳过；payload 原样保留（不做 trim，空格是叙事的一部分）。

use std::collections::VecDeque;

use futures_util::stream;

use crate::api::error::ApiError;
use crate::api::traits::{NarrationEvent, NarrationStream};

/// 完成哨兵：整个 payload 等于它时流结束
pub const DONE_SENTINEL: &str = "[DONE]";

/// 增量行解析器：feed 喂入字节块，返回解析出的 data payload 列表
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: String,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop(); // '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("data:") {
                let payload = rest.strip_prefix(' ').unwrap_or(rest);
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}

struct StreamState {
    response: reqwest::Response,
    parser: EventStreamParser,
    queue: VecDeque<Result<NarrationEvent, ApiError>>,
    finished: bool,
}

/// 将 HTTP 响应包装为叙事事件流
///
/// 哨兵之后的事件不再产出；流自然结束（服务端未发哨兵即关闭）同样视为完成。
/// 读取错误以单个 Err 终止序列。
pub fn narration_stream(response: reqwest::Response) -> NarrationStream {
    let state = StreamState {
        response,
        parser: EventStreamParser::new(),
        queue: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.response.chunk().await {
                Ok(Some(bytes)) => {
                    for payload in st.parser.feed(&bytes) {
                        if payload == DONE_SENTINEL {
                            st.queue.push_back(Ok(NarrationEvent::Done));
                            st.finished = true;
                            break;
                        }
                        st.queue.push_back(Ok(NarrationEvent::Chunk(payload)));
                    }
                }
                Ok(None) => {
                    st.queue.push_back(Ok(NarrationEvent::Done));
                    st.finished = true;
                }
                Err(e) => {
                    st.queue.push_back(Err(ApiError::Network(e)));
                    st.finished = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_event() {
        let mut p = EventStreamParser::new();
        assert_eq!(p.feed(b"data: Hello, \n\n"), vec!["Hello, ".to_string()]);
    }

    #[test]
    fn test_payload_split_across_chunks() {
        let mut p = EventStreamParser::new();
        assert!(p.feed(b"data: Hel").is_empty());
        assert_eq!(p.feed(b"lo\n\ndata: world\n\n").len(), 2);
    }

    #[test]
    fn test_crlf_and_comments_skipped() {
        let mut p = EventStreamParser::new();
        let payloads = p.feed(b": keep-alive\r\ndata: a\r\n\r\ndata: b\n\n");
        assert_eq!(payloads, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_sentinel_detected_verbatim() {
        let mut p = EventStreamParser::new();
        let payloads = p.feed(b"data: [DONE]\n\n");
        assert_eq!(payloads, vec![DONE_SENTINEL.to_string()]);
    }

    #[test]
    fn test_chunk_whitespace_preserved() {
        let mut p = EventStreamParser::new();
        let payloads = p.feed(b"data:  indented \n\n");
        assert_eq!(payloads, vec![" indented ".to_string()]);
    }
}
