//! 消息时间线：仅追加的聊天记录
//!
//! 插入顺序即显示顺序，条目一旦追加不再变更（id/sender 永不改变）；
//! 唯一例外是「流式条目」：open_streaming 打开一条空消息，append_chunk 向其追加文本，
//! close_streaming 之后恢复不可变。任意时刻最多一条流式条目处于打开状态。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 消息发送方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Sender {
    Player,
    DungeonMaster,
    System,
}

/// 单条聊天消息
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    /// 会话内单调递增
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// 流式条目句柄：指向唯一打开的消息，close 时消耗
#[derive(Debug, PartialEq, Eq)]
pub struct StreamingEntry(u64);

impl StreamingEntry {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// 消息时间线
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
    open_id: Option<u64>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条已完成的消息，返回其 id
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            sender,
            text: text.into(),
            created_at: Utc::now(),
        });
        id
    }

    /// 追加一条空消息并打开为流式条目
    ///
    /// 若已有打开的条目（调用方时序错误），先将其关闭再打开新条目，保证不变式成立。
    pub fn open_streaming(&mut self, sender: Sender) -> StreamingEntry {
        if self.open_id.is_some() {
            tracing::warn!("opening a streaming entry while another is open; closing the old one");
            self.open_id = None;
        }
        let id = self.append(sender, String::new());
        self.open_id = Some(id);
        StreamingEntry(id)
    }

    /// 向打开的流式条目追加文本；这是全系统唯一允许的追加后变更
    pub fn append_chunk(&mut self, entry: &StreamingEntry, chunk: &str) {
        if self.open_id != Some(entry.0) {
            tracing::warn!(id = entry.0, "append_chunk on a closed entry ignored");
            return;
        }
        if let Some(m) = self.messages.iter_mut().find(|m| m.id == entry.0) {
            m.text.push_str(chunk);
        }
    }

    /// 关闭流式条目并返回其最终文本
    pub fn close_streaming(&mut self, entry: StreamingEntry) -> String {
        if self.open_id == Some(entry.0) {
            self.open_id = None;
        }
        self.messages
            .iter()
            .find(|m| m.id == entry.0)
            .map(|m| m.text.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.open_id = None;
        self.next_id = 0;
    }
}
