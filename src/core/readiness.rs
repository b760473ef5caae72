//! 就绪轮询
//!
//! 角色创建完成后，后端的派生就绪状态可能尚未计算完成；本模块以固定间隔
//! 查询 GET /sessions/{id}，直到 ready_for_game、查询失败或总时限三者之一发生。
//! 三个分支互斥且至多发生一次：轮询是单个顺序任务，select 按 biased 顺序
//! 先检查取消与时限，再发起查询；取消后不产生任何结果。
//! 单次查询失败即放弃等待，不做重试。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, GameBackend};

/// 轮询的终止方式
#[derive(Debug)]
pub enum PollOutcome {
    /// 后端就绪，可进入冒险阶段
    Ready,
    /// 就绪查询本身失败（致命，不重试）
    ProbeFailed(ApiError),
    /// 时限内未观察到就绪
    TimedOut,
}

/// 轮询直到就绪/失败/超时；被取消时返回 None，不产生任何副作用
pub async fn poll_until_ready(
    backend: Arc<dyn GameBackend>,
    session_id: String,
    interval: Duration,
    max_ticks: u32,
    cancel: CancellationToken,
) -> Option<PollOutcome> {
    let deadline = tokio::time::Instant::now() + interval * max_ticks;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval 的首个 tick 立即完成；先消费掉，让查询按间隔分布
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(deadline) => return Some(PollOutcome::TimedOut),
            _ = ticker.tick() => {
                match backend.session_status(&session_id).await {
                    Ok(status) if status.ready_for_game => return Some(PollOutcome::Ready),
                    Ok(_) => {}
                    Err(e) => return Some(PollOutcome::ProbeFailed(e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockBackend, SessionStatus};

    fn not_ready() -> Result<SessionStatus, ApiError> {
        Ok(SessionStatus {
            session_id: "s1".to_string(),
            ..SessionStatus::default()
        })
    }

    #[tokio::test]
    async fn test_ready_stops_polling() {
        let backend = Arc::new(MockBackend::new());
        backend.push_status(not_ready());
        // 队列取空后 Mock 默认返回就绪

        let outcome = poll_until_ready(
            backend.clone(),
            "s1".to_string(),
            Duration::from_millis(10),
            20,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, Some(PollOutcome::Ready)));
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_aborts() {
        let backend = Arc::new(MockBackend::new());
        backend.push_status(Err(ApiError::Backend {
            status: 404,
            detail: "会话不存在".to_string(),
        }));

        let outcome = poll_until_ready(
            backend.clone(),
            "s1".to_string(),
            Duration::from_millis(10),
            20,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, Some(PollOutcome::ProbeFailed(_))));
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_when_never_ready() {
        let backend = Arc::new(MockBackend::new());
        for _ in 0..10 {
            backend.push_status(not_ready());
        }

        let outcome = poll_until_ready(
            backend.clone(),
            "s1".to_string(),
            Duration::from_millis(10),
            3,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, Some(PollOutcome::TimedOut)));
        assert!(backend.status_calls() <= 3);
    }

    #[tokio::test]
    async fn test_cancellation_suppresses_outcome() {
        let backend = Arc::new(MockBackend::new());
        for _ in 0..10 {
            backend.push_status(not_ready());
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_until_ready(
            backend.clone(),
            "s1".to_string(),
            Duration::from_millis(10),
            20,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(25)).await;
        cancel.cancel();

        let outcome = handle.await.unwrap();
        assert!(outcome.is_none());
    }
}
