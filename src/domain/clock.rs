/// ID割り当て用の時刻源。テストでは固定値を差し込む。
pub trait Clock {
    /// Unixエポックからのミリ秒
    fn now_millis(&self) -> i64;
}

/// 実時刻（UTC）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
