use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 作成時刻（Unixエポックミリ秒）から導出される書籍ID。割り当て後は不変。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(i64);

impl BookId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// 時刻値と既存の最大IDから次のIDを決める。
    /// 同一ミリ秒内の連続追加でも単調増加を保つ。
    /// 既存の最大IDが `i64::MAX` でこれ以上増やせない場合は `None`。
    pub(crate) fn allocate(now_millis: i64, current_max: Option<BookId>) -> Option<Self> {
        match current_max {
            Some(max) if now_millis <= max.0 => max.0.checked_add(1).map(Self),
            _ => Some(Self(now_millis)),
        }
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
