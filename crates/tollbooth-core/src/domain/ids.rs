//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! Run の識別子は ULID (Universally Unique Lexicographically Sortable Identifier) です。
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時に RunId と RequestId を区別します。
//!
//! ## 文字列表現
//! - Display: `run-01HV...` のようにプレフィックス付き
//! - FromStr: プレフィックスあり/なしの両方を受け付ける
//! - JSON: Display と同じ文字列（URL パスと JSON body で同じ値を使える）

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"run-", "req-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let run_id: RunId = Id::from(Ulid::new());
/// let request_id: RequestId = Id::from(Ulid::new());
/// // run_id と request_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

// derive(Clone, Copy) は T: Clone を要求してしまうので手書きする
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// ID 文字列のパースエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {0:?}")]
pub struct ParseIdError(pub String);

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Run のマーカー型
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// エラーレスポンス（リクエスト）のマーカー型
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Request {}

impl IdMarker for Request {
    fn prefix() -> &'static str {
        "req-"
    }
}

/// Identifier of a Run (preview → unlock → process → download).
pub type RunId = Id<Run>;

/// Identifier attached to an error response for log correlation.
pub type RequestId = Id<Request>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        let ulid = Ulid::new();
        let run = RunId::from_ulid(ulid);
        let req = RequestId::from_ulid(ulid);

        assert_eq!(run.as_ulid(), ulid);
        assert!(run.to_string().starts_with("run-"));
        assert!(req.to_string().starts_with("req-"));
    }

    #[test]
    fn parse_accepts_prefixed_and_bare() {
        let run = RunId::from_ulid(Ulid::new());

        let prefixed: RunId = run.to_string().parse().unwrap();
        let bare: RunId = run.as_ulid().to_string().parse().unwrap();

        assert_eq!(prefixed, run);
        assert_eq!(bare, run);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("run-not-a-ulid".parse::<RunId>().is_err());
        assert!("".parse::<RunId>().is_err());
        assert!("../../etc/passwd".parse::<RunId>().is_err());
    }

    #[test]
    fn json_uses_display_form() {
        let run = RunId::from_ulid(Ulid::new());

        let json = serde_json::to_string(&run).unwrap();
        assert_eq!(json, format!("\"{run}\""));

        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<RunId>(), size_of::<Ulid>());
    }
}
