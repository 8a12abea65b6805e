use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use uuid::Uuid;

/// 集約IDの共通インターフェース
///
/// 永続化層はこのトレイト経由でUUIDを取り出す。
pub trait EntityId:
    Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static
{
    fn from_uuid(uuid: Uuid) -> Self;
    fn value(&self) -> Uuid;

    /// nil UUIDか
    fn is_nil(&self) -> bool {
        self.value().is_nil()
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl EntityId for $name {
            fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// 書籍ID - カタログ上の書誌
    BookId
);
entity_id!(
    /// 蔵書ID - 物理的な1冊
    BookCopyId
);
entity_id!(
    /// 著者ID
    AuthorId
);
entity_id!(
    /// ジャンルID
    GenreId
);
entity_id!(
    /// 貸出ID
    LoanId
);
entity_id!(
    /// 予約ID
    ReservationId
);
entity_id!(
    /// 罰金ID
    FineId
);
entity_id!(
    /// 利用者ID（会員・司書・管理者共通）
    UserId
);
entity_id!(
    /// 通知ID
    NotificationId
);
entity_id!(
    /// 利用者設定ID
    PreferencesId
);

/// 会員IDは利用者IDと同じ空間を共有する
pub type MemberId = UserId;

/// 金額（セント単位）
///
/// 浮動小数点の丸め誤差を避けるため整数で保持する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
