use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::value_objects::EntityId;

/// エンティティのライフサイクル
///
/// 論理削除はフラグではなく明示的な状態として持つ。
/// 読み取り経路はすべてこの状態を確認する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Deleted { deleted_at: DateTime<Utc> },
}

/// 監査情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    lifecycle: Lifecycle,
}

impl AuditInfo {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: None,
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Deleted { .. })
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// 論理削除。既に削除済みならfalse
    pub(crate) fn mark_deleted(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.lifecycle = Lifecycle::Deleted { deleted_at: now };
        self.updated_at = Some(now);
        true
    }

    /// 論理削除の取り消し。既に有効ならfalse
    pub(crate) fn restore(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_deleted() {
            return false;
        }
        self.lifecycle = Lifecycle::Active;
        self.updated_at = Some(now);
        true
    }
}

/// 永続化される集約の共通インターフェース
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Id: EntityId;

    fn id(&self) -> Self::Id;
    fn audit(&self) -> &AuditInfo;
    fn audit_mut(&mut self) -> &mut AuditInfo;

    /// 論理削除されていないか
    fn is_live(&self) -> bool {
        !self.audit().is_deleted()
    }
}

/// Entityトレイトの定型実装
macro_rules! impl_entity {
    ($entity:ty, $id:ty) => {
        impl $crate::domain::audit::Entity for $entity {
            type Id = $id;

            fn id(&self) -> $id {
                self.id
            }

            fn audit(&self) -> &$crate::domain::audit::AuditInfo {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut $crate::domain::audit::AuditInfo {
                &mut self.audit
            }
        }
    };
}

pub(crate) use impl_entity;
