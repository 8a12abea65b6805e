use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{LibraryUser, Role, UserProfile};
use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, is_blank};
use crate::domain::value_objects::UserId;

/// 司書
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Librarian {
    id: UserId,
    profile: UserProfile,
    department: String,
    hire_date: DateTime<Utc>,
    can_manage_books: bool,
    can_manage_users: bool,
    audit: AuditInfo,
}

impl_entity!(Librarian, UserId);

impl Librarian {
    pub fn create(
        profile: UserProfile,
        department: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!is_blank(department), "Department is required.");

        v.finish(|| Librarian {
            id: UserId::new(),
            profile,
            department: department.trim().to_string(),
            hire_date: now,
            can_manage_books: true,
            can_manage_users: false,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn hire_date(&self) -> DateTime<Utc> {
        self.hire_date
    }

    pub fn can_manage_books(&self) -> bool {
        self.can_manage_books
    }

    pub fn can_manage_users(&self) -> bool {
        self.can_manage_users
    }
}

impl LibraryUser for Librarian {
    fn user_id(&self) -> UserId {
        self.id
    }

    fn profile(&self) -> &UserProfile {
        &self.profile
    }

    fn role(&self) -> Role {
        Role::Librarian
    }
}

/// 管理者（全リソースにアクセス可能）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    id: UserId,
    profile: UserProfile,
    audit: AuditInfo,
}

impl_entity!(Admin, UserId);

impl Admin {
    pub fn create(profile: UserProfile, now: DateTime<Utc>) -> Self {
        Admin {
            id: UserId::new(),
            profile,
            audit: AuditInfo::new(now),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }
}

impl LibraryUser for Admin {
    fn user_id(&self) -> UserId {
        self.id
    }

    fn profile(&self) -> &UserProfile {
        &self.profile
    }

    fn role(&self) -> Role {
        Role::Admin
    }
}
