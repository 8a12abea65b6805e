use serde::{Deserialize, Serialize};

use super::contact;
use crate::domain::errors::{DomainResult, Violations};
use crate::domain::value_objects::UserId;

/// 利用者の役割
///
/// 継承階層の代わりに役割ごとの能力を列挙型で表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    /// リソース名の接頭辞でアクセス可否を判定する
    pub fn can_access_resource(&self, resource: &str) -> bool {
        let allowed: &[&str] = match self {
            Role::Member => &["Book", "Catalog", "Reservation", "MyAccount"],
            Role::Librarian => &["Library", "Book", "Loan"],
            Role::Admin => return true,
        };
        allowed.iter().any(|prefix| resource.starts_with(prefix))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::Librarian => "Librarian",
            Role::Admin => "Admin",
        }
    }
}

/// 全利用者に共通する連絡先情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
}

impl UserProfile {
    pub fn create(
        first_name: &str,
        last_name: &str,
        email: &str,
        phone_number: Option<&str>,
    ) -> DomainResult<Self> {
        let email = email.trim();
        let mut v = Violations::new();
        v.require(contact::is_valid_email(email), "Invalid email format.");
        v.require(
            contact::is_valid_person_name(first_name),
            "Invalid first name format.",
        );
        v.require(
            contact::is_valid_person_name(last_name),
            "Invalid last name format.",
        );
        if let Some(phone) = phone_number {
            v.require(
                contact::is_valid_phone_number(phone),
                "Invalid phone number format.",
            );
        }

        v.finish(|| UserProfile {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.to_lowercase(),
            phone_number: phone_number.map(str::to_string),
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }
}

/// 会員・司書・管理者に共通する振る舞い
pub trait LibraryUser {
    fn user_id(&self) -> UserId;
    fn profile(&self) -> &UserProfile;
    fn role(&self) -> Role;

    fn can_access_resource(&self, resource: &str) -> bool {
        self.role().can_access_resource(resource)
    }
}
