use crate::application::validation::{
    FormatRules, check_phone_number, not_blank, valid_email, valid_person_name,
};
use crate::domain::users::MembershipType;
use garde::Validate;
use serde::Deserialize;

/// 会員登録
///
/// membership_monthsは登録日からの有効期間（月数）。
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterMember {
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub first_name: String,
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub last_name: String,
    #[garde(custom(valid_email))]
    pub email: String,
    #[garde(skip)]
    pub phone_number: Option<String>,
    #[garde(skip)]
    pub membership_type: MembershipType,
    #[garde(range(min = 1, max = 60))]
    pub membership_months: u32,
}

impl FormatRules for RegisterMember {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        if self.membership_type == MembershipType::None {
            errors.push("membership_type: is required".to_string());
        }
        check_phone_number(self.phone_number.as_deref(), errors);
    }
}

/// 会員資格の延長
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtendMembership {
    #[garde(range(min = 1, max = 60))]
    pub months: u32,
}

impl FormatRules for ExtendMembership {}

/// 会員種別の変更（上位の種別へのみ）
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpgradeMembership {
    #[garde(skip)]
    pub membership_type: MembershipType,
}

impl FormatRules for UpgradeMembership {}

/// 司書の登録
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterLibrarian {
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub first_name: String,
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub last_name: String,
    #[garde(custom(valid_email))]
    pub email: String,
    #[garde(skip)]
    pub phone_number: Option<String>,
    #[garde(custom(not_blank), length(chars, max = 100))]
    pub department: String,
}

impl FormatRules for RegisterLibrarian {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        check_phone_number(self.phone_number.as_deref(), errors);
    }
}
