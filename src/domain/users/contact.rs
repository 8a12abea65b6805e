use regex::Regex;
use std::sync::LazyLock;

/// 氏名：英字・アクセント付き文字・空白・アポストロフィ・ハイフン
pub const PERSON_NAME_PATTERN: &str = r"^[a-zA-ZÀ-ÿ\s'-]+$";
pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
pub const USER_NAME_PATTERN: &str = r"^[a-zA-Z0-9]{3,20}$";
pub const PHONE_PATTERN: &str = r"^\+?\d{1,3}?[-. (]?\d{1,4}?[-. )]?\d{3,4}[-. ]?\d{3,4}$";

pub const MAX_PERSON_NAME_LENGTH: usize = 50;

static PERSON_NAME: LazyLock<Regex> = LazyLock::new(|| compile(PERSON_NAME_PATTERN));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| compile(EMAIL_PATTERN));
static USER_NAME: LazyLock<Regex> = LazyLock::new(|| compile(USER_NAME_PATTERN));
static PHONE: LazyLock<Regex> = LazyLock::new(|| compile(PHONE_PATTERN));

// パターンは定数なので失敗しない
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("contact pattern must compile")
}

pub fn is_valid_person_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.chars().count() <= MAX_PERSON_NAME_LENGTH
        && PERSON_NAME.is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && EMAIL.is_match(email)
}

/// ログイン名：英数字3〜20文字
pub fn is_valid_user_name(user_name: &str) -> bool {
    USER_NAME.is_match(user_name)
}

pub fn is_valid_phone_number(phone: &str) -> bool {
    !phone.trim().is_empty() && PHONE.is_match(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_names() {
        assert!(is_valid_person_name("José"));
        assert!(is_valid_person_name("O'Brien-Smith"));
        assert!(is_valid_person_name("Le Guin"));
        assert!(!is_valid_person_name(""));
        assert!(!is_valid_person_name("R2D2"));
        assert!(!is_valid_person_name(&"a".repeat(51)));
    }

    #[test]
    fn test_emails() {
        assert!(is_valid_email("reader@library.org"));
        assert!(!is_valid_email("reader@library"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_user_names() {
        assert!(is_valid_user_name("reader42"));
        assert!(!is_valid_user_name("ab"));
        assert!(!is_valid_user_name("has space"));
    }

    #[test]
    fn test_phone_numbers() {
        assert!(is_valid_phone_number("+1 555 123 4567"));
        assert!(is_valid_phone_number("555-123-4567"));
        assert!(!is_valid_phone_number("phone"));
        assert!(!is_valid_phone_number(""));
    }
}
