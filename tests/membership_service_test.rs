mod common;

use chrono::{Duration, Months, Utc};
use common::*;
use rusty_library_catalog::application::FailureKind;
use rusty_library_catalog::application::membership::{
    self, ExtendMembership, RegisterLibrarian, UpgradeMembership,
};
use rusty_library_catalog::domain::users::{MembershipState, MembershipType};

// ============================================================================
// 会員登録
// ============================================================================

#[tokio::test]
async fn test_register_member_normalises_email() {
    let deps = memory_deps();
    let now = Utc::now();

    let member = expect_success(
        membership::register_member(
            &deps,
            register_command("Ada@Example.com", MembershipType::Premium),
            now,
        )
        .await,
    );

    assert_eq!(member.email(), "ada@example.com");
    assert_eq!(member.state(), MembershipState::Active);
    assert_eq!(member.membership_expiry(), now + Months::new(12));
    assert_eq!(member.max_loans_allowed(), 5);

    let found = expect_success(membership::get_member_by_email(&deps, "ADA@example.com").await);
    assert_eq!(found.id(), member.id());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_case_insensitively() {
    let deps = memory_deps();
    let now = Utc::now();
    seed_member(&deps, "ada@example.com", now).await;

    let result = membership::register_member(
        &deps,
        register_command("ADA@EXAMPLE.COM", MembershipType::Basic),
        now,
    )
    .await;

    assert_eq!(result.failure, Some(FailureKind::BusinessRule));
    assert_eq!(result.errors, ["A member with this email already exists."]);
    assert_eq!(
        expect_success(membership::get_all_members(&deps).await).len(),
        1
    );
}

#[tokio::test]
async fn test_register_member_without_type_is_a_validation_error() {
    let deps = memory_deps();

    let result = membership::register_member(
        &deps,
        register_command("ada@example.com", MembershipType::None),
        Utc::now(),
    )
    .await;

    assert_eq!(result.failure, Some(FailureKind::Validation));
    assert_eq!(result.errors, ["membership_type: is required"]);
}

#[tokio::test]
async fn test_unknown_email_is_not_found() {
    let deps = memory_deps();
    let result = membership::get_member_by_email(&deps, "nobody@example.com").await;

    assert_eq!(result.failure, Some(FailureKind::NotFound));
}

// ============================================================================
// 状態遷移
// ============================================================================

#[tokio::test]
async fn test_suspend_and_reactivate() {
    let deps = memory_deps();
    let now = Utc::now();
    let member = seed_member(&deps, "ada@example.com", now).await;

    let suspended = expect_success(membership::suspend_member(&deps, member.id(), now).await);
    assert_eq!(suspended.state(), MembershipState::Suspended);
    assert!(!suspended.can_borrow_books(now));

    let again = membership::suspend_member(&deps, member.id(), now).await;
    assert_eq!(again.failure, Some(FailureKind::Domain));
    assert_eq!(again.errors, ["Member is already suspended."]);

    let reactivated =
        expect_success(membership::reactivate_member(&deps, member.id(), now).await);
    assert_eq!(reactivated.state(), MembershipState::Active);
}

#[tokio::test]
async fn test_expire_then_extend_restores_membership() {
    let deps = memory_deps();
    let registered_at = Utc::now() - Duration::days(400);
    let now = Utc::now();
    let member = seed_member(&deps, "ada@example.com", registered_at).await;

    // 1. 期限切れの会員を失効させる（2回目は対象なし）
    assert_eq!(
        expect_success(membership::expire_memberships(&deps, now).await),
        1
    );
    assert_eq!(
        expect_success(membership::expire_memberships(&deps, now).await),
        0
    );

    // 2. 失効中は再開できない
    let reactivate = membership::reactivate_member(&deps, member.id(), now).await;
    assert_eq!(
        reactivate.errors,
        ["Expired membership must be extended before reactivation."]
    );

    // 3. 延長は現在日時から数える
    let extended = expect_success(
        membership::extend_membership(&deps, member.id(), ExtendMembership { months: 6 }, now)
            .await,
    );
    assert_eq!(extended.state(), MembershipState::Active);
    assert_eq!(extended.membership_expiry(), now + Months::new(6));
}

#[tokio::test]
async fn test_extend_active_membership_counts_from_expiry() {
    let deps = memory_deps();
    let now = Utc::now();
    let member = seed_member(&deps, "ada@example.com", now).await;

    let extended = expect_success(
        membership::extend_membership(&deps, member.id(), ExtendMembership { months: 3 }, now)
            .await,
    );

    assert_eq!(
        extended.membership_expiry(),
        member.membership_expiry() + Months::new(3)
    );
}

#[tokio::test]
async fn test_upgrade_only_moves_up() {
    let deps = memory_deps();
    let now = Utc::now();
    let member = seed_member(&deps, "ada@example.com", now).await;

    let upgraded = expect_success(
        membership::upgrade_membership(
            &deps,
            member.id(),
            UpgradeMembership {
                membership_type: MembershipType::Vip,
            },
            now,
        )
        .await,
    );
    assert_eq!(upgraded.membership_type(), MembershipType::Vip);

    let downgrade = membership::upgrade_membership(
        &deps,
        member.id(),
        UpgradeMembership {
            membership_type: MembershipType::Premium,
        },
        now,
    )
    .await;
    assert_eq!(downgrade.errors, ["Invalid membership type for upgrade."]);
}

// ============================================================================
// 司書
// ============================================================================

#[tokio::test]
async fn test_register_librarian_and_reject_duplicate() {
    let deps = memory_deps();
    let now = Utc::now();
    let cmd = RegisterLibrarian {
        first_name: "Melvil".to_string(),
        last_name: "Dewey".to_string(),
        email: "melvil@example.com".to_string(),
        phone_number: None,
        department: "Cataloguing".to_string(),
    };

    let librarian =
        expect_success(membership::register_librarian(&deps, cmd.clone(), now).await);
    assert_eq!(librarian.department(), "Cataloguing");

    let found = expect_success(membership::get_librarian(&deps, librarian.id()).await);
    assert_eq!(found.id(), librarian.id());

    let duplicate = membership::register_librarian(&deps, cmd, now).await;
    assert_eq!(
        duplicate.errors,
        ["A librarian with this email already exists."]
    );
}
