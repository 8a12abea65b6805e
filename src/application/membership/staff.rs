use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::users::{Librarian, UserProfile};
use crate::domain::UserId;
use chrono::{DateTime, Utc};

use super::commands::RegisterLibrarian;

/// 司書の登録。メールアドレスは司書の中で一意
pub async fn register_librarian(
    deps: &ServiceDependencies,
    cmd: RegisterLibrarian,
    now: DateTime<Utc>,
) -> OperationResult<Librarian> {
    boundary("register_librarian", register(deps, cmd, now)).await
}

pub async fn get_librarian(deps: &ServiceDependencies, id: UserId) -> OperationResult<Librarian> {
    boundary("get_librarian", async {
        let uow = deps.unit_of_work();
        require(uow.librarians(), id, "Librarian not found.").await
    })
    .await
}

async fn register(
    deps: &ServiceDependencies,
    cmd: RegisterLibrarian,
    now: DateTime<Utc>,
) -> Result<Librarian> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut rules = RuleViolations::new();
    let existing = uow
        .librarians()
        .get_by_email(&cmd.email)
        .await
        .persistence("Error loading librarian")?;
    rules.check(
        existing.is_none(),
        "A librarian with this email already exists.",
    );
    rules.into_result()?;

    let profile = UserProfile::create(
        &cmd.first_name,
        &cmd.last_name,
        &cmd.email,
        cmd.phone_number.as_deref(),
    )?;
    let librarian = Librarian::create(profile, &cmd.department, now)?;

    uow.librarians()
        .add(librarian.clone())
        .await
        .persistence("Error saving librarian")?;
    uow.save_changes()
        .await
        .persistence("Error saving librarian")?;

    tracing::info!(
        librarian_id = %librarian.id(),
        department = librarian.department(),
        "Librarian registered"
    );
    Ok(librarian)
}
