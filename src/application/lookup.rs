use crate::domain::Entity;
use crate::ports::repository::Repository;

use super::errors::{ApplicationError, PersistenceContext, Result};

/// IDで集約を読み込む。存在しない（または論理削除済み）ならNotFound
pub(crate) async fn require<T, R>(repo: &R, id: T::Id, not_found: &str) -> Result<T>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    repo.get_by_id(id)
        .await
        .persistence("Error loading data")?
        .ok_or_else(|| ApplicationError::not_found(not_found))
}
