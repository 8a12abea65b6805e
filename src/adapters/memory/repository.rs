use crate::adapters::StoreError;
use crate::adapters::staging::{Staged, entity_name};
use crate::domain::Entity;
use crate::ports::repository::{Predicate, Repository, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 全Unit of Workが共有する保存済みの集約
pub(super) type SharedTable<T> = Arc<Mutex<HashMap<<T as Entity>::Id, T>>>;

/// インメモリのリポジトリ
///
/// 保存済みの集約は共有テーブルに置き、save_changesを待つ変更はこのUnit of Work内に持つ。
/// トランザクション中に反映した変更は共有テーブルに書かず、commitまでこのUnit of Work内に溜める。
pub struct MemoryRepository<T: Entity> {
    committed: SharedTable<T>,
    pending: Mutex<Vec<Staged<T>>>,
    in_transaction: Mutex<Option<HashMap<T::Id, T>>>,
}

impl<T: Entity> MemoryRepository<T> {
    pub(super) fn new(committed: SharedTable<T>) -> Self {
        Self {
            committed,
            pending: Mutex::new(Vec::new()),
            in_transaction: Mutex::new(None),
        }
    }

    /// このUnit of Workから見える状態（トランザクション中の変更を重ねたもの）
    fn visible(&self, predicate: Predicate<'_, T>) -> Vec<T> {
        let overlay = lock(&self.in_transaction);
        let committed = lock(&self.committed);

        let mut found: Vec<T> = match overlay.as_ref() {
            Some(written) => committed
                .iter()
                .filter(|(id, _)| !written.contains_key(*id))
                .map(|(_, e)| e)
                .chain(written.values())
                .filter(|e| e.is_live() && predicate(e))
                .cloned()
                .collect(),
            None => committed
                .values()
                .filter(|e| e.is_live() && predicate(e))
                .cloned()
                .collect(),
        };
        found.sort_by_key(|e| e.audit().created_at());
        found
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn get_by_id(&self, id: T::Id) -> Result<Option<T>> {
        let written = lock(&self.in_transaction)
            .as_ref()
            .and_then(|w| w.get(&id).cloned());
        let found = match written {
            Some(entity) => Some(entity),
            None => lock(&self.committed).get(&id).cloned(),
        };
        Ok(found.filter(|e| e.is_live()))
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        Ok(self.visible(&|_: &T| true))
    }

    async fn find(&self, predicate: Predicate<'_, T>) -> Result<Vec<T>> {
        Ok(self.visible(predicate))
    }

    async fn add(&self, entity: T) -> Result<()> {
        lock(&self.pending).push(Staged::Add(entity));
        Ok(())
    }

    async fn update(&self, entity: T) -> Result<()> {
        lock(&self.pending).push(Staged::Update(entity));
        Ok(())
    }
}

/// MemoryUnitOfWorkから操作されるテーブル
pub(super) trait Table: Send + Sync {
    /// 保留中の変更が反映可能か検査する（変更はしない）
    fn check(&self) -> Result<()>;
    /// 保留中の変更を反映し、件数を返す。トランザクション中はcommitまで共有テーブルに書かない
    fn apply(&self) -> usize;
    fn discard(&self);
    fn begin(&self);
    /// トランザクション中に反映した変更を共有テーブルに書く
    fn commit(&self);
    fn rollback(&self);
}

impl<T: Entity> Table for MemoryRepository<T> {
    fn check(&self) -> Result<()> {
        let mut known: HashSet<T::Id> = lock(&self.committed).keys().copied().collect();
        if let Some(written) = lock(&self.in_transaction).as_ref() {
            known.extend(written.keys().copied());
        }

        for staged in lock(&self.pending).iter() {
            let id = staged.entity().id();
            match staged {
                Staged::Add(_) if !known.insert(id) => {
                    return Err(Box::new(StoreError::DuplicateKey {
                        entity: entity_name::<T>(),
                        id: staged.id_text(),
                    }));
                }
                Staged::Update(_) if !known.contains(&id) => {
                    return Err(Box::new(StoreError::NotFound {
                        entity: entity_name::<T>(),
                        id: staged.id_text(),
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(&self) -> usize {
        let staged: Vec<Staged<T>> = lock(&self.pending).drain(..).collect();
        let count = staged.len();

        let mut overlay = lock(&self.in_transaction);
        match overlay.as_mut() {
            Some(written) => {
                for change in staged {
                    let (Staged::Add(entity) | Staged::Update(entity)) = change;
                    written.insert(entity.id(), entity);
                }
            }
            None => {
                let mut committed = lock(&self.committed);
                for change in staged {
                    let (Staged::Add(entity) | Staged::Update(entity)) = change;
                    committed.insert(entity.id(), entity);
                }
            }
        }
        count
    }

    fn discard(&self) {
        lock(&self.pending).clear();
    }

    fn begin(&self) {
        *lock(&self.in_transaction) = Some(HashMap::new());
    }

    fn commit(&self) {
        if let Some(written) = lock(&self.in_transaction).take() {
            lock(&self.committed).extend(written);
        }
    }

    fn rollback(&self) {
        self.discard();
        lock(&self.in_transaction).take();
    }
}
