use crate::domain::{Entity, EntityId};

/// save_changesまで保留される変更
#[derive(Debug, Clone)]
pub(crate) enum Staged<T> {
    Add(T),
    Update(T),
}

impl<T: Entity> Staged<T> {
    pub(crate) fn entity(&self) -> &T {
        match self {
            Staged::Add(entity) | Staged::Update(entity) => entity,
        }
    }

    pub(crate) fn id_text(&self) -> String {
        self.entity().id().value().to_string()
    }
}

/// 型名の末尾（"Book" など）をエラーメッセージ用に取り出す
pub(crate) fn entity_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
