use crate::domain::catalog::BookCondition;
use serde::Deserialize;

/// GET /books/search のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /members/lookup のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// POST /copies/:id/restore の本文
#[derive(Debug, Deserialize)]
pub struct RestoreCopyRequest {
    pub condition: BookCondition,
}
