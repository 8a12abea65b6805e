use crate::domain::Money;
use crate::domain::lending::{DEFAULT_LOAN_DAYS, DEFAULT_RESERVATION_DAYS};
use crate::ports::{UnitOfWork, UnitOfWorkFactory};
use std::sync::Arc;

/// 1日あたりの延滞罰金（セント）
pub const DEFAULT_DAILY_FINE_RATE_CENTS: i64 = 50;

/// 貸出に関する運用値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    /// 貸出期間・延長期間（日）
    pub loan_duration_days: i64,
    /// 予約の有効期間（日）
    pub reservation_days: i64,
    pub daily_fine_rate: Money,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_duration_days: DEFAULT_LOAN_DAYS,
            reservation_days: DEFAULT_RESERVATION_DAYS,
            daily_fine_rate: Money::from_cents(DEFAULT_DAILY_FINE_RATE_CENTS),
        }
    }
}

/// サービスの依存関係
///
/// 振る舞いは持たず、各サービス関数に引数として渡す。
/// Unit of Workは操作ごとにunit_of_workで作り、リクエスト間で共有しない。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub stores: Arc<dyn UnitOfWorkFactory>,
    pub policy: LendingPolicy,
}

impl ServiceDependencies {
    pub fn new(stores: Arc<dyn UnitOfWorkFactory>, policy: LendingPolicy) -> Self {
        Self { stores, policy }
    }

    pub fn unit_of_work(&self) -> Box<dyn UnitOfWork> {
        self.stores.create()
    }
}
