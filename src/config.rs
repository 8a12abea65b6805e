use crate::application::dependencies::{DEFAULT_DAILY_FINE_RATE_CENTS, LendingPolicy};
use crate::domain::Money;
use crate::domain::lending::{DEFAULT_LOAN_DAYS, DEFAULT_RESERVATION_DAYS};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
/// 貸出期間・予約期間の上限（日）
pub const MAX_PERIOD_DAYS: i64 = 365;
/// 1日あたりの延滞罰金の上限（セント）
pub const MAX_DAILY_FINE_RATE_CENTS: i64 = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// 環境変数から読み込む設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// 未設定ならインメモリのUnit of Workで起動する
    pub database_url: Option<String>,
    pub port: u16,
    pub loan_duration_days: i64,
    pub reservation_days: i64,
    pub daily_fine_rate_cents: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の取得関数から読み込む（テスト用に環境変数を差し替えられる）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
            loan_duration_days: bounded(
                &lookup,
                "LOAN_DURATION_DAYS",
                DEFAULT_LOAN_DAYS,
                MAX_PERIOD_DAYS,
            )?,
            reservation_days: bounded(
                &lookup,
                "RESERVATION_DAYS",
                DEFAULT_RESERVATION_DAYS,
                MAX_PERIOD_DAYS,
            )?,
            daily_fine_rate_cents: bounded(
                &lookup,
                "DAILY_FINE_RATE_CENTS",
                DEFAULT_DAILY_FINE_RATE_CENTS,
                MAX_DAILY_FINE_RATE_CENTS,
            )?,
        })
    }

    pub fn policy(&self) -> LendingPolicy {
        LendingPolicy {
            loan_duration_days: self.loan_duration_days,
            reservation_days: self.reservation_days,
            daily_fine_rate: Money::from_cents(self.daily_fine_rate_cents),
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// 1以上max以下の整数
fn bounded(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: i64,
    max: i64,
) -> Result<i64, ConfigError> {
    let value = parse(lookup, key, default)?;
    if !(1..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}
