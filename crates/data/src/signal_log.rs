//! `SQLite` log of emitted trading signals.
//!
//! One table, `trading_signals`, created on connect. The options and forex
//! loops each write to their own database file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS trading_signals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        asset_symbol TEXT NOT NULL,
        strategy_name TEXT NOT NULL,
        signal_type TEXT NOT NULL,
        entry_price REAL NOT NULL,
        stop_loss_price REAL,
        take_profit_price REAL,
        short_ma_value REAL,
        long_ma_value REAL,
        telegram_notified_status TEXT
    )
";

/// Outcome of the Telegram notification attached to a logged signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Success,
    Failed,
    NotAttempted,
}

impl NotificationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::NotAttempted => "NOT_ATTEMPTED",
        }
    }

    #[must_use]
    pub const fn from_sent(sent: bool) -> Self {
        if sent {
            Self::Success
        } else {
            Self::Failed
        }
    }
}

/// A signal about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSignal {
    pub asset_symbol: String,
    pub strategy_name: String,
    /// `BUY` or `SELL`.
    pub signal_type: String,
    pub entry_price: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub notification: NotificationStatus,
}

impl NewSignal {
    #[must_use]
    pub fn new(
        asset_symbol: impl Into<String>,
        strategy_name: impl Into<String>,
        signal_type: impl Into<String>,
        entry_price: f64,
    ) -> Self {
        Self {
            asset_symbol: asset_symbol.into(),
            strategy_name: strategy_name.into(),
            signal_type: signal_type.into(),
            entry_price,
            stop_loss_price: None,
            take_profit_price: None,
            short_ma: None,
            long_ma: None,
            notification: NotificationStatus::NotAttempted,
        }
    }

    #[must_use]
    pub const fn with_exits(mut self, stop_loss: f64, take_profit: f64) -> Self {
        self.stop_loss_price = Some(stop_loss);
        self.take_profit_price = Some(take_profit);
        self
    }

    #[must_use]
    pub const fn with_means(mut self, short_ma: f64, long_ma: f64) -> Self {
        self.short_ma = Some(short_ma);
        self.long_ma = Some(long_ma);
        self
    }

    #[must_use]
    pub const fn with_notification(mut self, status: NotificationStatus) -> Self {
        self.notification = status;
        self
    }
}

/// A stored signal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignalRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub asset_symbol: String,
    pub strategy_name: String,
    pub signal_type: String,
    pub entry_price: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub short_ma_value: Option<f64>,
    pub long_ma_value: Option<f64>,
    pub telegram_notified_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignalLog {
    pool: SqlitePool,
}

impl SignalLog {
    /// Opens (creating if needed) the database at `database_url`, e.g.
    /// `sqlite://forex_signals.db?mode=rwc`.
    ///
    /// # Errors
    /// Returns an error if the connection or table creation fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open signal log at {database_url}"))?;

        Self::with_pool(pool).await
    }

    /// In-memory database. A single connection keeps every query on the same
    /// memory database.
    ///
    /// # Errors
    /// Returns an error if the connection or table creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("failed to create trading_signals table")?;
        Ok(Self { pool })
    }

    /// Inserts a signal stamped with the current time and returns its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn log_signal(&self, signal: &NewSignal) -> Result<i64> {
        self.log_signal_at(signal, Utc::now()).await
    }

    /// Inserts a signal with an explicit timestamp.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn log_signal_at(&self, signal: &NewSignal, timestamp: DateTime<Utc>) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO trading_signals (
                timestamp, asset_symbol, strategy_name, signal_type, entry_price,
                stop_loss_price, take_profit_price, short_ma_value, long_ma_value,
                telegram_notified_status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(timestamp)
        .bind(&signal.asset_symbol)
        .bind(&signal.strategy_name)
        .bind(&signal.signal_type)
        .bind(signal.entry_price)
        .bind(signal.stop_loss_price)
        .bind(signal.take_profit_price)
        .bind(signal.short_ma)
        .bind(signal.long_ma)
        .bind(signal.notification.as_str())
        .execute(&self.pool)
        .await
        .context("failed to insert trading signal")?;

        let id = result.last_insert_rowid();
        tracing::info!(
            id,
            asset = %signal.asset_symbol,
            signal = %signal.signal_type,
            entry_price = signal.entry_price,
            "signal logged"
        );
        Ok(id)
    }

    /// The newest `limit` signals, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent_signals(&self, limit: u32) -> Result<Vec<SignalRecord>> {
        let rows = sqlx::query_as::<_, SignalRecord>(
            r"
            SELECT id, timestamp, asset_symbol, strategy_name, signal_type, entry_price,
                   stop_loss_price, take_profit_price, short_ma_value, long_ma_value,
                   telegram_notified_status
            FROM trading_signals
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to query recent signals")?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn eurusd_buy() -> NewSignal {
        NewSignal::new("EUR.USD", "MA Crossover (10/20)", "BUY", 1.085)
            .with_exits(1.079_575, 1.095_85)
            .with_means(1.0845, 1.0840)
            .with_notification(NotificationStatus::Success)
    }

    #[tokio::test]
    async fn test_log_and_read_back() {
        let log = SignalLog::in_memory().await.unwrap();
        let id = log.log_signal(&eurusd_buy()).await.unwrap();
        assert!(id > 0);

        let rows = log.recent_signals(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.asset_symbol, "EUR.USD");
        assert_eq!(row.signal_type, "BUY");
        assert_eq!(row.stop_loss_price, Some(1.079_575));
        assert_eq!(row.short_ma_value, Some(1.0845));
        assert_eq!(row.telegram_notified_status.as_deref(), Some("SUCCESS"));
    }

    #[tokio::test]
    async fn test_optional_fields_stay_null() {
        let log = SignalLog::in_memory().await.unwrap();
        log.log_signal(&NewSignal::new("GBP.JPY", "MA Crossover (5/15)", "SELL", 190.55))
            .await
            .unwrap();

        let row = &log.recent_signals(1).await.unwrap()[0];
        assert_eq!(row.stop_loss_price, None);
        assert_eq!(row.long_ma_value, None);
        assert_eq!(row.telegram_notified_status.as_deref(), Some("NOT_ATTEMPTED"));
    }

    #[tokio::test]
    async fn test_recent_signals_newest_first_with_limit() {
        let log = SignalLog::in_memory().await.unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        for (i, kind) in ["BUY", "SELL", "BUY"].iter().enumerate() {
            let signal = NewSignal::new("EUR.USD", "MA Crossover (10/20)", *kind, 1.08);
            log.log_signal_at(&signal, start + Duration::minutes(i as i64))
                .await
                .unwrap();
        }

        let rows = log.recent_signals(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, start + Duration::minutes(2));
        assert_eq!(rows[1].signal_type, "SELL");
    }

    #[test]
    fn test_notification_status_labels() {
        assert_eq!(NotificationStatus::from_sent(true).as_str(), "SUCCESS");
        assert_eq!(NotificationStatus::from_sent(false).as_str(), "FAILED");
    }
}
