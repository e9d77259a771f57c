//! Monitored report-store transactions
//!
//! A scoped guard around one SQLite transaction. Acquisition wait and hold
//! times are logged, and a guard dropped without commit or rollback (an
//! early return or a `?` on the error path) is logged as an implicit
//! rollback, so leaked or slow connections show up in the logs.

use dvs_common::{Error, Result};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SLOW_ACQUIRE: Duration = Duration::from_millis(500);
const SATURATED_ACQUIRE: Duration = Duration::from_secs(1);
const LONG_HOLD: Duration = Duration::from_secs(2);

/// Transaction guard tagged with the operation that opened it
pub struct MonitoredTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    operation: &'static str,
    acquired_at: Instant,
}

impl MonitoredTransaction {
    /// Connection to run statements on
    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| Error::Internal(format!("{}: transaction already finished", self.operation)))
    }

    fn finish(&mut self) -> Result<(Transaction<'static, Sqlite>, Duration)> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal(format!("{}: transaction already finished", self.operation)))?;
        Ok((tx, self.acquired_at.elapsed()))
    }

    pub async fn commit(mut self) -> Result<()> {
        let (tx, held) = self.finish()?;
        tx.commit().await?;
        log_release(self.operation, held, "commit");
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        let (tx, held) = self.finish()?;
        tx.rollback().await?;
        log_release(self.operation, held, "rollback");
        Ok(())
    }
}

impl Drop for MonitoredTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let held_ms = self.acquired_at.elapsed().as_millis() as u64;
            warn!(
                operation = self.operation,
                held_ms,
                "Transaction dropped without commit, rolled back"
            );
        }
    }
}

fn log_release(operation: &'static str, held: Duration, how: &'static str) {
    let held_ms = held.as_millis() as u64;
    if held > LONG_HOLD {
        warn!(operation, held_ms, how, "Long transaction held a pooled connection");
    } else {
        debug!(operation, held_ms, how, "Connection released");
    }
}

/// Open a monitored transaction on `pool`
pub async fn begin_monitored(pool: &SqlitePool, operation: &'static str) -> Result<MonitoredTransaction> {
    let start = Instant::now();
    let tx = pool.begin().await?;
    let wait = start.elapsed();
    let wait_ms = wait.as_millis() as u64;

    if wait > SATURATED_ACQUIRE {
        warn!(
            operation,
            wait_ms,
            pool_size = pool.size(),
            idle = pool.num_idle(),
            "Slow connection acquisition, pool may be saturated"
        );
    } else if wait > SLOW_ACQUIRE {
        info!(operation, wait_ms, "Connection acquisition slower than expected");
    } else {
        debug!(operation, wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx: Some(tx),
        operation,
        acquired_at: Instant::now(),
    })
}
