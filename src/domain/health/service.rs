use std::sync::OnceLock;
use std::time::{Duration, Instant};

use sea_orm::DatabaseConnection;
use tokio::time::timeout;

use super::dto::{DependencyState, HealthState, HealthStatus};

static START_TIME: OnceLock<Instant> = OnceLock::new();

const DB_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Call once at start-up.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

pub fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

pub async fn check_health(db: &DatabaseConnection) -> HealthStatus {
    let database = ping_database(db).await;

    HealthStatus {
        status: overall_state(database),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime_secs(),
        database,
    }
}

fn overall_state(database: DependencyState) -> HealthState {
    match database {
        DependencyState::Up => HealthState::Ok,
        DependencyState::Down => HealthState::Degraded,
    }
}

async fn ping_database(db: &DatabaseConnection) -> DependencyState {
    let start = Instant::now();

    match timeout(DB_PING_TIMEOUT, db.ping()).await {
        Ok(Ok(())) => {
            tracing::debug!(latency_ms = start.elapsed().as_millis() as u64, "Database ping ok");
            DependencyState::Up
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Database ping failed");
            DependencyState::Down
        }
        Err(_) => {
            tracing::warn!("Database ping timed out");
            DependencyState::Down
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_start_time_should_set_once() {
        init_start_time();
        let first = START_TIME.get().copied();
        init_start_time();

        assert_eq!(first, START_TIME.get().copied());
    }

    #[test]
    fn overall_state_should_follow_database() {
        assert_eq!(overall_state(DependencyState::Up), HealthState::Ok);
        assert_eq!(overall_state(DependencyState::Down), HealthState::Degraded);
    }

    #[tokio::test]
    async fn check_health_should_report_up_for_live_sqlite() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();

        let status = check_health(&db).await;

        assert_eq!(status.database, DependencyState::Up);
        assert_eq!(status.status, HealthState::Ok);
    }
}
