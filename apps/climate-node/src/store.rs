use crate::record::{NodeLatestView, RecordStatus, ResultRecord, LOCAL_NODE_ID};
use crate::time::{format_timestamp, parse_timestamp};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored timestamp {0:?} is not parseable")]
    InvalidTimestamp(String),
    #[error("store task failed: {0}")]
    Task(String),
}

/// Append-only result log backed by a SQLite file.
///
/// Every operation opens its own connection, so appends from the sampler and
/// from concurrent ingestion requests are serialized by SQLite itself and
/// reads see a WAL snapshot.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = store.connect()?;
        init_schema(&conn)?;
        tracing::info!(path = %store.path.display(), "result store ready");
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Run a store operation on the blocking pool.
    pub async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|err| StoreError::Task(err.to_string()))?
    }

    pub fn append(&self, record: &ResultRecord) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        let node_id = if record.node_id.trim().is_empty() {
            LOCAL_NODE_ID
        } else {
            record.node_id.as_str()
        };
        conn.execute(
            "INSERT INTO sensor_data (timestamp, sensor, value, status, node_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_timestamp(&record.timestamp),
                record.sensor,
                record.value,
                record.status.as_str(),
                node_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first by timestamp, optionally restricted to one node.
    pub fn recent(&self, limit: usize, node_id: Option<&str>) -> Result<Vec<ResultRecord>, StoreError> {
        let conn = self.connect()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match node_id {
            Some(node_id) => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, sensor, value, status, node_id FROM sensor_data
                     WHERE node_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![node_id, limit], read_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, sensor, value, status, node_id FROM sensor_data
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], read_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(RawRow::into_record).collect()
    }

    /// For every (node, metric) partition pick the max-timestamp record, then
    /// regroup by node. Ties on timestamp resolve to the later insert.
    pub fn latest_per_node(&self) -> Result<BTreeMap<String, NodeLatestView>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT s.timestamp, s.sensor, s.value, s.status, s.node_id
             FROM sensor_data s
             JOIN (
                 SELECT node_id, sensor, MAX(timestamp) AS latest
                 FROM sensor_data
                 GROUP BY node_id, sensor
             ) m ON s.node_id = m.node_id AND s.sensor = m.sensor AND s.timestamp = m.latest
             ORDER BY s.id ASC",
        )?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut views: BTreeMap<String, NodeLatestView> = BTreeMap::new();
        for row in rows {
            let record = row.into_record()?;
            let Some(metric) = record.metric() else {
                continue;
            };
            let view = views.entry(record.node_id.clone()).or_default();
            *view.slot_mut(metric) = Some(record);
        }
        Ok(views)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sensor_data", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            sensor TEXT NOT NULL,
            value REAL,
            status TEXT NOT NULL
        );
        "#,
    )?;

    // Databases written before multi-node support have no node column.
    if !has_column(conn, "sensor_data", "node_id")? {
        tracing::info!("adding node_id column to sensor_data");
        conn.execute_batch("ALTER TABLE sensor_data ADD COLUMN node_id TEXT NOT NULL DEFAULT 'host';")?;
    }

    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp ON sensor_data (timestamp);
        CREATE INDEX IF NOT EXISTS idx_sensor_data_node_sensor_ts ON sensor_data (node_id, sensor, timestamp);
        "#,
    )?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

struct RawRow {
    timestamp: String,
    sensor: String,
    value: Option<f64>,
    status: String,
    node_id: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        timestamp: row.get(0)?,
        sensor: row.get(1)?,
        value: row.get(2)?,
        status: row.get(3)?,
        node_id: row.get(4)?,
    })
}

impl RawRow {
    fn into_record(self) -> Result<ResultRecord, StoreError> {
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or(StoreError::InvalidTimestamp(self.timestamp))?;
        Ok(ResultRecord {
            timestamp,
            sensor: self.sensor,
            value: self.value,
            status: RecordStatus::from(self.status),
            node_id: self.node_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Metric;
    use crate::thresholds::EvaluationStatus;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("sensor_data.db")).unwrap()
    }

    fn record(
        ts: chrono::DateTime<Utc>,
        metric: Metric,
        value: f64,
        node_id: &str,
    ) -> ResultRecord {
        ResultRecord::evaluated(ts, metric, Some(value), EvaluationStatus::Stable, node_id)
    }

    #[test]
    fn append_then_recent_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let written = ResultRecord::evaluated(
            Utc::now(),
            Metric::Humidity,
            Some(55.25),
            EvaluationStatus::Stable,
            "pi-31",
        );
        store.append(&written).unwrap();

        let fetched = store.recent(1, None).unwrap();
        assert_eq!(fetched.len(), 1);
        let got = &fetched[0];
        assert_eq!(got.sensor, written.sensor);
        assert_eq!(got.value, written.value);
        assert_eq!(got.status, written.status);
        assert_eq!(got.node_id, written.node_id);
        assert_eq!(got.timestamp.timestamp_micros(), written.timestamp.timestamp_micros());
    }

    #[test]
    fn null_values_are_preserved() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let rec = ResultRecord::evaluated(
            Utc::now(),
            Metric::Temperature,
            None,
            EvaluationStatus::Invalid,
            LOCAL_NODE_ID,
        );
        store.append(&rec).unwrap();
        let fetched = store.recent(5, None).unwrap();
        assert_eq!(fetched[0].value, None);
        assert_eq!(fetched[0].status, RecordStatus::Evaluated(EvaluationStatus::Invalid));
    }

    #[test]
    fn blank_node_id_defaults_to_host() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let mut rec = record(Utc::now(), Metric::Temperature, 20.0, "");
        rec.node_id = "  ".to_string();
        store.append(&rec).unwrap();
        assert_eq!(store.recent(1, None).unwrap()[0].node_id, LOCAL_NODE_ID);
    }

    #[test]
    fn recent_is_newest_first_and_filters_by_node() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let t0 = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        for i in 0..5 {
            let ts = t0 + ChronoDuration::seconds(i);
            let node = if i % 2 == 0 { "pi-1" } else { "pi-2" };
            store.append(&record(ts, Metric::Temperature, 20.0 + i as f64, node)).unwrap();
        }

        let all = store.recent(3, None).unwrap();
        let values: Vec<f64> = all.iter().filter_map(|r| r.value).collect();
        assert_eq!(values, vec![24.0, 23.0, 22.0]);

        let pi2 = store.recent(10, Some("pi-2")).unwrap();
        assert_eq!(pi2.len(), 2);
        assert!(pi2.iter().all(|r| r.node_id == "pi-2"));
        assert!(pi2[0].timestamp > pi2[1].timestamp);
    }

    #[test]
    fn recent_orders_by_timestamp_not_insert_order() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let t0 = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        store.append(&record(t0 + ChronoDuration::minutes(5), Metric::Temperature, 2.0, "a")).unwrap();
        store.append(&record(t0, Metric::Temperature, 1.0, "a")).unwrap();
        let fetched = store.recent(1, None).unwrap();
        assert_eq!(fetched[0].value, Some(2.0));
    }

    #[test]
    fn latest_per_node_selects_each_metric_independently() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let t1 = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let t2 = t1 + ChronoDuration::seconds(30);

        store.append(&record(t1, Metric::Temperature, 20.0, "pi-7")).unwrap();
        store.append(&record(t2, Metric::Temperature, 22.0, "pi-7")).unwrap();
        store.append(&record(t1, Metric::Humidity, 50.0, "pi-7")).unwrap();
        store.append(&record(t1, Metric::Humidity, 61.0, "pi-8")).unwrap();

        let views = store.latest_per_node().unwrap();
        assert_eq!(views.len(), 2);

        let pi7 = &views["pi-7"];
        assert_eq!(pi7.temperature.as_ref().and_then(|r| r.value), Some(22.0));
        assert_eq!(pi7.humidity.as_ref().and_then(|r| r.value), Some(50.0));

        let pi8 = &views["pi-8"];
        assert!(pi8.temperature.is_none());
        assert_eq!(pi8.humidity.as_ref().and_then(|r| r.value), Some(61.0));
    }

    #[test]
    fn latest_per_node_breaks_timestamp_ties_by_insert_order() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let t = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        store.append(&record(t, Metric::Temperature, 20.0, "pi-7")).unwrap();
        store.append(&record(t, Metric::Temperature, 21.0, "pi-7")).unwrap();
        let views = store.latest_per_node().unwrap();
        assert_eq!(views["pi-7"].temperature.as_ref().and_then(|r| r.value), Some(21.0));
    }

    #[test]
    fn open_migrates_legacy_schema_without_node_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE sensor_data (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp TEXT NOT NULL,
                    sensor TEXT NOT NULL,
                    value REAL,
                    status TEXT NOT NULL
                );
                INSERT INTO sensor_data (timestamp, sensor, value, status)
                VALUES ('2025-05-01T10:00:00.000000', 'temperature', 23.5, 'OK');",
            )
            .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let rows = store.recent(10, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node_id, LOCAL_NODE_ID);
        assert_eq!(rows[0].status, RecordStatus::Reported("OK".to_string()));
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_persisted() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let mut tasks = Vec::new();
        for node in 0..4 {
            let store = store.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                for i in 0..25 {
                    let rec = record(Utc::now(), Metric::Temperature, i as f64, &format!("pi-{node}"));
                    store.append(&rec).unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let count = store.blocking(|s| s.count()).await.unwrap();
        assert_eq!(count, 100);
    }
}
