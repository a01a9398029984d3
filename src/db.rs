use crate::error::Result;
use crate::types::{HistoryEntry, Usage};
use rusqlite::{params, params_from_iter, Connection};
use std::{collections::HashMap, path::Path};

/// Durable history rows plus per-phrase usage counters.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Fails every write; reads still work.
    #[cfg(test)]
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    pub fn record(&mut self, input: &str, key: Option<&str>, success: bool) -> Result<()> {
        self.record_at(input, key, success, chrono::Utc::now().timestamp())
    }

    /// Append a history row and, when `key` is given, bump its usage counter
    /// in the same transaction.
    pub fn record_at(
        &mut self,
        input: &str,
        key: Option<&str>,
        success: bool,
        ts: i64,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO history (input, success, ts) VALUES (?1, ?2, ?3)",
            params![input, success as i32, ts],
        )?;
        if let Some(key) = key {
            tx.execute(
                "INSERT INTO usage (key, count, last_ts) VALUES (?1, 1, ?2)
                 ON CONFLICT(key) DO UPDATE SET count = count + 1, last_ts = excluded.last_ts",
                params![key, ts],
            )?;
        }
        tx.commit()?;
        log::debug!("recorded {:?} (success: {})", input, success);
        Ok(())
    }

    /// Usage for the given keys. Keys never recorded are left out.
    pub fn usage(&self, keys: &[String]) -> Result<HashMap<String, Usage>> {
        let mut result = HashMap::new();
        if keys.is_empty() {
            return Ok(result);
        }

        let placeholders = vec!["?"; keys.len()].join(",");
        let sql = format!(
            "SELECT key, count, last_ts FROM usage WHERE key IN ({})",
            placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(keys.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                Usage {
                    count: row.get(1)?,
                    last_used: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (key, usage) = row?;
            result.insert(key, usage);
        }
        Ok(result)
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT input, success, ts FROM history ORDER BY ts DESC, id DESC LIMIT ?1")?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(HistoryEntry {
                    input: row.get(0)?,
                    success: row.get::<_, i32>(1)? != 0,
                    timestamp: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn init_db(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            input TEXT NOT NULL,
            success INTEGER NOT NULL,
            ts INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS usage (
            key TEXT PRIMARY KEY,
            count INTEGER NOT NULL,
            last_ts INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::normalize;
    use tempfile::tempdir;

    #[test]
    fn record_and_usage() {
        let dir = tempdir().unwrap();
        let mut store = HistoryStore::open(&dir.path().join("history.db")).unwrap();

        let input = "MSU   D2L";
        let key = normalize(input);
        store.record(input, Some(key.as_str()), true).unwrap();

        let usage = store.usage(&[key.clone()]).unwrap();
        assert_eq!(usage[&key].count, 1);
    }

    #[test]
    fn repeated_key_increments_and_refreshes() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store.record_at("gh", Some("gh"), true, 100).unwrap();
        store.record_at("GH", Some("gh"), false, 250).unwrap();

        let usage = store.usage(&["gh".to_string()]).unwrap();
        assert_eq!(
            usage["gh"],
            Usage {
                count: 2,
                last_used: 250
            }
        );
    }

    #[test]
    fn absent_keys_are_omitted() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store.record_at("a", Some("a"), true, 1).unwrap();

        let usage = store
            .usage(&["a".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(usage.len(), 1);
        assert!(!usage.contains_key("missing"));
        assert!(store.usage(&[]).unwrap().is_empty());
    }

    #[test]
    fn history_is_append_only_newest_first() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store.record_at("first", Some("first"), true, 10).unwrap();
        store.record_at("second", Some("second"), false, 20).unwrap();
        store.record_at("first", Some("first"), true, 30).unwrap();

        let recent = store.recent(10).unwrap();
        let inputs: Vec<_> = recent.iter().map(|e| e.input.as_str()).collect();
        assert_eq!(inputs, vec!["first", "second", "first"]);
        assert!(!recent[1].success);
        assert_eq!(store.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn history_without_usage() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store.record_at("plan deploy.json", None, true, 7).unwrap();

        assert_eq!(store.recent(5).unwrap()[0].input, "plan deploy.json");
        assert!(store
            .usage(&["plan deploy.json".to_string()])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn read_only_store_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");
        HistoryStore::open(&path).unwrap();

        let mut store = HistoryStore::open_read_only(&path).unwrap();
        assert!(matches!(
            store.record("gh", Some("gh"), true),
            Err(crate::error::Error::Storage(_))
        ));
        assert!(store.recent(1).unwrap().is_empty());
    }

    #[test]
    fn reopening_keeps_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");
        HistoryStore::open(&path)
            .unwrap()
            .record_at("gh", Some("gh"), true, 5)
            .unwrap();

        let store = HistoryStore::open(&path).unwrap();
        assert_eq!(store.usage(&["gh".to_string()]).unwrap()["gh"].count, 1);
    }
}
