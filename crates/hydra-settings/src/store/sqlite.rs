//! Durable key-value store on `SQLite`

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{
    ensure_storable, migrations, ChangeHandler, ChangeNotifier, KeyFilter, KeyValueStore,
    Subscription,
};
use crate::error::{Error, Result};
use crate::models::{SettingValue, SettingValueType};
use crate::util::unix_millis_now;

/// `SQLite`-backed [`KeyValueStore`]; one row per key with its type tag.
pub struct SqliteKeyStore {
    conn: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl SqliteKeyStore {
    /// Open a store at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        Self::configure(&conn);
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            notifier: ChangeNotifier::default(),
        })
    }

    fn configure(conn: &Connection) {
        // In-memory databases reject WAL; that's fine.
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
    }

    fn decode(key: &str, kind: &str, raw: &str) -> Option<SettingValue> {
        let value = SettingValueType::parse(kind)
            .and_then(|value_type| SettingValue::parse_as(value_type, raw));
        if value.is_none() {
            tracing::warn!("Ignoring undecodable {kind} value stored under {key}");
        }
        value
    }
}

impl KeyValueStore for SqliteKeyStore {
    fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        let conn = self.conn.lock().map_err(|error| Error::poisoned(&error))?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT kind, value FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.and_then(|(kind, raw)| Self::decode(key, &kind, &raw)))
    }

    fn set(&self, key: &str, value: SettingValue) -> Result<()> {
        ensure_storable(key, &value)?;
        {
            let conn = self.conn.lock().map_err(|error| Error::poisoned(&error))?;
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, kind, value, written_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    key,
                    value.value_type().as_str(),
                    value.to_storage_text(),
                    unix_millis_now()
                ],
            )?;
        }
        self.notifier.notify(key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        {
            let conn = self.conn.lock().map_err(|error| Error::poisoned(&error))?;
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        }
        self.notifier.notify(key);
        Ok(())
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().map_err(|error| Error::poisoned(&error))?;
        let mut statement = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = statement
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn subscribe(&self, filter: KeyFilter, handler: ChangeHandler) -> Subscription {
        self.notifier.subscribe(filter, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn set_get_delete_typed_values() {
        let store = SqliteKeyStore::open_in_memory().unwrap();
        store.set("acctSetting:alice:postTitleLength", SettingValue::Number(120.0)).unwrap();
        store.set("acctSetting:alice:blurNSFW", SettingValue::Boolean(true)).unwrap();
        store.set("currentUser", SettingValue::from("Alice")).unwrap();

        assert_eq!(
            store.get("acctSetting:alice:postTitleLength").unwrap(),
            Some(SettingValue::Number(120.0))
        );
        assert_eq!(store.get_bool("acctSetting:alice:blurNSFW").unwrap(), Some(true));
        assert_eq!(store.get_string("currentUser").unwrap().as_deref(), Some("Alice"));

        store.delete("currentUser").unwrap();
        assert_eq!(store.get("currentUser").unwrap(), None);
        assert_eq!(
            store.all_keys().unwrap(),
            vec![
                "acctSetting:alice:blurNSFW".to_string(),
                "acctSetting:alice:postTitleLength".to_string()
            ]
        );
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");
        {
            let store = SqliteKeyStore::open(&path).unwrap();
            store.set("acctSetting:bob:theme", SettingValue::from("dark")).unwrap();
        }
        let store = SqliteKeyStore::open(&path).unwrap();
        assert_eq!(
            store.get_string("acctSetting:bob:theme").unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn infinite_number_is_rejected_and_not_written() {
        let store = SqliteKeyStore::open_in_memory().unwrap();
        store.set("acctSetting:alice:fontScale", SettingValue::Number(1.0)).unwrap();

        let result = store.set("acctSetting:alice:fontScale", SettingValue::Number(f64::INFINITY));

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(
            store.get("acctSetting:alice:fontScale").unwrap(),
            Some(SettingValue::Number(1.0))
        );
    }

    #[test]
    fn mutations_notify_listeners() {
        let store = SqliteKeyStore::open_in_memory().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _subscription = store.subscribe(
            Box::new(|_| true),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.set("a", SettingValue::Boolean(true)).unwrap();
        store.delete("a").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
