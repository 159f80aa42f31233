use crate::model::{SchemaColumn, SchemaTable};
use crate::schema::SchemaProvider;
use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The database collaborator. Only SELECT-shaped text should reach
/// [`Database::execute`]; that is enforced upstream by the validator.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

pub type Row = serde_json::Map<String, serde_json::Value>;

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a batch of statements. Setup/seeding helper, not part of the
    /// question-answering path.
    pub fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn tables(&self) -> anyhow::Result<Vec<SchemaTable>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", name))?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(SchemaColumn {
                        name: row.get(1)?,
                        data_type: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            tables.push(SchemaTable { name, columns });
        }
        Ok(tables)
    }

    /// Execute a query and return its rows as column-name → value maps,
    /// preserving column order.
    pub fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), value_ref_to_json(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }
}

fn value_ref_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(hex::encode(b)),
    }
}

impl SchemaProvider for Database {
    fn schema(&self) -> anyhow::Result<Vec<SchemaTable>> {
        self.tables()
    }
}
