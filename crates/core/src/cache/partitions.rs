//! Named partition management.
//!
//! A partition is created the first time it is opened and lives until it is
//! deleted by name. Partitions remember their creation order, which is the
//! order cross-partition lookups search them in.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use crate::Error;

/// Handle to one open partition.
///
/// Writes through a handle whose partition has since been deleted fail on the
/// foreign key instead of bringing the partition back.
#[derive(Clone, Debug)]
pub struct Partition {
    pub(crate) db: CacheDb,
    pub(crate) id: i64,
}

/// Summary row for listing partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Open a partition by name, creating it if absent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name must not be empty".into()));
        }
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> { ensure_partition(conn, &name, &now) })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), id })
    }

    /// Handle to an existing partition, or `None` without creating one.
    pub async fn partition(&self, name: &str) -> Result<Option<Partition>, Error> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| -> Result<Option<i64>, Error> {
                let id = conn
                    .query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))
                    .optional()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(id.map(|id| Partition { db: self.clone(), id }))
    }

    /// Whether a partition with this name exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All partitions with their entry counts, in creation order.
    pub async fn partitions(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.created_at, COUNT(e.key)
                     FROM partitions p LEFT JOIN entries e ON e.partition_id = p.id
                     GROUP BY p.id ORDER BY p.id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let id: Option<i64> = conn
                    .query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))
                    .optional()?;
                let Some(id) = id else {
                    return Ok(false);
                };
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition_id = ?1", params![id])?;
                tx.execute("DELETE FROM partitions WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }
}

/// Create `name` if absent and return its id. Runs inside the caller's
/// connection or transaction.
pub(crate) fn ensure_partition(conn: &rusqlite::Connection, name: &str, now: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
         ON CONFLICT(name) DO NOTHING",
        params![name, now],
    )?;
    let id = conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}
