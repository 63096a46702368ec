//! Entry storage and lookup.
//!
//! Entries are keyed by request identity (method and URL). Only `GET`
//! requests may be stored. Lookups either target one partition or search
//! every partition in creation order and return the first hit.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::partitions::{Partition, ensure_partition};
use crate::Error;
use crate::request::{CacheRequest, StoredResponse};

/// Listing row for one stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub stored_at: String,
}

/// A prepared row ready for insertion.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn build(request: &CacheRequest, response: &StoredResponse) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!(
                "only GET requests can be cached, got {} {}",
                request.method, request.url
            )));
        }
        Ok(Self {
            key: request.cache_key(),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, partition_id: i64, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (partition_id, key, method, url, status, headers_json, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(partition_id, key) DO UPDATE SET
                status = excluded.status,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                partition_id,
                &self.key,
                &self.method,
                &self.url,
                self.status as i64,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn decode_response(status: i64, headers_json: String, body: Vec<u8>) -> Result<StoredResponse, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} out of range")))?;
    Ok(StoredResponse { status, headers, body })
}

impl Partition {
    /// Store a response for `request`, replacing any previous entry.
    pub async fn put(&self, request: &CacheRequest, response: &StoredResponse) -> Result<(), Error> {
        let row = EntryRow::build(request, response)?;
        let id = self.id;
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { row.insert(conn, id, &now) })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `request` in this partition only.
    pub async fn match_request(&self, request: &CacheRequest) -> Result<Option<StoredResponse>, Error> {
        let key = request.cache_key();
        let id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE partition_id = ?1 AND key = ?2",
                        params![id, key],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;
                row.map(|(status, headers, body)| decode_response(status, headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Entries in this partition, oldest first.
    pub async fn entries(&self) -> Result<Vec<EntryInfo>, Error> {
        let id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntryInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, stored_at FROM entries
                     WHERE partition_id = ?1 ORDER BY stored_at ASC, url ASC",
                )?;
                let rows = stmt
                    .query_map(params![id], |row| {
                        Ok(EntryInfo {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get::<_, i64>(2)? as u16,
                            stored_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Create partition `name` and store every pair in one transaction.
    ///
    /// Either the partition appears with all of its entries or nothing
    /// changes, so a failed install never leaves an empty partition behind.
    pub async fn populate(&self, name: &str, pairs: &[(CacheRequest, StoredResponse)]) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name must not be empty".into()));
        }
        let rows = pairs
            .iter()
            .map(|(req, resp)| EntryRow::build(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;
                let id = ensure_partition(&tx, &name, &now)?;
                for row in &rows {
                    row.insert(&tx, id, &now)?;
                }
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), id })
    }

    /// Search every partition, oldest first, for an entry matching `request`.
    pub async fn match_any(&self, request: &CacheRequest) -> Result<Option<StoredResponse>, Error> {
        let key = request.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.status, e.headers_json, e.body
                         FROM entries e JOIN partitions p ON p.id = e.partition_id
                         WHERE e.key = ?1
                         ORDER BY p.id ASC LIMIT 1",
                        params![key],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;
                row.map(|(status, headers, body)| decode_response(status, headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }
}
