//! SQLite-backed [`CacheStore`] implementation.
//!
//! Partitions live in the `caches` table; entries in `cache_entries`
//! cascade away when their partition is deleted.

use async_trait::async_trait;
use http::StatusCode;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::store::{CacheStore, ensure_cacheable};
use crate::Error;
use crate::exchange::{ProxyRequest, ProxyResponse};

/// A stored response snapshot, as persisted.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub cache_name: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers_json: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Snapshot a response for storage under `cache_name`.
    pub fn capture(cache_name: &str, request: &ProxyRequest, response: &ProxyResponse) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Self {
            cache_name: cache_name.to_string(),
            key_hash: request.cache_key(),
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: response.status.as_u16(),
            headers_json,
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Rebuild the response this entry was captured from.
    pub fn to_response(&self) -> Result<ProxyResponse, Error> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| Error::CorruptEntry(format!("{} has status {}: {e}", self.url, self.status)))?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        Ok(ProxyResponse { status, headers, body: self.body.clone().into() })
    }
}

fn insert_entry(conn: &rusqlite::Connection, entry: &CacheEntry) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![&entry.cache_name, &entry.stored_at],
    )?;
    conn.execute(
        "INSERT INTO cache_entries (
            cache_name, key_hash, method, url, status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &entry.cache_name,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status as i64,
            &entry.headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Get the raw stored entry for a request.
    ///
    /// Returns None for misses and for non-GET requests.
    pub async fn get_entry(&self, name: &str, request: &ProxyRequest) -> Result<Option<CacheEntry>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let name = name.to_string();
        let key_hash = request.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, key_hash, method, url, status, headers_json, body, stored_at
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, key_hash], |row| {
                    Ok(CacheEntry {
                        cache_name: row.get(0)?,
                        key_hash: row.get(1)?,
                        method: row.get(2)?,
                        url: row.get(3)?,
                        status: row.get::<_, i64>(4)? as u16,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(&self, name: &str, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        match self.get_entry(name, request).await? {
            Some(entry) => entry.to_response().map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, name: &str, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
        ensure_cacheable(request)?;
        let entry = CacheEntry::capture(name, request, response)?;
        self.conn
            .call(move |conn| insert_entry(conn, &entry))
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: &[(ProxyRequest, ProxyResponse)]) -> Result<(), Error> {
        let captured = entries
            .iter()
            .map(|(request, response)| {
                ensure_cacheable(request)?;
                CacheEntry::capture(name, request, response)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                for entry in &captured {
                    insert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
