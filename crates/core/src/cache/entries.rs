//! SQLite implementation of [`CacheStorage`].
//!
//! Entries carry a per-bucket sequence number; `keys` and eviction order by
//! it. An overwrite takes a fresh sequence number.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::storage::CacheStorage;
use crate::Error;
use crate::request::{Request, RequestKey, Response};

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        bucket, request_key, method, url, seq, status, status_text, headers_json, body, stored_at
    ) VALUES (
        ?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM entries WHERE bucket = ?1),
        ?5, ?6, ?7, ?8, ?9
    )
    ON CONFLICT(bucket, request_key) DO UPDATE SET
        seq = excluded.seq,
        status = excluded.status,
        status_text = excluded.status_text,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_BUCKET: &str = "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)";

/// Owned copy of an entry, moved onto the database thread.
struct EntryRow {
    key: RequestKey,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Self {
            key: request.key(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, bucket: &str, now: &str) -> Result<(), Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                bucket,
                &self.key.hash,
                &self.key.method,
                &self.key.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body[..],
                now,
            ],
        )?;
        Ok(())
    }
}

fn decode_response(status: u16, status_text: String, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let headers: Vec<(String, String)> =
        serde_json::from_str(headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(Response { status, status_text, headers, body: Bytes::from(body) })
}

fn query_response(
    conn: &rusqlite::Connection, sql: &str, args: impl rusqlite::Params,
) -> Result<Option<Response>, Error> {
    let result = conn.query_row(sql, args, |row| {
        Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, Vec<u8>>(3)?))
    });

    match result {
        Ok((status, status_text, headers_json, body)) => {
            decode_response(status, status_text, &headers_json, body).map(Some)
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, bucket: &str) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_BUCKET, params![bucket, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, bucket: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![bucket],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, bucket: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![bucket])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let row = EntryRow::new(request, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_BUCKET, params![&bucket, &now])?;
                row.insert(&tx, &bucket, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_BUCKET, params![&bucket, &now])?;
                for row in &rows {
                    row.insert(&tx, &bucket, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error> {
        let bucket = bucket.to_string();
        let hash = request.key().hash;
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                query_response(
                    conn,
                    "SELECT status, status_text, headers_json, body FROM entries
                     WHERE bucket = ?1 AND request_key = ?2",
                    params![bucket, hash],
                )
            })
            .await
            .map_err(Error::from)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let hash = request.key().hash;
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                query_response(
                    conn,
                    "SELECT e.status, e.status_text, e.headers_json, e.body
                     FROM entries e JOIN buckets b ON b.name = e.bucket
                     WHERE e.request_key = ?1
                     ORDER BY b.rowid ASC LIMIT 1",
                    params![hash],
                )
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<RequestKey>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT request_key, method, url FROM entries WHERE bucket = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![bucket], |row| {
                        Ok(RequestKey { hash: row.get(0)?, method: row.get(1)?, url: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_entry(&self, bucket: &str, key: &RequestKey) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE bucket = ?1 AND request_key = ?2",
                    params![bucket, hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn count(&self, bucket: &str) -> Result<usize, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get(Url::parse("https://folio.example").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let resp = Response::new(200, "<h1>hi</h1>").with_header("content-type", "text/html");
        db.put("static-cache-v1", &request("/"), &resp).await.unwrap();

        let hit = db.match_in("static-cache-v1", &request("/")).await.unwrap().unwrap();
        assert_eq!(hit, resp);
        assert!(db.match_in("dynamic-cache-v1", &request("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_insertion_order_and_overwrite() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for path in ["/a.png", "/b.png", "/c.png"] {
            db.put("images-cache-v1", &request(path), &Response::new(200, path)).await.unwrap();
        }
        db.put("images-cache-v1", &request("/a.png"), &Response::new(200, "newer")).await.unwrap();

        let urls: Vec<String> = db.keys("images-cache-v1").await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(
            urls,
            vec!["https://folio.example/b.png", "https://folio.example/c.png", "https://folio.example/a.png"]
        );
        assert_eq!(db.count("images-cache-v1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_match_any_prefers_older_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("static-cache-v1", &request("/style.css"), &Response::new(200, "old")).await.unwrap();
        db.put("dynamic-cache-v1", &request("/style.css"), &Response::new(200, "new")).await.unwrap();

        let hit = db.match_any(&request("/style.css")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from("old"));
    }

    #[tokio::test]
    async fn test_delete_bucket_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("dynamic-cache-v1", &request("/app.js"), &Response::new(200, "js")).await.unwrap();

        assert!(db.delete("dynamic-cache-v1").await.unwrap());
        assert!(!db.delete("dynamic-cache-v1").await.unwrap());
        assert!(db.match_any(&request("/app.js")).await.unwrap().is_none());
        assert_eq!(db.count("dynamic-cache-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_creates_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            (request("/"), Response::new(200, "root")),
            (request("/offline.html"), Response::new(200, "offline")),
        ];
        db.put_all("static-cache-v1", &entries).await.unwrap();

        assert!(db.has("static-cache-v1").await.unwrap());
        assert_eq!(db.keys("static-cache-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_names_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("static-cache-v1").await.unwrap();
        db.open("images-cache-v1").await.unwrap();
        db.open("static-cache-v1").await.unwrap();

        assert_eq!(db.names().await.unwrap(), vec!["static-cache-v1", "images-cache-v1"]);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("images-cache-v1", &request("/a.png"), &Response::new(200, "a")).await.unwrap();
        let key = request("/a.png").key();

        assert!(db.delete_entry("images-cache-v1", &key).await.unwrap());
        assert!(!db.delete_entry("images-cache-v1", &key).await.unwrap());
    }
}
