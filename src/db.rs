use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::record::Record;

pub fn connect(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id           INTEGER PRIMARY KEY,
            title        TEXT NOT NULL,
            url          TEXT NOT NULL,
            published_at TEXT NOT NULL,
            source       TEXT NOT NULL,
            fingerprint  TEXT NOT NULL UNIQUE,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Upsert ──

/// Insert-or-update keyed by fingerprint. Returns true when a new row was
/// inserted. An existing row only ever has its title refreshed; created_at
/// and all other columns are left alone.
pub fn upsert(conn: &Connection, r: &Record) -> Result<bool> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, title FROM records WHERE fingerprint = ?1",
            rusqlite::params![r.fingerprint],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    if let Some((id, title)) = existing {
        if title != r.title {
            conn.execute(
                "UPDATE records SET title = ?1 WHERE id = ?2",
                rusqlite::params![r.title, id],
            )?;
        }
        return Ok(false);
    }

    let inserted = conn.execute(
        "INSERT INTO records (title, url, published_at, source, fingerprint)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            r.title,
            r.url,
            r.published_at.to_string(),
            r.source,
            r.fingerprint,
        ],
    );

    match inserted {
        Ok(_) => Ok(true),
        // Lost a lookup-then-insert race with a concurrent run; the unique
        // index is the backstop. Resolve as the update branch.
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            conn.execute(
                "UPDATE records SET title = ?1 WHERE fingerprint = ?2",
                rusqlite::params![r.title, r.fingerprint],
            )?;
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply `upsert` to each record in input order within one transaction.
/// Returns the number of new insertions.
pub fn upsert_many(conn: &Connection, records: &[Record]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    for r in records {
        if upsert(&tx, r)? {
            inserted += 1;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

// ── Listing ──

pub struct StoredRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub published_at: NaiveDate,
    pub source: String,
    pub fingerprint: String,
    pub created_at: String,
}

pub fn list_all(conn: &Connection) -> Result<Vec<StoredRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, url, published_at, source, fingerprint, created_at
         FROM records
         ORDER BY published_at DESC, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let date: String = row.get(3)?;
            let published_at = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(StoredRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                published_at,
                source: row.get(4)?,
                fingerprint: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_records(conn: &Connection) -> Result<usize> {
    let n: usize = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fingerprint;

    fn record(title: &str, url: &str) -> Record {
        let key = if url.is_empty() { title } else { url };
        Record {
            title: title.to_string(),
            url: url.to_string(),
            published_at: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            source: "https://example.com/tenders".to_string(),
            fingerprint: fingerprint(key),
        }
    }

    fn fresh() -> Connection {
        let conn = connect_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_is_idempotent() {
        let conn = fresh();
        let r = record("Natječaj 1", "https://demo/1");
        assert!(upsert(&conn, &r).unwrap());
        assert!(!upsert(&conn, &r).unwrap());
        assert_eq!(count_records(&conn).unwrap(), 1);
    }

    #[test]
    fn title_change_updates_in_place() {
        let conn = fresh();
        upsert(&conn, &record("Old title", "https://demo/1")).unwrap();
        let before = list_all(&conn).unwrap().remove(0);

        let inserted = upsert(&conn, &record("New title", "https://demo/1")).unwrap();
        assert!(!inserted);

        let after = list_all(&conn).unwrap().remove(0);
        assert_eq!(after.title, "New title");
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.id, before.id);
        assert_eq!(count_records(&conn).unwrap(), 1);
    }

    #[test]
    fn batch_counts_only_new_rows() {
        let conn = fresh();
        let batch = vec![
            record("Natječaj 1", "https://demo/1"),
            record("Natječaj 2", "https://demo/2"),
        ];
        assert_eq!(upsert_many(&conn, &batch).unwrap(), 2);
        assert_eq!(upsert_many(&conn, &batch).unwrap(), 0);
        assert_eq!(count_records(&conn).unwrap(), 2);
    }

    #[test]
    fn duplicate_fingerprints_in_batch_last_write_wins() {
        let conn = fresh();
        let batch = vec![
            record("First title", "https://demo/1"),
            record("Second title", "https://demo/1"),
        ];
        assert_eq!(upsert_many(&conn, &batch).unwrap(), 1);
        let rows = list_all(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Second title");
    }

    #[test]
    fn empty_links_with_same_title_collide() {
        let conn = fresh();
        let batch = vec![record("Natječaj", ""), record("Natječaj", "")];
        assert_eq!(upsert_many(&conn, &batch).unwrap(), 1);
    }

    #[test]
    fn listing_sorted_by_date_desc() {
        let conn = fresh();
        let mut older = record("Older", "https://demo/old");
        older.published_at = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let newer = record("Newer", "https://demo/new");
        upsert_many(&conn, &[older, newer]).unwrap();

        let rows = list_all(&conn).unwrap();
        assert_eq!(rows[0].title, "Newer");
        assert_eq!(rows[1].title, "Older");
    }
}
