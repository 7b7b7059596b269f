use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use crate::answer::{ProductFilter, SectionRetriever};
use crate::model::{DocumentFormat, DocumentProduct, RecordMetadata, RetrievableRecord};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

const RECORD_COLUMNS: &str = "
    r.source, r.file_name, r.product_name, r.format, r.section, r.section_id,
    r.section_title, r.parent_section, r.parent_section_id, r.page_content
";

#[derive(Debug, Clone, Serialize)]
pub struct StoreCounts {
    pub documents: i64,
    pub records: i64,
    pub unknown_products: i64,
}

/// SQLite copy of the assembled records, keyed to the corpus signature and
/// config fingerprint they were built from.
#[derive(Debug)]
pub struct RecordStore {
    connection: Connection,
}

impl RecordStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        configure_connection(&connection)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn corpus_signature(&self) -> Result<Option<String>> {
        self.metadata_value("corpus_signature")
    }

    pub fn config_fingerprint(&self) -> Result<Option<String>> {
        self.metadata_value("config_fingerprint")
    }

    pub fn metadata_value(&self, key: &str) -> Result<Option<String>> {
        let mut statement = self
            .connection
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let mut rows = statement.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Swaps the whole record set, the corpus signature and the pipeline
    /// config fingerprint in one transaction.
    pub fn replace_all(
        &mut self,
        records: &[RetrievableRecord],
        products: &[DocumentProduct],
        signature: &str,
        config_fingerprint: &str,
    ) -> Result<usize> {
        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        tx.execute("DELETE FROM documents", [])?;

        {
            let mut document_statement = tx.prepare(
                "
                INSERT INTO documents(source, file_name, product_name)
                VALUES(?1, ?2, ?3)
                ON CONFLICT(source) DO UPDATE SET
                  file_name=excluded.file_name,
                  product_name=excluded.product_name
                ",
            )?;
            for product in products {
                document_statement.execute(params![
                    product.source,
                    product.file_name,
                    product.product_name,
                ])?;
            }

            let mut record_statement = tx.prepare(
                "
                INSERT INTO records(
                  record_id, ordinal, source, file_name, product_name, format, section,
                  section_id, section_title, parent_section, parent_section_id, page_content
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ",
            )?;

            let mut previous_source = "";
            let mut seq = 0usize;
            for (ordinal, record) in records.iter().enumerate() {
                let metadata = &record.metadata;
                if metadata.source != previous_source {
                    previous_source = &metadata.source;
                    seq = 0;
                }
                seq += 1;

                record_statement.execute(params![
                    format!("{}#{:04}", metadata.file_name, seq),
                    ordinal as i64,
                    metadata.source,
                    metadata.file_name,
                    metadata.product_name,
                    metadata.format.as_str(),
                    metadata.section,
                    metadata.section_id,
                    metadata.section_title,
                    metadata.parent_section,
                    metadata.parent_section_id,
                    record.page_content,
                ])?;
            }
        }

        let now = now_utc_string();
        for (key, value) in [
            ("corpus_signature", signature),
            ("config_fingerprint", config_fingerprint),
            ("records_updated_at", now.as_str()),
        ] {
            tx.execute(
                "INSERT INTO metadata(key, value) VALUES(?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value=excluded.value",
                params![key, value],
            )?;
        }

        tx.execute("INSERT INTO records_fts(records_fts) VALUES('rebuild')", [])
            .context("failed to rebuild FTS index")?;
        tx.commit()?;

        info!(records = records.len(), documents = products.len(), "replaced stored records");
        Ok(records.len())
    }

    pub fn all_records(&self) -> Result<Vec<RetrievableRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records r ORDER BY r.ordinal ASC");
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query([])?;
        collect_records(&mut rows)
    }

    /// Records whose `section` key equals `heading` exactly, in corpus order.
    pub fn find_by_heading(
        &self,
        heading: &str,
        filter: &ProductFilter,
    ) -> Result<Vec<RetrievableRecord>> {
        let sql = format!(
            "
            SELECT {RECORD_COLUMNS}
            FROM records r
            WHERE r.section = ?1
              AND (?2 IS NULL OR lower(r.product_name) = lower(?2))
            ORDER BY r.ordinal ASC
            "
        );
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query(params![heading, filter.product()])?;
        collect_records(&mut rows)
    }

    /// FTS5 keyword search ranked by bm25, ties broken by corpus order.
    pub fn lexical_search(
        &self,
        query: &str,
        filter: &ProductFilter,
        limit: usize,
    ) -> Result<Vec<RetrievableRecord>> {
        let fts_query = to_fts_query(query);
        if fts_query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "
            SELECT {RECORD_COLUMNS}
            FROM records_fts
            JOIN records r ON r.rowid = records_fts.rowid
            WHERE records_fts MATCH ?1
              AND (?2 IS NULL OR lower(r.product_name) = lower(?2))
            ORDER BY bm25(records_fts) ASC, r.ordinal ASC
            LIMIT ?3
            "
        );
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query(params![fts_query, filter.product(), limit as i64])?;
        collect_records(&mut rows)
    }

    pub fn products(&self) -> Result<Vec<DocumentProduct>> {
        let mut statement = self.connection.prepare(
            "SELECT source, file_name, product_name FROM documents ORDER BY file_name ASC",
        )?;
        let mut rows = statement.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(DocumentProduct {
                source: row.get(0)?,
                file_name: row.get(1)?,
                product_name: row.get(2)?,
            });
        }
        Ok(out)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            documents: count_rows(&self.connection, "SELECT COUNT(*) FROM documents")?,
            records: count_rows(&self.connection, "SELECT COUNT(*) FROM records")?,
            unknown_products: count_rows(
                &self.connection,
                "SELECT COUNT(*) FROM documents WHERE product_name = 'UNKNOWN'",
            )?,
        })
    }
}

impl SectionRetriever for RecordStore {
    fn retrieve(
        &self,
        query: &str,
        filter: &ProductFilter,
        limit: usize,
    ) -> Result<Vec<RetrievableRecord>> {
        self.lexical_search(query, filter, limit)
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          source TEXT PRIMARY KEY,
          file_name TEXT NOT NULL,
          product_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
          record_id TEXT PRIMARY KEY,
          ordinal INTEGER NOT NULL,
          source TEXT NOT NULL,
          file_name TEXT NOT NULL,
          product_name TEXT NOT NULL,
          format TEXT NOT NULL,
          section TEXT NOT NULL,
          section_id TEXT,
          section_title TEXT,
          parent_section TEXT,
          parent_section_id TEXT,
          page_content TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS records_section_idx ON records(section);
        ",
    )?;

    connection
        .execute(
            "
            CREATE VIRTUAL TABLE IF NOT EXISTS records_fts
            USING fts5(section, page_content, content='records', content_rowid='rowid')
            ",
            [],
        )
        .context("failed to initialize FTS5 table records_fts")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;

    Ok(())
}

fn collect_records(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<RetrievableRecord>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let format_raw: String = row.get(3)?;
        let format = parse_format(&format_raw)?;
        out.push(RetrievableRecord {
            page_content: row.get(9)?,
            metadata: RecordMetadata {
                source: row.get(0)?,
                file_name: row.get(1)?,
                product_name: row.get(2)?,
                section: row.get(4)?,
                section_id: row.get(5)?,
                section_title: row.get(6)?,
                parent_section: row.get(7)?,
                parent_section_id: row.get(8)?,
                format,
            },
        });
    }
    Ok(out)
}

fn parse_format(raw: &str) -> Result<DocumentFormat> {
    match raw {
        "text" => Ok(DocumentFormat::Text),
        "pdf" => Ok(DocumentFormat::Pdf),
        other => bail!("unknown stored document format: {other}"),
    }
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

/// Quotes each alphanumeric token and ORs them so natural-language
/// questions match any of their words.
fn to_fts_query(query_text: &str) -> String {
    query_text
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|character| character.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<String>>()
        .join(" OR ")
}
