//! SQLite implementation of `TaggingStore` and `ProjectReviewStore`.
//!
//! # Responsibility
//! - Persist memos and taggings in the schema applied by `db::migrations`.
//! - Translate categories to stored `tag_style` codes through the codec.
//!
//! # Invariants
//! - Offsets are stored in characters, exactly as the engine uses them.
//! - Reads and deletes only touch the configured author's taggings.
//! - "log acquired" fires once per (memo, author), recorded in `memo_logs`.
//! - Unknown stored codes decode to the codec fallback with a warning.

use crate::codec::CategoryCodec;
use crate::db::require_tables;
use crate::model::document::{DocumentId, ProjectId};
use crate::model::span::SpanId;
use crate::repo::tagging_store::{
    CreatedSpan, LoadedDocument, Milestone, NewSpan, ProjectReviewStore, ProjectSummary,
    ProjectTagging, StoreError, StoreResult, StoredSpan, TaggingStore,
};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};

const TABLES: &[&str] = &[
    "projects",
    "memos",
    "taggings",
    "project_members",
    "memo_logs",
];

static MEMO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid memo date regex")
});

/// SQLite-backed tagging store bound to one author.
pub struct SqliteTaggingStore<'conn> {
    conn: &'conn Connection,
    codec: CategoryCodec,
    author: String,
}

impl<'conn> SqliteTaggingStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// # Errors
    /// - `StoreError::Db(DbError::MissingTable)` on an unmigrated connection.
    pub fn try_new(
        conn: &'conn Connection,
        codec: CategoryCodec,
        author: impl Into<String>,
    ) -> StoreResult<Self> {
        require_tables(conn, TABLES)?;
        Ok(Self {
            conn,
            codec,
            author: author.into(),
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn codec(&self) -> &CategoryCodec {
        &self.codec
    }

    /// Creates a project and returns its id.
    pub fn create_project(&self, name: &str, required_taggings: u32) -> StoreResult<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (name, required_taggings) VALUES (?1, ?2);",
            params![name, required_taggings],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Adds a member to a project; adding twice is a no-op.
    pub fn add_member(&self, project_id: ProjectId, user_name: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO project_members (project_id, user_name) VALUES (?1, ?2);",
            params![project_id, user_name],
        )?;
        Ok(())
    }

    /// Creates the daily memo of `date` under a project.
    ///
    /// # Errors
    /// - `StoreError::InvalidData` when `date` is not `YYYY-MM-DD`.
    pub fn create_memo(
        &self,
        project_id: ProjectId,
        date: &str,
        contents: &str,
    ) -> StoreResult<DocumentId> {
        if !MEMO_DATE.is_match(date) {
            return Err(StoreError::InvalidData(format!(
                "memo date `{date}` is not YYYY-MM-DD"
            )));
        }
        self.conn.execute(
            "INSERT INTO memos (project_id, date, contents) VALUES (?1, ?2, ?3);",
            params![project_id, date, contents],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn memo_exists(&self, id: DocumentId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM memos WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

#[async_trait(?Send)]
impl TaggingStore for SqliteTaggingStore<'_> {
    async fn load_document(&self, id: DocumentId) -> StoreResult<LoadedDocument> {
        let memo = self
            .conn
            .query_row(
                "SELECT id, project_id, date, contents FROM memos WHERE id = ?1;",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>("id")?,
                        row.get::<_, i64>("project_id")?,
                        row.get::<_, String>("date")?,
                        row.get::<_, String>("contents")?,
                    ))
                },
            )
            .optional()?;
        let Some((id, project_id, date, text)) = memo else {
            return Err(StoreError::NotFound(id));
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, tag_contents, offset_start, offset_end, tag_style
             FROM taggings
             WHERE memo_id = ?1
               AND user_name = ?2
             ORDER BY offset_start ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![id, self.author.as_str()])?;
        let mut spans = Vec::new();
        while let Some(row) = rows.next()? {
            spans.push(StoredSpan {
                id: row.get("id")?,
                category: self.codec.from_code(row.get("tag_style")?),
                start: offset_from_db(row.get("offset_start")?)?,
                end: offset_from_db(row.get("offset_end")?)?,
                text: row.get("tag_contents")?,
            });
        }

        debug!(
            "event=document_load module=store status=ok memo_id={id} spans={}",
            spans.len()
        );
        Ok(LoadedDocument {
            id,
            project_id,
            date,
            text,
            spans,
        })
    }

    async fn update_document_text(&self, id: DocumentId, text: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE memos
             SET contents = ?2,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, text],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn create_span(
        &self,
        document_id: DocumentId,
        span: &NewSpan,
    ) -> StoreResult<CreatedSpan> {
        if !self.memo_exists(document_id)? {
            return Err(StoreError::NotFound(document_id));
        }
        self.conn.execute(
            "INSERT INTO taggings (
                memo_id,
                user_name,
                tag_contents,
                offset_start,
                offset_end,
                tag_style
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                document_id,
                self.author.as_str(),
                span.text.as_str(),
                offset_to_db(span.start)?,
                offset_to_db(span.end)?,
                self.codec.to_code(span.category),
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        // One log per (memo, author), kept even after its taggings are deleted.
        let acquired = self.conn.execute(
            "INSERT OR IGNORE INTO memo_logs (memo_id, user_name) VALUES (?1, ?2);",
            params![document_id, self.author.as_str()],
        )?;
        let milestone = (acquired == 1).then(|| {
            info!("event=log_acquired module=store status=ok memo_id={document_id}");
            Milestone {
                success: true,
                message: "log acquired".to_string(),
            }
        });
        Ok(CreatedSpan { id, milestone })
    }

    async fn delete_span(&self, id: SpanId) -> StoreResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM taggings WHERE id = ?1 AND user_name = ?2;",
            params![id, self.author.as_str()],
        )?;
        if removed == 0 {
            debug!("event=span_delete module=store status=ok tagging_id={id} removed=0");
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ProjectReviewStore for SqliteTaggingStore<'_> {
    async fn load_project(&self, id: ProjectId) -> StoreResult<ProjectSummary> {
        let project = self
            .conn
            .query_row(
                "SELECT name, required_taggings FROM projects WHERE id = ?1;",
                [id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
            )
            .optional()?;
        let Some((name, required_taggings)) = project else {
            return Err(StoreError::InvalidData(format!("project not found: {id}")));
        };

        let mut stmt = self.conn.prepare(
            "SELECT user_name FROM project_members
             WHERE project_id = ?1
             ORDER BY user_name ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(row.get(0)?);
        }

        Ok(ProjectSummary {
            id,
            name,
            required_taggings,
            members,
        })
    }

    async fn list_project_taggings(&self, id: ProjectId) -> StoreResult<Vec<ProjectTagging>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.id,
                t.memo_id,
                m.date,
                t.user_name,
                t.tag_style,
                t.offset_start,
                t.offset_end,
                t.tag_contents
             FROM taggings t
             INNER JOIN memos m ON m.id = t.memo_id
             WHERE m.project_id = ?1
             ORDER BY m.date ASC, t.offset_start ASC, t.id ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut taggings = Vec::new();
        while let Some(row) = rows.next()? {
            taggings.push(ProjectTagging {
                id: row.get(0)?,
                memo_id: row.get(1)?,
                memo_date: row.get(2)?,
                user_name: row.get(3)?,
                category: self.codec.from_code(row.get(4)?),
                start: offset_from_db(row.get(5)?)?,
                end: offset_from_db(row.get(6)?)?,
                text: row.get(7)?,
            });
        }
        Ok(taggings)
    }
}

fn offset_to_db(offset: usize) -> StoreResult<i64> {
    i64::try_from(offset)
        .map_err(|_| StoreError::InvalidData(format!("offset {offset} does not fit in i64")))
}

fn offset_from_db(value: i64) -> StoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative offset {value} in taggings")))
}
