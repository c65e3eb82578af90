//! PostgreSQL node store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::Postgres;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, QueryBuilder};
use tracing::{debug, warn};

use treehub_core::config::collections::validate_identifier;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_core::types::BulkWriteResult;
use treehub_entity::{DbRef, Node, NodeType, normalize_ext};

use super::field::projected_columns;
use super::{FoundPage, NodeField, NodeFilter, NodePatch, NodeStore, NodeUpdate};

/// Stay under the PostgreSQL limit of 65 535 bind parameters per statement.
const MAX_BINDS: usize = 65_000;

/// Node store over one PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgNodeStore {
    pool: PgPool,
    table: String,
}

impl PgNodeStore {
    /// Create a store over `table`, which must be a plain identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> AppResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { pool, table })
    }

    /// Run one bulk statement for updates that all set the same fields.
    async fn update_group(
        &self,
        fields: &[NodeField],
        updates: &[NodeUpdate],
    ) -> AppResult<BulkWriteResult> {
        let columns: Vec<&str> = fields.iter().map(NodeField::column).collect();

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("WITH v (id, {}) AS (", columns.join(", ")));
        qb.push_values(updates, |mut row, update| {
            row.push_bind(update.id.clone());
            for field in fields {
                push_patch_value(&mut row, *field, &update.patch);
            }
        });

        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = v.{c}")).collect();
        let changes: Vec<String> = columns
            .iter()
            .map(|c| format!("t.{c} IS DISTINCT FROM v.{c}"))
            .collect();
        qb.push(format!(
            "), hit AS (SELECT COUNT(*) AS n FROM {table} t JOIN v ON t.id = v.id), \
             upd AS (UPDATE {table} t SET {set} FROM v WHERE t.id = v.id AND ({changed}) RETURNING 1) \
             SELECT (SELECT n FROM hit), (SELECT COUNT(*) FROM upd)",
            table = self.table,
            set = assignments.join(", "),
            changed = changes.join(" OR "),
        ));

        let (matched, modified): (i64, i64) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, format!("Bulk update of {} failed", self.table)))?;

        Ok(BulkWriteResult {
            matched: matched as u64,
            modified: modified as u64,
        })
    }
}

#[async_trait]
impl NodeStore for PgNodeStore {
    fn collection(&self) -> &str {
        &self.table
    }

    async fn find_page(
        &self,
        filter: &NodeFilter,
        fields: &[NodeField],
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<FoundPage> {
        let columns: Vec<String> = projected_columns(fields)
            .iter()
            .map(|f| format!("\"{}\"", f.column()))
            .collect();

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            self.table
        ));
        push_filter(&mut qb, filter);
        if let Some(after) = after {
            qb.push(" AND id > ").push_bind(after.to_string());
        }
        qb.push(" ORDER BY id LIMIT ").push_bind(limit as i64);

        let rows: Vec<NodeRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error(e, format!("Failed to read {}", self.table)))?;

        let mut page = FoundPage {
            scanned: rows.len(),
            last_id: rows.last().map(|r| r.id.clone()),
            ..FoundPage::default()
        };
        for row in rows {
            match Node::try_from(row) {
                Ok(node) => page.nodes.push(node),
                Err(e) => {
                    warn!(collection = %self.table, error = %e, "Skipping malformed node");
                    page.malformed += 1;
                }
            }
        }
        Ok(page)
    }

    async fn bulk_update(&self, updates: Vec<NodeUpdate>) -> AppResult<BulkWriteResult> {
        let mut groups: BTreeMap<Vec<NodeField>, Vec<NodeUpdate>> = BTreeMap::new();
        for update in updates {
            let fields = update.patch.fields();
            if fields.is_empty() {
                return Err(AppError::write_failed(format!(
                    "Update for node {} sets no fields",
                    update.id
                )));
            }
            groups.entry(fields).or_default().push(update);
        }

        let mut result = BulkWriteResult::default();
        for (fields, group) in &groups {
            let rows_per_statement = (MAX_BINDS / (fields.len() + 1)).max(1);
            for chunk in group.chunks(rows_per_statement) {
                result += self.update_group(fields, chunk).await?;
            }
        }
        debug!(
            collection = %self.table,
            matched = result.matched,
            modified = result.modified,
            "Bulk update applied"
        );
        Ok(result)
    }

    async fn count(&self, filter: &NodeFilter) -> AppResult<u64> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        push_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error(e, format!("Failed to count {}", self.table)))?;
        Ok(count as u64)
    }

    async fn existing_ids(&self, ids: &[String]) -> AppResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, String>(&format!(
            "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id",
            self.table
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error(e, format!("Failed to look up ids in {}", self.table)))
    }

    async fn max_depth(&self) -> AppResult<Option<i32>> {
        sqlx::query_scalar::<_, Option<i32>>(&format!("SELECT MAX(depth) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error(e, format!("Failed to read max depth of {}", self.table)))
    }

    async fn insert_many(&self, nodes: Vec<Node>) -> AppResult<u64> {
        let columns: Vec<String> = NodeField::ALL
            .iter()
            .map(|f| format!("\"{}\"", f.column()))
            .collect();
        let rows_per_statement = MAX_BINDS / NodeField::ALL.len();

        let mut inserted = 0;
        for chunk in nodes.chunks(rows_per_statement) {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                self.table,
                columns.join(", ")
            ));
            qb.push_values(chunk, |mut row, node| {
                row.push_bind(node.id.clone())
                    .push_bind(node.parent_id.clone())
                    .push_bind(node.depth)
                    .push_bind(node.node_type.as_str())
                    .push_bind(node.name.clone())
                    .push_bind(node.path.clone())
                    .push_bind(node.ext.clone())
                    .push_bind(node.ancestor_ids.clone())
                    .push_bind(node.is_empty)
                    .push_bind(node.is_warning)
                    .push_bind(node.files_ext.clone())
                    .push_bind(node.updated)
                    .push_bind(node.created)
                    .push_bind(node.size)
                    .push_bind(node.db_ref.clone().map(Json))
                    .push_bind(node.subjects.clone())
                    .push_bind(node.checked);
            });
            qb.push(" ON CONFLICT (id) DO NOTHING");

            let done = qb
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| write_error(e, format!("Failed to insert into {}", self.table)))?;
            inserted += done.rows_affected();
        }
        Ok(inserted)
    }

    async fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> AppResult<u64> {
        let fields = patch.fields();
        if fields.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("UPDATE {} SET ", self.table));
        {
            let mut set = qb.separated(", ");
            for field in &fields {
                set.push(format!("{} = ", field.column()));
                push_patch_value_unseparated(&mut set, *field, patch);
            }
        }
        push_filter(&mut qb, filter);

        let done = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, format!("Failed to update {}", self.table)))?;
        Ok(done.rows_affected())
    }

    async fn delete_many(&self, filter: &NodeFilter) -> AppResult<u64> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("DELETE FROM {}", self.table));
        push_filter(&mut qb, filter);

        let done = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, format!("Failed to delete from {}", self.table)))?;
        Ok(done.rows_affected())
    }
}

/// Raw row as stored; unselected columns fall back to defaults.
#[derive(Debug, FromRow)]
struct NodeRow {
    id: String,
    #[sqlx(default)]
    parent_id: Option<String>,
    #[sqlx(default)]
    depth: i32,
    #[sqlx(rename = "type", default)]
    node_type: String,
    #[sqlx(default)]
    name: String,
    #[sqlx(default)]
    path: String,
    #[sqlx(default)]
    ext: Option<String>,
    #[sqlx(default)]
    ancestor_ids: Vec<String>,
    #[sqlx(default)]
    is_empty: bool,
    #[sqlx(default)]
    is_warning: bool,
    #[sqlx(default)]
    files_ext: Vec<String>,
    #[sqlx(default)]
    updated: Option<DateTime<Utc>>,
    #[sqlx(default)]
    created: Option<DateTime<Utc>>,
    #[sqlx(default)]
    size: Option<i64>,
    #[sqlx(default)]
    db_ref: Option<Json<DbRef>>,
    #[sqlx(default)]
    subjects: Vec<String>,
    #[sqlx(rename = "is_checked", default)]
    checked: bool,
}

impl TryFrom<NodeRow> for Node {
    type Error = AppError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let node_type = if row.node_type.is_empty() {
            NodeType::default()
        } else {
            row.node_type.parse()?
        };
        let node = Node {
            id: row.id,
            parent_id: row.parent_id,
            depth: row.depth,
            node_type,
            name: row.name,
            path: row.path,
            ext: row.ext.as_deref().and_then(normalize_ext),
            ancestor_ids: row.ancestor_ids,
            is_empty: row.is_empty,
            is_warning: row.is_warning,
            files_ext: row.files_ext,
            updated: row.updated,
            created: row.created,
            size: row.size,
            db_ref: row.db_ref.map(|j| j.0),
            subjects: row.subjects,
            checked: row.checked,
        };
        node.validate()?;
        Ok(node)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &NodeFilter) {
    qb.push(" WHERE TRUE");
    if let Some(depth) = filter.depth {
        qb.push(" AND depth = ").push_bind(depth);
    }
    if let Some(node_type) = filter.node_type {
        qb.push(" AND \"type\" = ").push_bind(node_type.as_str());
    }
    if let Some(ids) = &filter.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(parents) = &filter.parent_ids {
        qb.push(" AND parent_id = ANY(")
            .push_bind(parents.clone())
            .push(")");
    }
    if let Some(ancestor) = &filter.ancestor_id {
        qb.push(" AND ")
            .push_bind(ancestor.clone())
            .push(" = ANY(ancestor_ids)");
    }
    if let Some(is_empty) = filter.is_empty {
        qb.push(" AND is_empty = ").push_bind(is_empty);
    }
    if let Some(checked) = filter.checked {
        qb.push(" AND is_checked = ").push_bind(checked);
    }
}

/// SQL type a patched column is cast to.
fn cast_type(field: NodeField) -> &'static str {
    match field {
        NodeField::AncestorIds | NodeField::FilesExt | NodeField::Subjects => "TEXT[]",
        NodeField::IsEmpty | NodeField::IsWarning | NodeField::Checked => "BOOLEAN",
        NodeField::Updated => "TIMESTAMPTZ",
        NodeField::DbRef => "JSONB",
        _ => "TEXT",
    }
}

/// Push `CAST(value AS type)` as a new separated item.
fn push_patch_value(
    row: &mut Separated<'_, '_, Postgres, &'static str>,
    field: NodeField,
    patch: &NodePatch,
) {
    row.push("CAST(");
    bind_patch_value(row, field, patch);
    row.push_unseparated(format!(" AS {})", cast_type(field)));
}

/// Push `CAST(value AS type)` directly after the previous fragment.
fn push_patch_value_unseparated(
    set: &mut Separated<'_, '_, Postgres, &'static str>,
    field: NodeField,
    patch: &NodePatch,
) {
    set.push_unseparated("CAST(");
    bind_patch_value(set, field, patch);
    set.push_unseparated(format!(" AS {})", cast_type(field)));
}

fn bind_patch_value(
    sep: &mut Separated<'_, '_, Postgres, &'static str>,
    field: NodeField,
    patch: &NodePatch,
) {
    match field {
        NodeField::AncestorIds => sep.push_bind_unseparated(patch.ancestor_ids.clone()),
        NodeField::IsEmpty => sep.push_bind_unseparated(patch.is_empty),
        NodeField::IsWarning => sep.push_bind_unseparated(patch.is_warning),
        NodeField::FilesExt => sep.push_bind_unseparated(patch.files_ext.clone()),
        NodeField::Updated => sep.push_bind_unseparated(patch.updated),
        NodeField::DbRef => sep.push_bind_unseparated(patch.db_ref.clone().map(Json)),
        NodeField::Subjects => sep.push_bind_unseparated(patch.subjects.clone()),
        NodeField::Checked => sep.push_bind_unseparated(patch.checked),
        _ => sep.push_unseparated("NULL"),
    };
}

fn is_connectivity_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Map a failed read to `StoreUnavailable` or `Database`.
pub(crate) fn read_error(e: sqlx::Error, message: String) -> AppError {
    let kind = if is_connectivity_error(&e) {
        ErrorKind::StoreUnavailable
    } else {
        ErrorKind::Database
    };
    AppError::with_source(kind, message, e)
}

/// Map a failed write to `StoreUnavailable` or `WriteFailed`.
fn write_error(e: sqlx::Error, message: String) -> AppError {
    let kind = if is_connectivity_error(&e) {
        ErrorKind::StoreUnavailable
    } else {
        ErrorKind::WriteFailed
    };
    AppError::with_source(kind, message, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, depth: i32, parent: Option<&str>, node_type: &str) -> NodeRow {
        NodeRow {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            depth,
            node_type: node_type.to_string(),
            name: id.to_string(),
            path: id.to_string(),
            ext: Some(".TXT".to_string()),
            ancestor_ids: Vec::new(),
            is_empty: false,
            is_warning: false,
            files_ext: Vec::new(),
            updated: None,
            created: None,
            size: None,
            db_ref: None,
            subjects: Vec::new(),
            checked: false,
        }
    }

    #[test]
    fn test_row_conversion_normalizes_ext() {
        let node = Node::try_from(row("a", 1, Some("p"), "file")).expect("valid");
        assert_eq!(node.ext.as_deref(), Some("txt"));
        assert_eq!(node.node_type, NodeType::File);
    }

    #[test]
    fn test_row_conversion_rejects_malformed() {
        let err = Node::try_from(row("a", 2, None, "folder")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSourceRecord);

        let err = Node::try_from(row("a", 0, None, "symlink")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSourceRecord);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            read_error(sqlx::Error::PoolTimedOut, "x".into()).kind,
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            write_error(sqlx::Error::RowNotFound, "x".into()).kind,
            ErrorKind::WriteFailed
        );
        assert_eq!(
            read_error(sqlx::Error::RowNotFound, "x".into()).kind,
            ErrorKind::Database
        );
    }

    #[test]
    fn test_cast_types() {
        assert_eq!(cast_type(NodeField::FilesExt), "TEXT[]");
        assert_eq!(cast_type(NodeField::DbRef), "JSONB");
    }
}
