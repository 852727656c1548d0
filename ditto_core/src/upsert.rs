//! Create-or-update of one row identified by its natural key.
//!
//! A row that already exists is only written when at least one mapped field
//! differs from what is stored, so the `touch` column (usually `fetch_time`)
//! keeps recording when the content last actually changed.

use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::tags::{sync_tags, TagLinks};

/// Equal, treating null as a comparable value.
///
/// https://www.sqlite.org/lang_expr.html#isisnot
const EQ: &str = "IS";

/// A column value. Each variant is bound and read back with its own sql type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(Option<String>),
    Integer(Option<i64>),
    Bool(bool),
    Time(Option<DateTime<Utc>>),
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Some(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(Some(v))
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for Value {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        Value::Time(v)
    }
}

impl Value {
    fn push_bind<'a>(&self, q: &mut QueryBuilder<'a, Sqlite>) {
        match self {
            Value::Text(v) => q.push_bind(v.clone()),
            Value::Integer(v) => q.push_bind(*v),
            Value::Bool(v) => q.push_bind(*v),
            Value::Time(v) => q.push_bind(*v),
        };
    }

    /// Read the stored column as the same kind of value as `self`.
    fn read_like(&self, row: &SqliteRow, column: &str) -> Result<Value, sqlx::Error> {
        Ok(match self {
            Value::Text(_) => Value::Text(row.try_get(column)?),
            Value::Integer(_) => Value::Integer(row.try_get(column)?),
            Value::Bool(_) => Value::Bool(row.try_get(column)?),
            Value::Time(_) => Value::Time(row.try_get(column)?),
        })
    }
}

/// One row to be upserted, described column by column.
///
/// Column and table names are compile-time constants; only values are bound.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    table: &'static str,
    key: Vec<(&'static str, Value)>,
    fields: Vec<(&'static str, Value)>,
    touch: Option<&'static str>,
}

impl Record {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            key: Vec::new(),
            fields: Vec::new(),
            touch: None,
        }
    }

    /// Naming a key column again replaces its earlier value.
    pub fn key(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        set(&mut self.key, column, value.into());
        self
    }

    /// Naming a field again replaces its earlier value.
    pub fn field(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        set(&mut self.fields, column, value.into());
        self
    }

    /// Only map the field when there is a value, leaving a stored one alone otherwise.
    pub fn field_if_some<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.field(column, v),
            None => self,
        }
    }

    /// Column set to the run time on insert and on every real change.
    pub fn touch(mut self, column: &'static str) -> Self {
        self.touch = Some(column);
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }
}

fn set(columns: &mut Vec<(&'static str, Value)>, column: &'static str, value: Value) {
    match columns.iter_mut().find(|(c, _)| *c == column) {
        Some(entry) => entry.1 = value,
        None => columns.push((column, value)),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upserted {
    Created(i64),
    Updated(i64),
    Unchanged(i64),
}

impl Upserted {
    pub fn id(&self) -> i64 {
        match *self {
            Upserted::Created(id) | Upserted::Updated(id) | Upserted::Unchanged(id) => id,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Upserted::Unchanged(_))
    }
}

pub async fn upsert(
    conn: &mut SqliteConnection,
    record: &Record,
    now: DateTime<Utc>,
) -> Result<Upserted, sqlx::Error> {
    let existing = find(conn, record).await?;
    let Some(row) = existing else {
        let id = insert(conn, record, now).await?;
        debug!("{}: created {}", record.table, id);
        return Ok(Upserted::Created(id));
    };

    let id: i64 = row.try_get("id")?;
    let mut changed = Vec::new();
    for (column, value) in &record.fields {
        if value.read_like(&row, column)? != *value {
            changed.push((*column, value));
        }
    }
    if changed.is_empty() {
        return Ok(Upserted::Unchanged(id));
    }

    debug!(
        "{}: updating {} ({})",
        record.table,
        id,
        changed.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ")
    );
    let mut q = QueryBuilder::new(format!("UPDATE {} SET ", record.table));
    for (i, (column, value)) in changed.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(column).push(" = ");
        value.push_bind(&mut q);
    }
    if let Some(touch) = record.touch {
        q.push(", ").push(touch).push(" = ").push_bind(now);
    }
    q.push(" WHERE id = ").push_bind(id);
    q.build().execute(&mut *conn).await?;
    Ok(Upserted::Updated(id))
}

/// Upsert, then reconcile the row's tags. A tag-only change counts as an update.
pub async fn upsert_tagged(
    conn: &mut SqliteConnection,
    record: &Record,
    links: &TagLinks,
    tags: &[String],
    now: DateTime<Utc>,
) -> Result<Upserted, sqlx::Error> {
    let upserted = upsert(conn, record, now).await?;
    let tags_changed = sync_tags(conn, links, upserted.id(), tags).await?;
    match upserted {
        Upserted::Unchanged(id) if tags_changed => {
            touch(conn, record, id, now).await?;
            Ok(Upserted::Updated(id))
        }
        other => Ok(other),
    }
}

async fn touch(
    conn: &mut SqliteConnection,
    record: &Record,
    id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    if let Some(touch) = record.touch {
        sqlx::query(&format!("UPDATE {} SET {touch} = ? WHERE id = ?", record.table))
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn find(
    conn: &mut SqliteConnection,
    record: &Record,
) -> Result<Option<SqliteRow>, sqlx::Error> {
    let mut q = QueryBuilder::new("SELECT id");
    for (column, _) in &record.fields {
        q.push(", ").push(column);
    }
    q.push(" FROM ").push(record.table).push(" WHERE ");
    for (i, (column, value)) in record.key.iter().enumerate() {
        if i > 0 {
            q.push(" AND ");
        }
        q.push(column).push(" ").push(EQ).push(" ");
        value.push_bind(&mut q);
    }
    q.push(" LIMIT 1");
    q.build().fetch_optional(&mut *conn).await
}

async fn insert(
    conn: &mut SqliteConnection,
    record: &Record,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let columns: Vec<(&str, &Value)> = record
        .key
        .iter()
        .chain(record.fields.iter())
        .map(|(c, v)| (*c, v))
        .collect();
    let mut q = QueryBuilder::new(format!("INSERT INTO {} (", record.table));
    for (i, (column, _)) in columns.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(column);
    }
    if let Some(touch) = record.touch {
        q.push(", ").push(touch);
    }
    q.push(") VALUES (");
    for (i, (_, value)) in columns.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        value.push_bind(&mut q);
    }
    if record.touch.is_some() {
        q.push(", ").push_bind(now);
    }
    q.push(")");
    Ok(q.build().execute(&mut *conn).await?.last_insert_rowid())
}
