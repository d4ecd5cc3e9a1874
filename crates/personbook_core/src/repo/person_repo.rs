//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the document-store style operations over the `persons`
//!   collection: insert, find, find-one, rewrite, single-field update, delete.
//! - Keep SQL details (food child rows, ordering, projection) inside the
//!   persistence boundary.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Unsorted reads return documents in insertion order.
//! - Sorting is applied before limiting.

use crate::db::migrations::latest_version;
use crate::db::{schema_version, DbError};
use crate::model::person::{NewPerson, Person, PersonId, PersonSummary, PersonValidationError};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PERSONS_TABLE: &str = "persons";
const FOODS_TABLE: &str = "person_favorite_foods";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Write rejected before reaching the store.
    Validation(PersonValidationError),
    /// Store transport, constraint or bootstrap failure.
    Db(DbError),
    /// Target person does not exist.
    NotFound(PersonId),
    /// Caller-supplied id is not a well-formed person id.
    InvalidId(String),
    /// Persisted data cannot be converted to a valid `Person`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::InvalidId(value) => write!(f, "malformed person id `{value}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "person repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "person repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "person repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidId(_) => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Field-match conditions. Every set condition must hold; an empty filter
/// matches every person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    /// Exact name match.
    pub name: Option<String>,
    /// Exact membership in `favorite_foods`.
    pub favorite_food: Option<String>,
}

impl PersonFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_favorite_food(food: impl Into<String>) -> Self {
        Self {
            favorite_food: Some(food.into()),
            ..Self::default()
        }
    }
}

/// Sort direction for name ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Filter plus chained result modifiers.
///
/// Modifiers always execute as filter, then sort, then limit, regardless of
/// the order the builder methods were called in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonQuery {
    pub filter: PersonFilter,
    /// Name ordering. `None` keeps insertion order.
    pub sort: Option<SortOrder>,
    /// Maximum rows returned. `Some(0)` means no limit, as in a document store.
    pub limit: Option<u32>,
}

impl PersonQuery {
    pub fn new(filter: PersonFilter) -> Self {
        Self {
            filter,
            sort: None,
            limit: None,
        }
    }

    pub fn sort_by_name(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of a delete-by-filter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

/// Repository interface for person documents.
pub trait PersonRepository {
    /// Inserts one draft and returns the stored document.
    fn insert_person(&self, draft: &NewPerson) -> RepoResult<Person>;
    /// Inserts all drafts or none of them.
    fn insert_people(&self, drafts: &[NewPerson]) -> RepoResult<Vec<Person>>;
    /// Returns all matches after sort and limit are applied.
    fn find_people(&self, query: &PersonQuery) -> RepoResult<Vec<Person>>;
    /// Returns the first match in insertion order.
    fn find_one_person(&self, filter: &PersonFilter) -> RepoResult<Option<Person>>;
    /// Gets one person by id.
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Replaces the stored document with `person` (full rewrite).
    fn save_person(&self, person: &Person) -> RepoResult<()>;
    /// Atomically sets `age` on the first match and returns the updated value.
    fn find_one_and_set_age(&self, filter: &PersonFilter, age: i64)
        -> RepoResult<Option<Person>>;
    /// Deletes by id and returns the pre-deletion snapshot.
    fn delete_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Deletes every match.
    fn delete_people(&self, filter: &PersonFilter) -> RepoResult<DeleteSummary>;
    /// Same as `find_people`, with `age` projected out.
    fn find_summaries(&self, query: &PersonQuery) -> RepoResult<Vec<PersonSummary>>;
    /// Counts matches.
    fn count_people(&self, filter: &PersonFilter) -> RepoResult<u64>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_person_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert_person(&self, draft: &NewPerson) -> RepoResult<Person> {
        draft.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let person = insert_person_in_tx(&tx, draft)?;
        tx.commit()?;
        Ok(person)
    }

    fn insert_people(&self, drafts: &[NewPerson]) -> RepoResult<Vec<Person>> {
        for draft in drafts {
            draft.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut people = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.iter().enumerate() {
            match insert_person_in_tx(&tx, draft) {
                Ok(person) => people.push(person),
                Err(err) => {
                    debug!(
                        "event=person_batch_insert module=repo status=rollback size={} failed_index={}",
                        drafts.len(),
                        index
                    );
                    return Err(err);
                }
            }
        }
        tx.commit()?;

        debug!(
            "event=person_batch_insert module=repo status=ok size={}",
            people.len()
        );
        Ok(people)
    }

    fn find_people(&self, query: &PersonQuery) -> RepoResult<Vec<Person>> {
        let (sql, bind_values) = build_select("id, name, age", query);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(self.conn, row)?);
        }
        Ok(people)
    }

    fn find_one_person(&self, filter: &PersonFilter) -> RepoResult<Option<Person>> {
        let query = PersonQuery::new(filter.clone()).limit(1);
        Ok(self.find_people(&query)?.into_iter().next())
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        load_person(self.conn, id)
    }

    fn save_person(&self, person: &Person) -> RepoResult<()> {
        person.validate()?;

        let id_text = person.id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE persons
             SET
                name = ?2,
                age = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id_text.as_str(), person.name.as_str(), person.age],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(person.id));
        }

        replace_favorite_foods(&tx, id_text.as_str(), &person.favorite_foods)?;
        tx.commit()?;
        Ok(())
    }

    fn find_one_and_set_age(
        &self,
        filter: &PersonFilter,
        age: i64,
    ) -> RepoResult<Option<Person>> {
        let mut sql = String::from(
            "UPDATE persons
             SET
                age = ?,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = (
                SELECT id FROM persons WHERE 1 = 1",
        );
        let mut bind_values = vec![Value::Integer(age)];
        push_filter(&mut sql, &mut bind_values, filter);
        sql.push_str(" ORDER BY rowid ASC LIMIT 1) RETURNING id;");

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let updated_id: Option<String> = tx
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))
            .optional()?;
        let Some(id_text) = updated_id else {
            return Ok(None);
        };

        let person = load_person(&tx, parse_uuid(&id_text)?)?;
        tx.commit()?;
        Ok(person)
    }

    fn delete_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(snapshot) = load_person(&tx, id)? else {
            return Ok(None);
        };

        tx.execute("DELETE FROM persons WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;
        Ok(Some(snapshot))
    }

    fn delete_people(&self, filter: &PersonFilter) -> RepoResult<DeleteSummary> {
        let mut sql = String::from("DELETE FROM persons WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);

        let deleted = self.conn.execute(&sql, params_from_iter(bind_values))?;
        debug!("event=person_delete_many module=repo status=ok deleted_count={deleted}");
        Ok(DeleteSummary {
            deleted_count: deleted as u64,
        })
    }

    fn find_summaries(&self, query: &PersonQuery) -> RepoResult<Vec<PersonSummary>> {
        let (sql, bind_values) = build_select("id, name", query);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let favorite_foods = load_favorite_foods(self.conn, &id_text)?;
            summaries.push(PersonSummary {
                id: parse_uuid(&id_text)?,
                name: parse_name(row.get("name")?)?,
                favorite_foods,
            });
        }
        Ok(summaries)
    }

    fn count_people(&self, filter: &PersonFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM persons WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn insert_person_in_tx(tx: &Transaction<'_>, draft: &NewPerson) -> RepoResult<Person> {
    let id = Uuid::new_v4();
    let id_text = id.to_string();
    tx.execute(
        "INSERT INTO persons (id, name, age) VALUES (?1, ?2, ?3);",
        params![id_text.as_str(), draft.name.as_str(), draft.age],
    )?;
    insert_favorite_foods(tx, id_text.as_str(), &draft.favorite_foods)?;
    Ok(draft.clone().into_person(id))
}

fn insert_favorite_foods(conn: &Connection, person_id: &str, foods: &[String]) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO person_favorite_foods (person_id, position, food) VALUES (?1, ?2, ?3);",
    )?;
    for (position, food) in foods.iter().enumerate() {
        stmt.execute(params![person_id, position as i64, food.as_str()])?;
    }
    Ok(())
}

fn replace_favorite_foods(conn: &Connection, person_id: &str, foods: &[String]) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM person_favorite_foods WHERE person_id = ?1;",
        [person_id],
    )?;
    insert_favorite_foods(conn, person_id, foods)
}

fn load_favorite_foods(conn: &Connection, person_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT food
         FROM person_favorite_foods
         WHERE person_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([person_id])?;
    let mut foods = Vec::new();
    while let Some(row) = rows.next()? {
        foods.push(row.get(0)?);
    }
    Ok(foods)
}

fn load_person(conn: &Connection, id: PersonId) -> RepoResult<Option<Person>> {
    let mut stmt = conn.prepare("SELECT id, name, age FROM persons WHERE id = ?1;")?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(conn, row)?));
    }
    Ok(None)
}

fn build_select(columns: &str, query: &PersonQuery) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {columns} FROM persons WHERE 1 = 1");
    let mut bind_values = Vec::new();
    push_filter(&mut sql, &mut bind_values, &query.filter);

    match query.sort {
        Some(SortOrder::Ascending) => sql.push_str(" ORDER BY name ASC, rowid ASC"),
        Some(SortOrder::Descending) => sql.push_str(" ORDER BY name DESC, rowid ASC"),
        None => sql.push_str(" ORDER BY rowid ASC"),
    }

    if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    (sql, bind_values)
}

fn push_filter(sql: &mut String, bind_values: &mut Vec<Value>, filter: &PersonFilter) {
    if let Some(name) = filter.name.as_ref() {
        sql.push_str(" AND name = ?");
        bind_values.push(Value::Text(name.clone()));
    }

    if let Some(food) = filter.favorite_food.as_ref() {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM person_favorite_foods pf
                WHERE pf.person_id = persons.id
                  AND pf.food = ?
            )",
        );
        bind_values.push(Value::Text(food.clone()));
    }
}

fn parse_person_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Person> {
    let id_text: String = row.get("id")?;
    let favorite_foods = load_favorite_foods(conn, &id_text)?;
    Ok(Person {
        id: parse_uuid(&id_text)?,
        name: parse_name(row.get("name")?)?,
        age: row.get("age")?,
        favorite_foods,
    })
}

fn parse_uuid(value: &str) -> RepoResult<PersonId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in persons.id")))
}

fn parse_name(value: String) -> RepoResult<String> {
    if value.trim().is_empty() {
        return Err(RepoError::InvalidData(
            "empty name in persons.name".to_string(),
        ));
    }
    Ok(value)
}

fn ensure_person_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in [PERSONS_TABLE, FOODS_TABLE] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in ["id", "name", "age"] {
        if !table_has_column(conn, PERSONS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PERSONS_TABLE,
                column,
            });
        }
    }

    for column in ["person_id", "position", "food"] {
        if !table_has_column(conn, FOODS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: FOODS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
