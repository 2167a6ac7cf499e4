//! Record repository over the SQLite records table.
//!
//! Each method is a single statement (or a statement plus a read-back);
//! nothing here spans a transaction.

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row};

use vault_core::error::VaultError;
use vault_core::types::{
    validate_name, NewRecord, Record, RecordId, RecordUpdate, SortField, SortOrder,
};

use crate::db::{Database, FOLD_CASE_FN};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for vault records.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    db: Arc<Database>,
}

impl RecordRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn select_sql(&self) -> String {
        format!("SELECT id, name, created FROM {}", self.db.table())
    }

    /// All records in natural (id) order.
    pub fn list_all(&self) -> Result<Vec<Record>, VaultError> {
        let sql = format!("{} ORDER BY id ASC", self.select_sql());
        self.query_records(&sql, rusqlite::params![])
    }

    /// Find one record by id.
    pub fn find_by_id(&self, id: RecordId) -> Result<Option<Record>, VaultError> {
        let sql = format!("{} WHERE id = ?1", self.select_sql());
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(&sql, rusqlite::params![id], |row| Ok(row_to_record(row)))
                .optional()
                .map_err(|e| VaultError::Storage(e.to_string()))?;
            row.transpose()
        })
    }

    /// Records whose name contains `keyword` ignoring case, or whose id
    /// equals `keyword` when it parses as an integer.
    ///
    /// Case folding is full Unicode lowercasing; the keyword matches
    /// literally, with no wildcard characters.
    pub fn find_by_keyword(&self, keyword: &str) -> Result<Vec<Record>, VaultError> {
        let folded = keyword.to_lowercase();
        let id: Option<RecordId> = keyword.trim().parse().ok();
        let sql = format!(
            "{} WHERE instr({FOLD_CASE_FN}(name), ?1) > 0 OR id = ?2 ORDER BY id ASC",
            self.select_sql()
        );
        self.query_records(&sql, rusqlite::params![folded, id])
    }

    /// All records ordered by the requested field.
    ///
    /// Names compare case-folded first. Ties fall through to the raw value
    /// and then the id in the same direction, so the two directions are
    /// exact reverses.
    pub fn sorted(&self, order: SortOrder) -> Result<Vec<Record>, VaultError> {
        let column = order.field.column();
        let dir = order.direction.keyword();
        let key = match order.field {
            SortField::Name => format!("{FOLD_CASE_FN}({column})"),
            SortField::Created => column.to_string(),
        };
        let sql = format!(
            "{} ORDER BY {key} {dir}, {column} {dir}, id {dir}",
            self.select_sql()
        );
        self.query_records(&sql, rusqlite::params![])
    }

    /// Insert a record and return it as stored.
    ///
    /// A caller-supplied id that already exists is a `Conflict`.
    pub fn insert(&self, input: &NewRecord) -> Result<Record, VaultError> {
        let (name, created) = input.prepare()?;
        let sql = format!(
            "INSERT INTO {} (id, name, created) VALUES (?1, ?2, ?3)",
            self.db.table()
        );

        let id = self.db.with_conn(|conn| {
            conn.execute(
                &sql,
                rusqlite::params![input.id, name, created.format(DATE_FORMAT).to_string()],
            )
            .map_err(|e| map_write_error(e, input.id))?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Record { id, name, created })
    }

    /// Replace the name (and optionally the date) of an existing record.
    pub fn update(&self, id: RecordId, update: &RecordUpdate) -> Result<Record, VaultError> {
        let name = validate_name(&update.name)?;
        let created = update.created.map(|d| d.format(DATE_FORMAT).to_string());
        let sql = format!(
            "UPDATE {} SET name = ?1, created = COALESCE(?2, created) WHERE id = ?3",
            self.db.table()
        );

        let changed = self.db.with_conn(|conn| {
            conn.execute(&sql, rusqlite::params![name, created, id])
                .map_err(|e| VaultError::Storage(format!("Failed to update record: {}", e)))
        })?;

        if changed == 0 {
            return Err(VaultError::NotFound(id.to_string()));
        }

        self.find_by_id(id)?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Resolve a user token to a single record.
    ///
    /// A token that parses as an integer is looked up by id only. Anything
    /// else matches the first record (lowest id) whose name equals the token
    /// ignoring case (full Unicode folding).
    pub fn resolve(&self, token: &str) -> Result<Record, VaultError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(VaultError::Validation(
                "an id or name is required".to_string(),
            ));
        }

        if let Ok(id) = token.parse::<RecordId>() {
            return self
                .find_by_id(id)?
                .ok_or_else(|| VaultError::NotFound(token.to_string()));
        }

        let sql = format!(
            "{} WHERE {FOLD_CASE_FN}(name) = ?1 ORDER BY id ASC LIMIT 1",
            self.select_sql()
        );
        self.query_records(&sql, rusqlite::params![token.to_lowercase()])?
            .into_iter()
            .next()
            .ok_or_else(|| VaultError::NotFound(token.to_string()))
    }

    /// Delete a record by id.
    pub fn delete(&self, id: RecordId) -> Result<(), VaultError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.db.table());
        let changed = self.db.with_conn(|conn| {
            conn.execute(&sql, rusqlite::params![id])
                .map_err(|e| VaultError::Storage(format!("Failed to delete record: {}", e)))
        })?;

        if changed == 0 {
            return Err(VaultError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Count all records.
    pub fn count(&self) -> Result<u64, VaultError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.db.table());
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(&sql, [], |row| row.get(0))
                .map_err(|e| VaultError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Record>, VaultError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| VaultError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(params, |row| Ok(row_to_record(row)))
                .map_err(|e| VaultError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                let record = row.map_err(|e| VaultError::Storage(e.to_string()))??;
                records.push(record);
            }
            Ok(records)
        })
    }
}

fn row_to_record(row: &Row<'_>) -> Result<Record, VaultError> {
    let id: i64 = row.get(0).map_err(|e| VaultError::Storage(e.to_string()))?;
    let name: String = row.get(1).map_err(|e| VaultError::Storage(e.to_string()))?;
    let created_text: String = row.get(2).map_err(|e| VaultError::Storage(e.to_string()))?;

    let created = NaiveDate::parse_from_str(&created_text, DATE_FORMAT).map_err(|_| {
        VaultError::Storage(format!(
            "Invalid persisted date '{}' for record {}",
            created_text, id
        ))
    })?;

    Ok(Record { id, name, created })
}

fn map_write_error(err: rusqlite::Error, id: Option<RecordId>) -> VaultError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            match id {
                Some(id) => VaultError::Conflict(format!("record with id {} already exists", id)),
                None => VaultError::Validation(err.to_string()),
            }
        }
        _ => VaultError::Storage(format!("Failed to insert record: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_core::types::{today, SortDirection};

    fn repo() -> RecordRepository {
        RecordRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn insert(repo: &RecordRepository, name: &str) -> Record {
        repo.insert(&NewRecord::named(name)).unwrap()
    }

    #[test]
    fn test_insert_defaults_created_to_today() {
        let repo = repo();
        let record = insert(&repo, "alice");

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], record);
        assert_eq!(all[0].name, "alice");
        assert_eq!(all[0].created, today());
    }

    #[test]
    fn test_insert_assigns_ids() {
        let repo = repo();
        let a = insert(&repo, "a");
        let b = insert(&repo, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_insert_with_caller_id_and_date() {
        let repo = repo();
        let record = repo
            .insert(&NewRecord {
                id: Some(1001),
                name: "bob".to_string(),
                created: Some(date("2020-01-01")),
            })
            .unwrap();
        assert_eq!(record.id, 1001);
        assert_eq!(repo.find_by_id(1001).unwrap().unwrap().created, date("2020-01-01"));
    }

    #[test]
    fn test_insert_duplicate_id_is_conflict() {
        let repo = repo();
        let input = NewRecord {
            id: Some(5),
            name: "x".to_string(),
            created: None,
        };
        repo.insert(&input).unwrap();
        let err = repo.insert(&input).unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_blank_name_rejected() {
        let repo = repo();
        let err = repo.insert(&NewRecord::named("  ")).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_find_by_keyword_case_insensitive() {
        let repo = repo();
        let alice = insert(&repo, "alice");
        insert(&repo, "bob");

        let hits = repo.find_by_keyword("ALICE").unwrap();
        assert_eq!(hits, vec![alice.clone()]);

        let partial = repo.find_by_keyword("lic").unwrap();
        assert_eq!(partial, vec![alice]);
    }

    #[test]
    fn test_find_by_keyword_folds_non_ascii() {
        let repo = repo();
        let emile = insert(&repo, "émile");
        let angstrom = insert(&repo, "Ångström");
        insert(&repo, "emile");

        assert_eq!(repo.find_by_keyword("ÉMILE").unwrap(), vec![emile]);
        assert_eq!(repo.find_by_keyword("STRÖM").unwrap(), vec![angstrom]);
    }

    #[test]
    fn test_find_by_keyword_matches_id() {
        let repo = repo();
        insert(&repo, "alice");
        let target = repo
            .insert(&NewRecord {
                id: Some(777),
                name: "zed".to_string(),
                created: None,
            })
            .unwrap();

        let hits = repo.find_by_keyword("777").unwrap();
        assert_eq!(hits, vec![target]);
    }

    #[test]
    fn test_find_by_keyword_wildcards_are_literal() {
        let repo = repo();
        insert(&repo, "alice");
        let percent = insert(&repo, "100% done");

        assert!(repo.find_by_keyword("_").unwrap().is_empty());
        assert_eq!(repo.find_by_keyword("%").unwrap(), vec![percent]);
    }

    #[test]
    fn test_sorted_by_name_reverses() {
        let repo = repo();
        for name in ["carol", "Alice", "bob", "alice"] {
            insert(&repo, name);
        }

        let asc = repo
            .sorted(SortOrder {
                field: SortField::Name,
                direction: SortDirection::Ascending,
            })
            .unwrap();
        let mut desc = repo
            .sorted(SortOrder {
                field: SortField::Name,
                direction: SortDirection::Descending,
            })
            .unwrap();

        assert_eq!(asc.len(), 4);
        assert_eq!(asc.last().unwrap().name, "carol");
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_sorted_by_created() {
        let repo = repo();
        for (name, created) in [("a", "2021-01-01"), ("b", "2019-01-01"), ("c", "2020-01-01")] {
            repo.insert(&NewRecord {
                id: None,
                name: name.to_string(),
                created: Some(date(created)),
            })
            .unwrap();
        }

        let sorted = repo
            .sorted(SortOrder {
                field: SortField::Created,
                direction: SortDirection::Descending,
            })
            .unwrap();
        let names: Vec<&str> = sorted.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_update_record() {
        let repo = repo();
        let record = insert(&repo, "old");

        let updated = repo
            .update(
                record.id,
                &RecordUpdate {
                    name: "new".to_string(),
                    created: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "new");
        assert_eq!(updated.created, record.created);

        let redated = repo
            .update(
                record.id,
                &RecordUpdate {
                    name: "new".to_string(),
                    created: Some(date("2000-02-29")),
                },
            )
            .unwrap();
        assert_eq!(redated.created, date("2000-02-29"));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let repo = repo();
        let err = repo
            .update(
                99,
                &RecordUpdate {
                    name: "x".to_string(),
                    created: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn test_resolve_by_id_then_name() {
        let repo = repo();
        let first = insert(&repo, "Dana");
        insert(&repo, "dana");

        assert_eq!(repo.resolve(&first.id.to_string()).unwrap(), first);
        assert_eq!(repo.resolve("DANA").unwrap(), first);
    }

    #[test]
    fn test_resolve_folds_non_ascii_names() {
        let repo = repo();
        let angstrom = insert(&repo, "Ångström");

        assert_eq!(repo.resolve("ångström").unwrap(), angstrom);
        repo.delete(repo.resolve("ÅNGSTRÖM").unwrap().id).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_resolve_numeric_token_does_not_fall_back_to_name() {
        let repo = repo();
        insert(&repo, "42");
        // "42" is a valid id shape, and no record has id 42.
        let only = repo.list_all().unwrap();
        assert_ne!(only[0].id, 42);
        assert!(matches!(repo.resolve("42"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_resolve_blank_token() {
        let repo = repo();
        assert!(matches!(repo.resolve(" "), Err(VaultError::Validation(_))));
    }

    #[test]
    fn test_delete() {
        let repo = repo();
        let record = insert(&repo, "gone");
        insert(&repo, "stays");

        repo.delete(record.id).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.find_by_id(record.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let repo = repo();
        insert(&repo, "stays");
        assert!(matches!(repo.delete(12345), Err(VaultError::NotFound(_))));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_persisted_date_is_storage_error() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO records (id, name, created) VALUES (1, 'bad', 'yesterday')",
                [],
            )
            .map_err(|e| VaultError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        let repo = RecordRepository::new(db);
        assert!(matches!(repo.list_all(), Err(VaultError::Storage(_))));
    }
}
