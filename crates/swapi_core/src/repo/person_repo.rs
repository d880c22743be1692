//! Person repository contracts and statement-level implementation.
//!
//! # Responsibility
//! - Provide CRUD over `people`, assembling each person with its vehicles and
//!   starships.
//! - Allocate identifiers for new people and gate mutations on existence.
//!
//! # Invariants
//! - A new identifier is the highest existing identifier plus one, or `1` on
//!   an empty store. Read-max, compute and insert run inside one
//!   `BEGIN IMMEDIATE` transaction so concurrent writers cannot allocate the
//!   same identifier. The transaction is rolled back on every exit that does
//!   not reach `COMMIT`, unwinding included.
//! - `update`/`delete` never touch storage for an absent identifier and
//!   report `NotFound` instead.
//! - `created` and `id` are immutable after insertion; `edited` is refreshed by
//!   every update.
//! - Deleting a person leaves its junction rows in place.

use crate::db::{exec_batch_statement, Database, DbResult, ScannedRow};
use crate::model::person::{Person, PersonDraft, PersonId};
use crate::repo::starship_repo::StarshipRepository;
use crate::repo::vehicle_repo::VehicleRepository;
use crate::repo::{collect_rows, RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use rusqlite::types::Value;
use std::sync::atomic::{AtomicI64, Ordering};

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    name,
    height,
    mass,
    hair_color,
    skin_color,
    eye_color,
    birth_year,
    gender,
    homeworld,
    created,
    edited,
    url
FROM people";

const PERSON_INSERT_SQL: &str = "INSERT INTO people (
    id,
    name,
    height,
    mass,
    hair_color,
    skin_color,
    eye_color,
    birth_year,
    gender,
    homeworld,
    created,
    edited,
    url
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);";

const PERSON_UPDATE_SQL: &str = "UPDATE people
SET
    name = ?1,
    height = ?2,
    mass = ?3,
    hair_color = ?4,
    skin_color = ?5,
    eye_color = ?6,
    birth_year = ?7,
    gender = ?8,
    homeworld = ?9,
    edited = ?10,
    url = ?11
WHERE id = ?12;";

const PERSON_DELETE_SQL: &str = "DELETE FROM people WHERE id = ?1;";

const PERSON_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM people WHERE id = ?1);";

/// Last timestamp handed out by [`timestamp_now`], in microseconds.
static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// `BEGIN IMMEDIATE` scope issued through the capability set.
///
/// Dropping the guard without [`ImmediateTransaction::commit`] issues
/// `ROLLBACK`, so the connection never stays inside a transaction.
struct ImmediateTransaction<'db> {
    db: &'db dyn Database,
    open: bool,
}

impl<'db> ImmediateTransaction<'db> {
    fn begin(db: &'db dyn Database) -> DbResult<Self> {
        exec_batch_statement(db, "BEGIN IMMEDIATE;")?;
        Ok(Self { db, open: true })
    }

    fn commit(mut self) -> DbResult<()> {
        exec_batch_statement(self.db, "COMMIT;")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for ImmediateTransaction<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(err) = exec_batch_statement(self.db, "ROLLBACK;") {
            warn!("event=transaction_rollback module=repo status=error error={err}");
        }
    }
}

/// Repository interface for person CRUD operations.
pub trait PersonRepository {
    /// Returns every person ordered by ascending creation timestamp.
    fn fetch_all(&self) -> RepoResult<Vec<Person>>;
    /// Returns one person or `RepoError::NotFound`.
    fn fetch_by_id(&self, id: PersonId) -> RepoResult<Person>;
    /// Inserts a person and returns its allocated identifier.
    fn create(&self, draft: &PersonDraft) -> RepoResult<PersonId>;
    /// Replaces every scalar field of an existing person.
    fn update(&self, id: PersonId, draft: &PersonDraft) -> RepoResult<()>;
    /// Removes an existing person.
    fn delete(&self, id: PersonId) -> RepoResult<()>;
}

/// Person repository over any [`Database`] implementation.
pub struct SqlPersonRepository<'db> {
    db: &'db dyn Database,
}

impl<'db> SqlPersonRepository<'db> {
    pub fn new(db: &'db dyn Database) -> Self {
        Self { db }
    }

    fn attach_collections(&self, person: &mut Person) -> RepoResult<()> {
        person.vehicles = VehicleRepository::new(self.db).all_by_person_id(person.id)?;
        person.starships = StarshipRepository::new(self.db).all_by_person_id(person.id)?;
        Ok(())
    }

    fn last_person(&self) -> RepoResult<Option<Person>> {
        let sql = format!("{PERSON_SELECT_SQL} ORDER BY id DESC LIMIT 1;");
        let mut stmt = self.db.prepare(&sql, &[])?;
        if !stmt.step()? {
            return Ok(None);
        }
        Ok(Some(parse_person_row(&stmt.scan()?)?))
    }

    fn exists(&self, id: PersonId) -> RepoResult<bool> {
        let mut stmt = self.db.prepare(PERSON_EXISTS_SQL, &[Value::Integer(id)])?;
        if !stmt.step()? {
            return Ok(false);
        }
        let exists: i64 = stmt.scan()?.get(0)?;
        Ok(exists == 1)
    }

    fn ensure_exists(&self, id: PersonId) -> RepoResult<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(RepoError::NotFound(id))
        }
    }

    fn insert_next(&self, draft: &PersonDraft) -> RepoResult<PersonId> {
        let id = match self.last_person()? {
            Some(last) => last
                .id
                .checked_add(1)
                .ok_or(RepoError::IdentifiersExhausted(last.id))?,
            None => 1,
        };
        let now = timestamp_now();

        let mut stmt = self.db.prepare(PERSON_INSERT_SQL, &[])?;
        stmt.exec(&[
            Value::Integer(id),
            Value::Text(draft.name.clone()),
            Value::Integer(draft.height),
            Value::Integer(draft.mass),
            Value::Text(draft.hair.clone()),
            Value::Text(draft.skin.clone()),
            Value::Text(draft.eye.clone()),
            Value::Text(draft.birth_year.clone()),
            Value::Text(draft.gender.clone()),
            Value::Integer(draft.homeworld),
            Value::Text(now.clone()),
            Value::Text(now),
            Value::Text(draft.url.clone()),
        ])
        .map_err(RepoError::Rejected)?;

        Ok(id)
    }
}

impl PersonRepository for SqlPersonRepository<'_> {
    fn fetch_all(&self) -> RepoResult<Vec<Person>> {
        let sql = format!("{PERSON_SELECT_SQL} ORDER BY created ASC, id ASC;");
        let mut people = collect_rows(self.db, &sql, &[], parse_person_row)?;
        for person in &mut people {
            self.attach_collections(person)?;
        }
        Ok(people)
    }

    fn fetch_by_id(&self, id: PersonId) -> RepoResult<Person> {
        let sql = format!("{PERSON_SELECT_SQL} WHERE id = ?1;");
        let mut person = {
            let mut stmt = self.db.prepare(&sql, &[Value::Integer(id)])?;
            if !stmt.step()? {
                return Err(RepoError::NotFound(id));
            }
            parse_person_row(&stmt.scan()?)?
        };
        self.attach_collections(&mut person)?;
        Ok(person)
    }

    fn create(&self, draft: &PersonDraft) -> RepoResult<PersonId> {
        let tx = ImmediateTransaction::begin(self.db)?;

        let id = self.insert_next(draft).map_err(|err| {
            warn!("event=person_create module=repo status=error error={err}");
            err
        })?;

        tx.commit().map_err(|err| {
            warn!("event=person_create module=repo status=error error_code=commit_failed error={err}");
            RepoError::Db(err)
        })?;

        info!("event=person_create module=repo status=ok id={id}");
        Ok(id)
    }

    fn update(&self, id: PersonId, draft: &PersonDraft) -> RepoResult<()> {
        self.ensure_exists(id)?;

        let mut stmt = self.db.prepare(PERSON_UPDATE_SQL, &[])?;
        let changed = stmt
            .exec(&[
                Value::Text(draft.name.clone()),
                Value::Integer(draft.height),
                Value::Integer(draft.mass),
                Value::Text(draft.hair.clone()),
                Value::Text(draft.skin.clone()),
                Value::Text(draft.eye.clone()),
                Value::Text(draft.birth_year.clone()),
                Value::Text(draft.gender.clone()),
                Value::Integer(draft.homeworld),
                Value::Text(timestamp_now()),
                Value::Text(draft.url.clone()),
                Value::Integer(id),
            ])
            .map_err(|err| {
                warn!("event=person_update module=repo status=error id={id} error={err}");
                RepoError::Rejected(err)
            })?;

        // Removed by another writer after the existence probe.
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=person_update module=repo status=ok id={id}");
        Ok(())
    }

    fn delete(&self, id: PersonId) -> RepoResult<()> {
        self.ensure_exists(id)?;

        let mut stmt = self.db.prepare(PERSON_DELETE_SQL, &[])?;
        let changed = stmt.exec(&[Value::Integer(id)]).map_err(|err| {
            warn!("event=person_delete module=repo status=error id={id} error={err}");
            RepoError::Rejected(err)
        })?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=person_delete module=repo status=ok id={id}");
        Ok(())
    }
}

/// Decodes the 13 scalar columns of `PERSON_SELECT_SQL`, in order.
///
/// Associated collections are left empty; callers attach them afterwards.
fn parse_person_row(row: &ScannedRow) -> DbResult<Person> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
        height: row.get(2)?,
        mass: row.get(3)?,
        hair: row.get(4)?,
        skin: row.get(5)?,
        eye: row.get(6)?,
        birth_year: row.get(7)?,
        gender: row.get(8)?,
        homeworld: row.get(9)?,
        created: row.get(10)?,
        edited: row.get(11)?,
        url: row.get(12)?,
        ..Person::default()
    })
}

/// Current UTC time in RFC 3339 form with microseconds, e.g.
/// `2024-05-04T12:00:00.000001Z`.
///
/// Strictly increasing within the process, so an update always stamps a later
/// `edited` than the write before it.
fn timestamp_now() -> String {
    let now = Utc::now().timestamp_micros();
    let previous = LAST_STAMP_MICROS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    let stamped = now.max(previous.saturating_add(1));
    DateTime::<Utc>::from_timestamp_micros(stamped)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::{timestamp_now, ImmediateTransaction, PersonRepository, SqlPersonRepository};
    use crate::db::{Database, DbError, DbResult, ScannedRow, Statement};
    use crate::model::person::PersonDraft;
    use crate::repo::RepoError;
    use rusqlite::types::Value;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Canned behavior for statements whose SQL contains `pattern`.
    #[derive(Clone, Default)]
    struct Script {
        pattern: &'static str,
        rows: Vec<Vec<Value>>,
        fail_step: bool,
        fail_exec: bool,
        changed: Option<usize>,
    }

    #[derive(Default)]
    struct ScriptedDatabase {
        scripts: Vec<Script>,
        opened: Cell<usize>,
        released: Cell<usize>,
        executed: RefCell<Vec<String>>,
    }

    impl ScriptedDatabase {
        fn with(scripts: Vec<Script>) -> Self {
            Self {
                scripts,
                ..Self::default()
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.borrow().clone()
        }

        fn executed_any(&self, needle: &str) -> bool {
            self.executed().iter().any(|sql| sql.contains(needle))
        }

        fn assert_all_released(&self) {
            assert!(self.opened.get() > 0);
            assert_eq!(self.opened.get(), self.released.get());
        }
    }

    impl Database for ScriptedDatabase {
        fn prepare<'a>(
            &'a self,
            sql: &str,
            _args: &[Value],
        ) -> DbResult<Box<dyn Statement + 'a>> {
            let script = self
                .scripts
                .iter()
                .find(|script| sql.contains(script.pattern))
                .cloned()
                .unwrap_or_default();
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(ScriptedStatement {
                sql: sql.to_string(),
                rows: script.rows.clone().into(),
                current: None,
                script,
                owner: self,
            }))
        }
    }

    struct ScriptedStatement<'a> {
        sql: String,
        rows: VecDeque<Vec<Value>>,
        current: Option<Vec<Value>>,
        script: Script,
        owner: &'a ScriptedDatabase,
    }

    impl Statement for ScriptedStatement<'_> {
        fn step(&mut self) -> DbResult<bool> {
            if self.script.fail_step {
                return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.current = self.rows.pop_front();
            Ok(self.current.is_some())
        }

        fn scan(&self) -> DbResult<ScannedRow> {
            self.current
                .clone()
                .map(ScannedRow::new)
                .ok_or(DbError::NoCurrentRow)
        }

        fn exec(&mut self, _args: &[Value]) -> DbResult<usize> {
            self.owner.executed.borrow_mut().push(self.sql.clone());
            if self.script.fail_exec {
                return Err(DbError::Sqlite(rusqlite::Error::ExecuteReturnedResults));
            }
            Ok(self.script.changed.unwrap_or(1))
        }
    }

    impl Drop for ScriptedStatement<'_> {
        fn drop(&mut self) {
            self.owner.released.set(self.owner.released.get() + 1);
        }
    }

    fn person_row(id: i64, name: &str) -> Vec<Value> {
        vec![
            Value::Integer(id),
            Value::Text(name.to_string()),
            Value::Integer(183),
            Value::Integer(78),
            Value::Text("black".to_string()),
            Value::Text("fair".to_string()),
            Value::Text("brown".to_string()),
            Value::Text("31.5BBY".to_string()),
            Value::Text("male".to_string()),
            Value::Integer(10),
            Value::Text("2014-12-10T16:59:45Z".to_string()),
            Value::Text("2014-12-20T21:17:50Z".to_string()),
            Value::Text(format!("https://swapi.co/api/people/{id}/")),
        ]
    }

    fn exists_script(found: bool) -> Script {
        Script {
            pattern: "EXISTS",
            rows: vec![vec![Value::Integer(i64::from(found))]],
            ..Script::default()
        }
    }

    #[test]
    fn create_on_empty_store_allocates_one_inside_transaction() {
        let db = ScriptedDatabase::default();
        let repo = SqlPersonRepository::new(&db);

        let id = repo.create(&PersonDraft::named("Boba Fett")).unwrap();

        assert_eq!(id, 1);
        let executed = db.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].starts_with("BEGIN IMMEDIATE"));
        assert!(executed[1].starts_with("INSERT INTO people"));
        assert!(executed[2].starts_with("COMMIT"));
        db.assert_all_released();
    }

    #[test]
    fn create_allocates_after_highest_identifier() {
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "ORDER BY id DESC LIMIT 1",
            rows: vec![person_row(41, "Jango Fett")],
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        assert_eq!(repo.create(&PersonDraft::named("Boba Fett")).unwrap(), 42);
        db.assert_all_released();
    }

    #[test]
    fn create_rejected_insert_rolls_back() {
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "INSERT INTO people",
            fail_exec: true,
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        let err = repo.create(&PersonDraft::named("Boba Fett")).unwrap_err();

        assert!(matches!(err, RepoError::Rejected(_)));
        assert!(db.executed_any("ROLLBACK"));
        assert!(!db.executed_any("COMMIT"));
        db.assert_all_released();
    }

    #[test]
    fn create_after_highest_possible_identifier_rolls_back() {
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "ORDER BY id DESC LIMIT 1",
            rows: vec![person_row(i64::MAX, "IG-11")],
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        let err = repo.create(&PersonDraft::named("Boba Fett")).unwrap_err();

        assert!(matches!(err, RepoError::IdentifiersExhausted(i64::MAX)));
        assert!(!db.executed_any("INSERT INTO people"));
        assert!(db.executed_any("ROLLBACK"));
        assert!(!db.executed_any("COMMIT"));
        db.assert_all_released();
    }

    #[test]
    fn failed_commit_rolls_back() {
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "COMMIT",
            fail_exec: true,
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        let err = repo.create(&PersonDraft::named("Boba Fett")).unwrap_err();

        assert!(matches!(err, RepoError::Db(_)));
        assert!(db.executed().last().unwrap().starts_with("ROLLBACK"));
    }

    #[test]
    fn transaction_rolls_back_when_unwinding() {
        let db = ScriptedDatabase::default();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _tx = ImmediateTransaction::begin(&db).unwrap();
            panic!("allocation failed mid-transaction");
        }));

        assert!(outcome.is_err());
        assert_eq!(db.executed(), vec!["BEGIN IMMEDIATE;", "ROLLBACK;"]);
    }

    #[test]
    fn committed_transaction_is_not_rolled_back() {
        let db = ScriptedDatabase::default();

        ImmediateTransaction::begin(&db).unwrap().commit().unwrap();

        assert_eq!(db.executed(), vec!["BEGIN IMMEDIATE;", "COMMIT;"]);
    }

    #[test]
    fn timestamps_strictly_increase() {
        let stamps: Vec<String> = (0..200).map(|_| timestamp_now()).collect();

        for pair in stamps.windows(2) {
            let earlier = chrono::DateTime::parse_from_rfc3339(&pair[0]).unwrap();
            let later = chrono::DateTime::parse_from_rfc3339(&pair[1]).unwrap();
            assert!(later > earlier, "{} is not after {}", pair[1], pair[0]);
        }
        assert!(stamps[0].ends_with('Z'));
    }

    #[test]
    fn cursor_failure_surfaces_as_db_error() {
        let db = ScriptedDatabase::with(vec![
            Script {
                pattern: "FROM people ORDER BY created",
                fail_step: true,
                ..Script::default()
            },
            Script {
                pattern: "FROM people WHERE id",
                fail_step: true,
                ..Script::default()
            },
        ]);
        let repo = SqlPersonRepository::new(&db);

        assert!(matches!(repo.fetch_all().unwrap_err(), RepoError::Db(_)));
        assert!(matches!(repo.fetch_by_id(3).unwrap_err(), RepoError::Db(_)));
        db.assert_all_released();
    }

    #[test]
    fn undecodable_row_surfaces_as_db_error() {
        let mut short_row = person_row(4, "Darth Vader");
        short_row.truncate(5);
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "FROM people WHERE id",
            rows: vec![short_row],
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        let err = repo.fetch_by_id(4).unwrap_err();
        assert!(matches!(err, RepoError::Db(DbError::Decode { column: 5, .. })));
        db.assert_all_released();
    }

    #[test]
    fn fetch_all_attaches_collections_per_person() {
        let db = ScriptedDatabase::with(vec![Script {
            pattern: "FROM people ORDER BY created",
            rows: vec![person_row(1, "Luke Skywalker"), person_row(2, "C-3PO")],
            ..Script::default()
        }]);
        let repo = SqlPersonRepository::new(&db);

        let people = repo.fetch_all().unwrap();

        assert_eq!(people.len(), 2);
        assert_eq!(people[1].name, "C-3PO");
        assert!(people.iter().all(|person| person.vehicles.is_empty()));
        // one people query plus one vehicle and one starship query per person
        assert_eq!(db.opened.get(), 5);
        db.assert_all_released();
    }

    #[test]
    fn fetch_by_id_reports_absent_identifier() {
        let db = ScriptedDatabase::default();
        let repo = SqlPersonRepository::new(&db);

        assert!(matches!(repo.fetch_by_id(7).unwrap_err(), RepoError::NotFound(7)));
        db.assert_all_released();
    }

    #[test]
    fn update_and_delete_of_absent_person_do_not_write() {
        let db = ScriptedDatabase::with(vec![exists_script(false)]);
        let repo = SqlPersonRepository::new(&db);

        let update_err = repo.update(6, &PersonDraft::named("Jango Fett")).unwrap_err();
        let delete_err = repo.delete(15).unwrap_err();

        assert!(matches!(update_err, RepoError::NotFound(6)));
        assert!(matches!(delete_err, RepoError::NotFound(15)));
        assert!(db.executed().is_empty());
        db.assert_all_released();
    }

    #[test]
    fn rejected_update_and_delete_surface_as_rejected() {
        let db = ScriptedDatabase::with(vec![
            exists_script(true),
            Script {
                pattern: "UPDATE people",
                fail_exec: true,
                ..Script::default()
            },
            Script {
                pattern: "DELETE FROM people",
                fail_exec: true,
                ..Script::default()
            },
        ]);
        let repo = SqlPersonRepository::new(&db);

        let update_err = repo.update(6, &PersonDraft::named("Jango Fett")).unwrap_err();
        let delete_err = repo.delete(18).unwrap_err();

        assert!(matches!(update_err, RepoError::Rejected(_)));
        assert!(matches!(delete_err, RepoError::Rejected(_)));
        db.assert_all_released();
    }

    #[test]
    fn mutation_changing_no_rows_reports_not_found() {
        let db = ScriptedDatabase::with(vec![
            exists_script(true),
            Script {
                pattern: "DELETE FROM people",
                changed: Some(0),
                ..Script::default()
            },
        ]);
        let repo = SqlPersonRepository::new(&db);

        assert!(matches!(repo.delete(21).unwrap_err(), RepoError::NotFound(21)));
    }

    #[test]
    fn update_and_delete_of_existing_person_succeed() {
        let db = ScriptedDatabase::with(vec![exists_script(true)]);
        let repo = SqlPersonRepository::new(&db);

        repo.update(6, &PersonDraft::named("Jango Fett")).unwrap();
        repo.delete(21).unwrap();

        assert!(db.executed_any("UPDATE people"));
        assert!(db.executed_any("DELETE FROM people"));
        db.assert_all_released();
    }
}
