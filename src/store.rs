use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::attempt::AttemptResult;
use crate::error::StoreError;
use crate::quiz::{Quiz, Session};

/// A completed attempt as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Option<i64>,
    pub student_id: String,
    pub session_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u8,
    pub answers: BTreeMap<usize, usize>,
    pub correct_count: usize,
    pub question_count: usize,
    pub completed_at: DateTime<Local>,
}

impl QuizResult {
    /// Builds the record for an attempt; quizzes without an id get a
    /// timestamp-derived one.
    pub fn new(
        student_id: &str,
        session: &Session,
        quiz: &Quiz,
        result: AttemptResult,
        completed_at: DateTime<Local>,
    ) -> Self {
        let quiz_id = quiz
            .id
            .clone()
            .unwrap_or_else(|| format!("quiz_{}", completed_at.timestamp_millis()));

        Self {
            id: None,
            student_id: student_id.to_string(),
            session_id: session.id.clone(),
            quiz_id,
            quiz_title: quiz.title.clone(),
            score: result.score,
            answers: result.answers,
            correct_count: result.correct_count,
            question_count: result.question_count,
            completed_at,
        }
    }
}

/// Data-access boundary for quiz results.
pub trait ResultStore {
    /// Persists a result and returns its id.
    fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError>;
    /// Every stored result, newest first.
    fn list_results(&self) -> Result<Vec<QuizResult>, StoreError>;
    fn list_results_for_student(&self, student_id: &str) -> Result<Vec<QuizResult>, StoreError>;
}

/// Fixed-width UTC text, so ordering by the column is chronological.
fn stored_timestamp(at: &DateTime<Local>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SQLite-backed store.
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened result store");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                quiz_id TEXT NOT NULL,
                quiz_title TEXT NOT NULL,
                score INTEGER NOT NULL,
                answers TEXT NOT NULL,
                correct_count INTEGER NOT NULL,
                question_count INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quiz_results_student ON quiz_results(student_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quiz_results_completed_at ON quiz_results(completed_at)",
            [],
        )?;

        Ok(Self { conn })
    }

    fn query(&self, student_id: Option<&str>) -> Result<Vec<QuizResult>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, session_id, quiz_id, quiz_title, score, answers,
                   correct_count, question_count, completed_at
            FROM quiz_results
            WHERE (?1 IS NULL OR student_id = ?1)
            ORDER BY completed_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map([student_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u8>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (
                id,
                student_id,
                session_id,
                quiz_id,
                quiz_title,
                score,
                answers,
                correct_count,
                question_count,
                completed_at,
            ) = row?;

            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        9,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            results.push(QuizResult {
                id: Some(id),
                student_id,
                session_id,
                quiz_id,
                quiz_title,
                score,
                answers: serde_json::from_str(&answers)?,
                correct_count: correct_count as usize,
                question_count: question_count as usize,
                completed_at,
            });
        }

        Ok(results)
    }
}

impl ResultStore for SqliteResultStore {
    fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO quiz_results
            (student_id, session_id, quiz_id, quiz_title, score, answers,
             correct_count, question_count, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                result.student_id,
                result.session_id,
                result.quiz_id,
                result.quiz_title,
                result.score,
                serde_json::to_string(&result.answers)?,
                result.correct_count as i64,
                result.question_count as i64,
                stored_timestamp(&result.completed_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(id, quiz = %result.quiz_id, score = result.score, "saved quiz result");
        Ok(id)
    }

    fn list_results(&self) -> Result<Vec<QuizResult>, StoreError> {
        self.query(None)
    }

    fn list_results_for_student(&self, student_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        self.query(Some(student_id))
    }
}

/// Keeps results for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<QuizResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<QuizResult> {
        let mut results = self
            .results
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        results
    }
}

impl ResultStore for MemoryResultStore {
    fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError> {
        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = results.len() as i64 + 1;
        results.push(QuizResult {
            id: Some(id),
            ..result.clone()
        });
        Ok(id)
    }

    fn list_results(&self) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self.snapshot())
    }

    fn list_results_for_student(&self, student_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: Option<i64>,
    student_id: &'a str,
    session_id: &'a str,
    quiz_id: &'a str,
    quiz_title: &'a str,
    score: u8,
    correct_count: usize,
    question_count: usize,
    answers: String,
    completed_at: String,
}

/// Writes results as CSV with a header row.
pub fn export_csv<W: Write>(results: &[QuizResult], writer: W) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in results {
        wtr.serialize(CsvRow {
            id: r.id,
            student_id: &r.student_id,
            session_id: &r.session_id,
            quiz_id: &r.quiz_id,
            quiz_title: &r.quiz_title,
            score: r.score,
            correct_count: r.correct_count,
            question_count: r.question_count,
            answers: serde_json::to_string(&r.answers)?,
            completed_at: r.completed_at.to_rfc3339(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Question;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn result_for(student: &str, quiz_id: &str, score: u8, minutes_ago: i64) -> QuizResult {
        let at = Local.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap() - Duration::minutes(minutes_ago);
        QuizResult {
            id: None,
            student_id: student.to_string(),
            session_id: "meeting-1".to_string(),
            quiz_id: quiz_id.to_string(),
            quiz_title: format!("Quiz {quiz_id}"),
            score,
            answers: BTreeMap::from([(0, 1), (2, 0)]),
            correct_count: 1,
            question_count: 3,
            completed_at: at,
        }
    }

    #[test]
    fn sqlite_save_and_list_newest_first() {
        let store = SqliteResultStore::in_memory().unwrap();
        let older = result_for("siti", "a", 40, 30);
        let newer = result_for("siti", "b", 90, 5);

        let first = store.save_result(&older).unwrap();
        let second = store.save_result(&newer).unwrap();
        assert!(second > first);

        let results = store.list_results().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].quiz_id, "b");
        assert_eq!(results[0].id, Some(second));
        assert_eq!(results[1].answers, BTreeMap::from([(0, 1), (2, 0)]));
        assert_eq!(results[1].completed_at, older.completed_at);
    }

    #[test]
    fn sqlite_stores_timestamps_as_utc() {
        let store = SqliteResultStore::in_memory().unwrap();
        let r = result_for("siti", "a", 40, 0);
        store.save_result(&r).unwrap();

        let raw: String = store
            .conn
            .query_row("SELECT completed_at FROM quiz_results", [], |row| row.get(0))
            .unwrap();
        assert!(raw.ends_with('Z'), "{raw}");
        assert_eq!(
            DateTime::parse_from_rfc3339(&raw).unwrap(),
            r.completed_at.with_timezone(&Utc)
        );
        assert_eq!(store.list_results().unwrap()[0].completed_at, r.completed_at);
    }

    #[test]
    fn sqlite_orders_by_instant_not_local_text() {
        let store = SqliteResultStore::in_memory().unwrap();
        // 01:30 at UTC-4 is earlier than 01:10 at UTC-5
        let earlier = DateTime::parse_from_rfc3339("2026-11-01T01:30:00-04:00").unwrap();
        let later = DateTime::parse_from_rfc3339("2026-11-01T01:10:00-05:00").unwrap();

        let mut first = result_for("siti", "later", 90, 0);
        first.completed_at = later.with_timezone(&Local);
        let mut second = result_for("siti", "earlier", 40, 0);
        second.completed_at = earlier.with_timezone(&Local);
        store.save_result(&first).unwrap();
        store.save_result(&second).unwrap();

        let ids: Vec<String> = store
            .list_results()
            .unwrap()
            .into_iter()
            .map(|r| r.quiz_id)
            .collect();
        assert_eq!(ids, vec!["later", "earlier"]);
    }

    #[test]
    fn sqlite_filters_by_student() {
        let store = SqliteResultStore::in_memory().unwrap();
        store.save_result(&result_for("siti", "a", 40, 3)).unwrap();
        store.save_result(&result_for("budi", "a", 70, 2)).unwrap();

        let budi = store.list_results_for_student("budi").unwrap();
        assert_eq!(budi.len(), 1);
        assert_eq!(budi[0].score, 70);
        assert!(store.list_results_for_student("nobody").unwrap().is_empty());
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.db");

        {
            let store = SqliteResultStore::open(&path).unwrap();
            store.save_result(&result_for("siti", "a", 75, 1)).unwrap();
        }

        let store = SqliteResultStore::open(&path).unwrap();
        let results = store.list_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 75);
    }

    #[test]
    fn memory_store_matches_sqlite_behaviour() {
        let store = MemoryResultStore::new();
        store.save_result(&result_for("siti", "a", 40, 30)).unwrap();
        store.save_result(&result_for("budi", "b", 90, 5)).unwrap();

        let all = store.list_results().unwrap();
        assert_eq!(all[0].quiz_id, "b");
        assert_eq!(all[0].id, Some(2));
        assert_eq!(store.list_results_for_student("siti").unwrap().len(), 1);
    }

    #[test]
    fn new_result_generates_quiz_id_when_missing() {
        let session = Session {
            id: "meeting-3".into(),
            session_number: 3,
            title: "Geometry".into(),
            ..Default::default()
        };
        let quiz = Quiz::new("Angles", vec![Question::new("?", vec!["a", "b"], 0)], None);
        let at = Local.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let attempt = AttemptResult {
            score: 100,
            answers: BTreeMap::from([(0, 0)]),
            correct_count: 1,
            question_count: 1,
        };

        let record = QuizResult::new("siti", &session, &quiz, attempt, at);
        assert_eq!(record.quiz_id, format!("quiz_{}", at.timestamp_millis()));
        assert_eq!(record.session_id, "meeting-3");
        assert_eq!(record.quiz_title, "Angles");
        assert_eq!(record.score, 100);
    }

    #[test]
    fn export_csv_writes_header_and_rows() {
        let mut out = Vec::new();
        let mut r = result_for("siti", "a", 75, 0);
        r.id = Some(7);
        export_csv(&[r], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,student_id,session_id,quiz_id,quiz_title,score,correct_count,question_count,answers,completed_at")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,siti,meeting-1,a,Quiz a,75,1,3,"));
        assert!(row.contains(r#""{""0"":1,""2"":0}""#));
    }
}
