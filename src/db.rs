use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::model::name_key;

/// Group name sentinel written by the first version of the bot.
const LEGACY_UNSET_GROUP: &str = "Не указана";
const LEGACY_PRESENT: &str = "присутствовал";
const LEGACY_ABSENT: &str = "отсутствовал";

pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create database directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    init_schema(&conn).context("prepare database schema")?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name_key TEXT NOT NULL DEFAULT '',
            is_headman INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            lesson INTEGER NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_info(
            id INTEGER PRIMARY KEY CHECK (id = 1),
            group_name TEXT
        )",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO group_info(id, group_name) VALUES(1, NULL)",
        [],
    )?;

    // Databases written by the first version of the bot lack name_key, allow
    // duplicate attendance rows and store localized status words.
    ensure_students_name_key(conn)?;
    ensure_single_headman(conn)?;
    migrate_attendance_rows(conn)?;
    migrate_group_sentinel(conn)?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_name_key ON students(name_key)",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_single_headman
         ON students(is_headman) WHERE is_headman = 1",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_student_lesson
         ON attendance(student_id, date, lesson)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date_lesson ON attendance(date, lesson)",
        [],
    )?;

    Ok(())
}

fn ensure_students_name_key(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "students", "name_key")? {
        conn.execute(
            "ALTER TABLE students ADD COLUMN name_key TEXT NOT NULL DEFAULT ''",
            [],
        )?;
    }

    // Backfill rows whose key is missing or stale.
    let mut stmt = conn.prepare("SELECT id, name, name_key FROM students")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let mut backfilled = 0usize;
    for (id, name, key) in rows {
        let expected = name_key(&name);
        if key != expected {
            conn.execute(
                "UPDATE students SET name_key = ? WHERE id = ?",
                (&expected, id),
            )?;
            backfilled += 1;
        }
    }
    if backfilled > 0 {
        debug!(backfilled, "students.name_key backfilled");
    }
    merge_name_key_collisions(conn)?;
    Ok(())
}

/// NOCASE only folds ASCII, so old journals may hold case variants of one
/// Cyrillic name. Each group is folded into its lowest id; for a lesson marked
/// under several variants the newest row wins.
fn merge_name_key_collisions(conn: &Connection) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, name_key FROM students
         WHERE name_key IN (
            SELECT name_key FROM students GROUP BY name_key HAVING COUNT(*) > 1
         )
         ORDER BY name_key, id",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    let mut keeper: Option<(i64, &str)> = None;
    let mut merged = 0usize;
    for (id, key) in &rows {
        let target = match keeper {
            Some((kid, kkey)) if kkey == key.as_str() => kid,
            _ => {
                keeper = Some((*id, key.as_str()));
                continue;
            }
        };

        tx.execute(
            "DELETE FROM attendance
             WHERE id IN (
                SELECT older.id
                FROM attendance older
                JOIN attendance newer
                  ON newer.date = older.date
                 AND newer.lesson = older.lesson
                 AND newer.id > older.id
                WHERE older.student_id IN (?1, ?2)
                  AND newer.student_id IN (?1, ?2)
             )",
            (target, id),
        )?;
        tx.execute(
            "UPDATE attendance SET student_id = ? WHERE student_id = ?",
            (target, id),
        )?;
        let was_headman: bool = tx.query_row(
            "SELECT COALESCE(is_headman, 0) <> 0 FROM students WHERE id = ?",
            [id],
            |r| r.get(0),
        )?;
        tx.execute("DELETE FROM students WHERE id = ?", [id])?;
        if was_headman {
            tx.execute("UPDATE students SET is_headman = 1 WHERE id = ?", [target])?;
        }
        warn!(merged_id = id, into_id = target, name_key = %key, "case-variant student merged");
        merged += 1;
    }
    tx.commit()?;
    info!(merged, "legacy name collisions resolved");
    Ok(())
}

fn ensure_single_headman(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE students SET is_headman = 0 WHERE is_headman IS NULL",
        [],
    )?;
    conn.execute(
        "UPDATE students SET is_headman = 0
         WHERE is_headman <> 0
           AND id <> (SELECT MIN(id) FROM students WHERE is_headman <> 0)",
        [],
    )?;
    conn.execute(
        "UPDATE students SET is_headman = 1 WHERE is_headman <> 0",
        [],
    )?;
    Ok(())
}

fn migrate_attendance_rows(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE attendance SET status = 'present' WHERE status = ?",
        [LEGACY_PRESENT],
    )?;
    conn.execute(
        "UPDATE attendance SET status = 'absent' WHERE status = ?",
        [LEGACY_ABSENT],
    )?;

    // The first version deleted a student before its rows, leaving orphans.
    let orphans = conn.execute(
        "DELETE FROM attendance
         WHERE student_id IS NULL
            OR student_id NOT IN (SELECT id FROM students)",
        [],
    )?;

    // Last write wins: keep the newest row per (student, date, lesson).
    let duplicates = conn.execute(
        "DELETE FROM attendance
         WHERE id NOT IN (
            SELECT MAX(id) FROM attendance GROUP BY student_id, date, lesson
         )",
        [],
    )?;
    if orphans > 0 || duplicates > 0 {
        info!(orphans, duplicates, "legacy attendance rows cleaned up");
    }
    Ok(())
}

fn migrate_group_sentinel(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE group_info SET group_name = NULL WHERE id = 1 AND group_name = ?",
        [LEGACY_UNSET_GROUP],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
