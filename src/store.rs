use rusqlite::{Connection, ErrorCode, OptionalExtension};
use thiserror::Error;

use crate::calc::{StudentTally, Tally};
use crate::model::{
    name_key, HeadmanChange, InsertOutcome, Lesson, LessonDate, LessonMark, Status, Student,
    StudentId, UpsertOutcome,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("student {0} not found")]
    MissingStudent(StudentId),
}

fn student_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        is_headman: r.get::<_, i64>(2)? != 0,
    })
}

/// All students in name order.
pub fn list_students(conn: &Connection) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, is_headman
         FROM students
         ORDER BY name_key, id",
    )?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_student(conn: &Connection, id: StudentId) -> StoreResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, is_headman FROM students WHERE id = ?",
            [id],
            student_from_row,
        )
        .optional()?;
    Ok(student)
}

/// Inserts a student; a case-insensitive name collision is reported, not raised.
pub fn insert_student(conn: &Connection, name: &str) -> StoreResult<InsertOutcome> {
    let res = conn.execute(
        "INSERT INTO students(name, name_key, is_headman) VALUES(?, ?, 0)",
        (name, name_key(name)),
    );
    match res {
        Ok(_) => Ok(InsertOutcome::Added),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes a student together with its attendance records as one unit.
pub fn delete_student(conn: &Connection, id: StudentId) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance WHERE student_id = ?", [id])?;
    let removed = tx.execute("DELETE FROM students WHERE id = ?", [id])?;
    if removed == 0 {
        return Err(StoreError::MissingStudent(id));
    }
    tx.commit()?;
    Ok(())
}

pub fn assign_headman(conn: &Connection, id: StudentId) -> StoreResult<HeadmanChange> {
    let tx = conn.unchecked_transaction()?;
    let Some(student) = find_student(&tx, id)? else {
        return Err(StoreError::MissingStudent(id));
    };
    if student.is_headman {
        return Ok(HeadmanChange::AlreadyHeadman);
    }
    let previous: Option<String> = tx
        .query_row(
            "SELECT name FROM students WHERE is_headman = 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    tx.execute("UPDATE students SET is_headman = 0 WHERE is_headman = 1", [])?;
    tx.execute("UPDATE students SET is_headman = 1 WHERE id = ?", [id])?;
    tx.commit()?;
    Ok(HeadmanChange::Assigned { previous })
}

/// Insert-or-update keyed by (student, date, lesson); the latest status wins.
pub fn upsert_attendance(
    conn: &Connection,
    student_id: StudentId,
    date: LessonDate,
    lesson: Lesson,
    status: Status,
) -> StoreResult<UpsertOutcome> {
    let tx = conn.unchecked_transaction()?;
    if find_student(&tx, student_id)?.is_none() {
        return Err(StoreError::MissingStudent(student_id));
    }
    let date = date.to_string();
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM attendance WHERE student_id = ? AND date = ? AND lesson = ?",
            (student_id, &date, lesson.number()),
            |r| r.get(0),
        )
        .optional()?;
    tx.execute(
        "INSERT INTO attendance(student_id, date, lesson, status)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, date, lesson) DO UPDATE SET
           status = excluded.status",
        (student_id, &date, lesson.number(), status.as_str()),
    )?;
    tx.commit()?;
    Ok(if existing.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    })
}

/// Full roster left-joined against one lesson's records.
pub fn lesson_marks(
    conn: &Connection,
    date: LessonDate,
    lesson: Lesson,
) -> StoreResult<Vec<LessonMark>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.is_headman, a.status
         FROM students s
         LEFT JOIN attendance a
           ON a.student_id = s.id AND a.date = ? AND a.lesson = ?
         ORDER BY s.name_key, s.id",
    )?;
    let rows = stmt
        .query_map((date.to_string(), lesson.number()), |r| {
            let status: Option<String> = r.get(3)?;
            Ok(LessonMark {
                student: student_from_row(r)?,
                status: status.as_deref().and_then(Status::from_db),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

const TALLY_SELECT: &str = "SELECT s.id, s.name, s.is_headman,
        COALESCE(SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END), 0)
     FROM students s
     LEFT JOIN attendance a ON a.student_id = s.id";

fn tally_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StudentTally> {
    Ok(StudentTally {
        student: student_from_row(r)?,
        tally: Tally {
            present: r.get::<_, i64>(3)? as u32,
            absent: r.get::<_, i64>(4)? as u32,
        },
    })
}

/// Present/absent counts for every student, in name order.
pub fn student_tallies(conn: &Connection) -> StoreResult<Vec<StudentTally>> {
    let sql = format!("{TALLY_SELECT} GROUP BY s.id ORDER BY s.name_key, s.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], tally_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_tally(conn: &Connection, id: StudentId) -> StoreResult<StudentTally> {
    let sql = format!("{TALLY_SELECT} WHERE s.id = ? GROUP BY s.id");
    conn.query_row(&sql, [id], tally_from_row)
        .optional()?
        .ok_or(StoreError::MissingStudent(id))
}

/// `None` while the group name is unset.
pub fn group_name(conn: &Connection) -> StoreResult<Option<String>> {
    let name: Option<Option<String>> = conn
        .query_row("SELECT group_name FROM group_info WHERE id = 1", [], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(name.flatten())
}

pub fn set_group_name(conn: &Connection, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO group_info(id, group_name) VALUES(1, ?)
         ON CONFLICT(id) DO UPDATE SET group_name = excluded.group_name",
        [name],
    )?;
    Ok(())
}
