pub mod attendance;
pub mod group;
pub mod names;
pub mod picker;
pub mod stats;
pub mod students;

use rusqlite::Connection;
use thiserror::Error;

use super::reply::Reply;
use super::state::FlowState;
use crate::model::{LessonDate, Student};
use crate::store::StoreError;

pub const EMPTY_ROSTER: &str = "The student list is empty. Add students with /add_student.";

pub struct Ctx<'a> {
    pub conn: &'a Connection,
    pub today: LessonDate,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0} is no longer available")]
    MissingReference(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps a vanished student to a missing-reference error that names it.
pub fn about_student(student: &Student) -> impl Fn(StoreError) -> FlowError + '_ {
    move |e| match e {
        StoreError::MissingStudent(_) => {
            FlowError::MissingReference(format!("student {}", student.name))
        }
        other => FlowError::Store(other),
    }
}

pub type FlowResult = Result<Step, FlowError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Re-prompt: the session keeps its current state.
    Stay,
    Goto(FlowState),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub reply: Reply,
    pub next: Next,
}

impl Step {
    pub fn stay(reply: Reply) -> Self {
        Self {
            reply,
            next: Next::Stay,
        }
    }

    pub fn goto(reply: Reply, state: FlowState) -> Self {
        Self {
            reply,
            next: Next::Goto(state),
        }
    }

    pub fn done(reply: Reply) -> Self {
        Self {
            reply,
            next: Next::Done,
        }
    }
}
