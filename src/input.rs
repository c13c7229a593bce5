use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One lesson as supplied by the hosting layer. A lesson binds every teacher
/// in `teacher_ids` and every class in `class_ids` simultaneously whenever one
/// of its instances is placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject_ids: Vec<String>,
    pub teacher_ids: Vec<String>,
    pub class_ids: Vec<String>,
    pub singles: u32,
    pub doubles: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    pub grade: u8,
}

/// The weekly grid: `days_of_week` × `periods_per_day` cells per class.
/// An entry `k` in `interval_boundaries` means a break follows period `k`,
/// so a double period may not start at `k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableConfig {
    pub periods_per_day: u8,
    pub days_of_week: Vec<String>,
    #[serde(default)]
    pub interval_boundaries: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverInput {
    pub lessons: Vec<Lesson>,
    pub classes: Vec<SchoolClass>,
    pub config: TimetableConfig,
}

/// Rejection of malformed input, raised before any solving starts.
/// Structural infeasibility is deliberately not an error; it surfaces as
/// warnings and unresolved conflicts instead.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("periods_per_day must be at least 1")]
    NoPeriods,
    #[error("days_of_week must not be empty")]
    NoDays,
    #[error("interval boundary {value} is outside 1..={max}")]
    IntervalBoundaryOutOfRange { value: u8, max: u8 },
    #[error("duplicate class id {id:?}")]
    DuplicateClassId { id: String },
    #[error("duplicate lesson id {id:?}")]
    DuplicateLessonId { id: String },
    #[error("duplicate day name {name:?}")]
    DuplicateDay { name: String },
    #[error("lesson {lesson:?} references unknown class {class_id:?}")]
    UnknownClass { lesson: String, class_id: String },
    #[error("lesson {lesson:?} has an empty teacher set")]
    EmptyTeacherSet { lesson: String },
    #[error("lesson {lesson:?} has an empty class set")]
    EmptyClassSet { lesson: String },
    #[error("lesson {lesson:?} requires a double period but the grid has no legal double start")]
    NoLegalDoubleStart { lesson: String },
}
