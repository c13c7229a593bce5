use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::precheck::FeasibilityWarning;
use crate::problem::Problem;
use crate::report::FailedLesson;
use crate::task::Task;

/// How a slot record participates in its lesson instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Single,
    DoubleStart,
    DoubleEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub class_id: String,
    pub lesson_id: String,
    pub day: String,
    pub period: u8,
    pub is_double_start: bool,
    pub is_double_end: bool,
}

impl SlotRecord {
    pub fn kind(&self) -> SlotKind {
        match (self.is_double_start, self.is_double_end) {
            (true, _) => SlotKind::DoubleStart,
            (_, true) => SlotKind::DoubleEnd,
            _ => SlotKind::Single,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveStats {
    pub total_slots: u64,
    pub scheduled_lessons: u64,
    pub failed_lessons: u64,
    pub swap_attempts: u64,
    pub successful_swaps: u64,
    pub iterations: u64,
    pub conflicts_remaining: u64,
}

/// The complete best-effort outcome of one solve. `success` is true iff no
/// conflicts remain; slots are always returned, conflicts included, so a
/// presentation layer can render them distinctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub success: bool,
    pub slots: Vec<SlotRecord>,
    pub failed_lessons: Vec<FailedLesson>,
    pub warnings: Vec<FeasibilityWarning>,
    pub stats: SolveStats,
}

impl SolveResult {
    /// Ranking used by multi-seed drivers: fewer residual conflicts wins.
    pub fn better_than(&self, other: &SolveResult) -> bool {
        self.stats.conflicts_remaining < other.stats.conflicts_remaining
    }
}

/// Flatten the grid into slot records, one per cell record, in a fixed
/// (class, day, period, task) order.
pub fn serialize_grid(problem: &Problem, tasks: &[Task], grid: &Grid) -> Vec<SlotRecord> {
    let mut slots = Vec::new();
    for (class_index, class) in problem.classes.iter().enumerate() {
        let class_id = crate::problem::ClassId::from_index(class_index);
        for day in problem.days() {
            for period in 1..=problem.periods_per_day {
                for record in grid.records(class_id, day, period) {
                    let task = &tasks[record.task.raw_index()];
                    let placement = grid
                        .placement(record.task)
                        .expect("grid record for an unplaced task");
                    let (is_double_start, is_double_end) = if task.is_double {
                        (placement.period == period, placement.period != period)
                    } else {
                        (false, false)
                    };
                    slots.push(SlotRecord {
                        class_id: class.id.clone(),
                        lesson_id: problem.lesson(record.lesson).id.clone(),
                        day: problem.day_name(day).to_string(),
                        period,
                        is_double_start,
                        is_double_end,
                    });
                }
            }
        }
    }
    slots
}
