use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::penalty::{assess_placement, conflict_count, LoadLimits};
use crate::problem::{LessonId, Period, Problem, TaskId};
use crate::task::Task;
use crate::weights::{PenaltyKind, PenaltyWeights};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCoord {
    pub day: String,
    pub period: Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapFeasibility {
    Easy,
    Moderate,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSuggestion {
    pub target_slot: SlotCoord,
    pub conflicting_lesson: Option<String>,
    pub alternative_slots: Vec<SlotCoord>,
    pub swap_feasibility: SwapFeasibility,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBreakdown {
    pub teacher_busy_count: u32,
    pub class_busy_count: u32,
    pub no_double_slot_count: u32,
    pub daily_limit_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLesson {
    pub lesson_id: String,
    pub lesson_name: String,
    pub required_periods: u32,
    pub failure_reason: String,
    pub detailed_conflicts: ConflictBreakdown,
    pub suggested_swaps: Vec<SwapSuggestion>,
}

const MAX_SUGGESTIONS: usize = 3;
const MAX_ALTERNATIVES: usize = 3;

/// Summarize every lesson that still has conflicting instances: a per
/// dimension breakdown, a prose reason favouring the dominant dimension,
/// and up to three concrete swap suggestions.
pub fn build_report(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    conflicts: &[u32],
    weights: &PenaltyWeights,
    limits: LoadLimits,
) -> Vec<FailedLesson> {
    let mut by_lesson: Vec<Vec<TaskId>> = vec![Vec::new(); problem.lessons.len()];
    for task in tasks {
        if conflicts[task.task_id.raw_index()] > 0 {
            by_lesson[task.lesson.raw_index()].push(task.task_id);
        }
    }

    let mut failed = Vec::new();
    for (lesson_index, task_ids) in by_lesson.iter().enumerate() {
        if task_ids.is_empty() {
            continue;
        }
        let lesson_id = LessonId::from_index(lesson_index);
        let lesson = problem.lesson(lesson_id);

        let breakdown = classify_conflicts(problem, tasks, grid, task_ids, limits);
        let failure_reason = describe_failure(&breakdown, task_ids.len());
        let suggested_swaps =
            suggest_swaps(problem, tasks, grid, conflicts, task_ids, weights, limits);

        failed.push(FailedLesson {
            lesson_id: lesson.id.clone(),
            lesson_name: lesson.name.clone(),
            required_periods: lesson.required_periods(),
            failure_reason,
            detailed_conflicts: breakdown,
            suggested_swaps,
        });
    }
    failed
}

fn classify_conflicts(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    task_ids: &[TaskId],
    limits: LoadLimits,
) -> ConflictBreakdown {
    let mut breakdown = ConflictBreakdown::default();
    for &task_id in task_ids {
        let task = &tasks[task_id.raw_index()];
        let placement = grid.remove(problem, task);
        let counts = assess_placement(
            problem,
            grid,
            task.lesson,
            placement.day,
            placement.period,
            task.is_double,
            limits,
        );
        breakdown.teacher_busy_count += counts.count(PenaltyKind::TeacherOverlap);
        breakdown.class_busy_count += counts.count(PenaltyKind::ClassOverlap);
        breakdown.daily_limit_count += counts.count(PenaltyKind::DailyOverload);

        if task.is_double && !has_free_double_slot(problem, grid, task, limits) {
            breakdown.no_double_slot_count += 1;
        }
        grid.place(problem, task, placement);
    }
    breakdown
}

/// Whether any interval-legal double start is free of hard conflicts for
/// the task, scanned with the task itself off the grid.
fn has_free_double_slot(
    problem: &Problem,
    grid: &Grid,
    task: &Task,
    limits: LoadLimits,
) -> bool {
    for day in problem.days() {
        for &period in &problem.valid_double_starts {
            let counts = assess_placement(problem, grid, task.lesson, day, period, true, limits);
            if counts.count(PenaltyKind::TeacherOverlap) == 0
                && counts.count(PenaltyKind::ClassOverlap) == 0
            {
                return true;
            }
        }
    }
    false
}

fn describe_failure(breakdown: &ConflictBreakdown, unplaced: usize) -> String {
    let dominant = [
        (
            breakdown.teacher_busy_count,
            format!(
                "teachers are double-booked for {} period(s)",
                breakdown.teacher_busy_count
            ),
        ),
        (
            breakdown.class_busy_count,
            format!(
                "the class timetable is already occupied for {} period(s)",
                breakdown.class_busy_count
            ),
        ),
        (
            breakdown.no_double_slot_count,
            "no interval-legal double slot is free".to_string(),
        ),
        (
            breakdown.daily_limit_count,
            "the teachers' daily period limit is exceeded".to_string(),
        ),
    ]
    .into_iter()
    .max_by_key(|(count, _)| *count);

    match dominant {
        Some((count, reason)) if count > 0 => {
            format!("{unplaced} instance(s) could not be placed cleanly: {reason}")
        }
        _ => format!("{unplaced} instance(s) violate soft scheduling constraints"),
    }
}

fn suggest_swaps(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    conflicts: &[u32],
    task_ids: &[TaskId],
    weights: &PenaltyWeights,
    limits: LoadLimits,
) -> Vec<SwapSuggestion> {
    // Most conflicted instances first; the stable id breaks ties.
    let mut ranked: Vec<TaskId> = task_ids.to_vec();
    ranked.sort_by_key(|&task_id| {
        (
            std::cmp::Reverse(conflicts[task_id.raw_index()]),
            task_id,
        )
    });

    let mut suggestions = Vec::new();
    for &task_id in ranked.iter().take(MAX_SUGGESTIONS) {
        let task = &tasks[task_id.raw_index()];
        let current = conflicts[task_id.raw_index()];
        let placement = grid.remove(problem, task);

        let mut candidates: Vec<(u32, SlotCoord)> = Vec::new();
        for day in problem.days() {
            let starts: Vec<Period> = if task.is_double {
                problem.valid_double_starts.clone()
            } else {
                (1..=problem.periods_per_day).collect()
            };
            for period in starts {
                let counts =
                    assess_placement(problem, grid, task.lesson, day, period, task.is_double, limits);
                let count = conflict_count(counts.total(weights));
                if count < current {
                    candidates.push((
                        count,
                        SlotCoord {
                            day: problem.day_name(day).to_string(),
                            period,
                        },
                    ));
                }
            }
        }
        candidates.sort_by_key(|(count, coord)| (*count, coord.day.clone(), coord.period));

        if let Some((best_count, target_slot)) = candidates.first().cloned() {
            let day = problem
                .days()
                .find(|&d| problem.day_name(d) == target_slot.day)
                .expect("candidate slot names a configured day");
            let target = crate::task::Placement {
                day,
                period: target_slot.period,
            };
            let mut conflicting_lesson = None;
            'blocking: for &class in problem.lesson(task.lesson).classes.iter() {
                for p in target.periods(task.is_double) {
                    if let Some(record) = grid.records(class, day, p).first() {
                        conflicting_lesson = Some(problem.lesson(record.lesson).name.clone());
                        break 'blocking;
                    }
                }
            }

            let alternative_slots = candidates
                .iter()
                .skip(1)
                .take(MAX_ALTERNATIVES)
                .map(|(_, coord)| coord.clone())
                .collect();

            let swap_feasibility = if best_count == 0 {
                SwapFeasibility::Easy
            } else if best_count * 2 < current {
                SwapFeasibility::Moderate
            } else {
                SwapFeasibility::Hard
            };

            suggestions.push(SwapSuggestion {
                target_slot,
                conflicting_lesson,
                alternative_slots,
                swap_feasibility,
            });
        }

        grid.place(problem, task, placement);
    }
    suggestions
}
