use tracing::debug;

use crate::grid::Grid;
use crate::penalty::{assess_placement, conflict_count, LoadLimits};
use crate::problem::{DayId, Period, Problem, TaskId};
use crate::task::{Placement, Task};
use crate::weights::PenaltyWeights;

/// Conflict count recorded for a task placed by the random fallback, so the
/// repair loop picks it up on its first pass.
pub const FALLBACK_CONFLICTS: u32 = 999;

#[derive(Debug, Clone, Copy)]
pub struct SlotChoice {
    pub placement: Placement,
    pub conflicts: u32,
}

fn candidate_starts<'a>(problem: &'a Problem, is_double: bool) -> Box<dyn Iterator<Item = Period> + 'a> {
    if is_double {
        Box::new(problem.valid_double_starts.iter().copied())
    } else {
        Box::new(1..=problem.periods_per_day)
    }
}

/// The minimum-score placement rule shared by the initializer, the relocate
/// operator and the strategic shuffle. The task must currently be removed
/// from the grid.
///
/// Days on which the lesson already sits are filtered by the daily-repeat
/// guard; if that filters everything, a uniformly random legal slot is
/// chosen instead and flagged with [`FALLBACK_CONFLICTS`].
pub fn select_slot(
    problem: &Problem,
    grid: &Grid,
    task: &Task,
    weights: &PenaltyWeights,
    limits: LoadLimits,
    rng: &mut fastrand::Rng,
) -> SlotChoice {
    let lesson = problem.lesson(task.lesson);
    let mut best: Option<(i64, SlotChoice)> = None;

    for day in problem.days() {
        if grid.lesson_placed_on(task.lesson, day) {
            continue;
        }
        for period in candidate_starts(problem, task.is_double) {
            let counts =
                assess_placement(problem, grid, task.lesson, day, period, task.is_double, limits);
            let conflicts = conflict_count(counts.total(weights));

            // Integer-scaled blend of conflict count against how much spare
            // daily capacity the teachers keep on this day.
            let balance: i64 = lesson
                .teachers
                .iter()
                .map(|&teacher| {
                    (limits.daily as i64 - grid.teacher_day_load(teacher, day) as i64).max(0)
                })
                .sum();
            let score = 10 * conflicts as i64 - balance;

            let better = match best {
                Some((best_score, _)) => score < best_score,
                None => true,
            };
            if better {
                best = Some((
                    score,
                    SlotChoice {
                        placement: Placement { day, period },
                        conflicts,
                    },
                ));
            }
        }
    }

    match best {
        Some((_, choice)) => choice,
        None => random_legal_slot(problem, task.is_double, rng),
    }
}

fn random_legal_slot(problem: &Problem, is_double: bool, rng: &mut fastrand::Rng) -> SlotChoice {
    let starts: Vec<Period> = candidate_starts(problem, is_double).collect();
    let slot = rng.usize(0..problem.num_days() * starts.len());
    SlotChoice {
        placement: Placement {
            day: DayId::from_index(slot / starts.len()),
            period: starts[slot % starts.len()],
        },
        conflicts: FALLBACK_CONFLICTS,
    }
}

/// Place every task, hardest first, at its minimum-score slot. Deliberately
/// best-effort: overlaps are allowed and no task is ever rejected.
pub fn greedy_initialize(
    problem: &Problem,
    tasks: &[Task],
    order: &[TaskId],
    grid: &mut Grid,
    weights: &PenaltyWeights,
    limits: LoadLimits,
    rng: &mut fastrand::Rng,
) -> Vec<u32> {
    let mut conflicts = vec![0u32; tasks.len()];
    for &task_id in order {
        let task = &tasks[task_id.raw_index()];
        let choice = select_slot(problem, grid, task, weights, limits, rng);
        grid.place(problem, task, choice.placement);
        conflicts[task_id.raw_index()] = choice.conflicts;
    }
    debug!(
        placed = order.len(),
        conflicted = conflicts.iter().filter(|&&c| c > 0).count(),
        "greedy initialization finished"
    );
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Lesson, SchoolClass, SolverInput, TimetableConfig};
    use crate::task::{difficulty_order, expand_tasks};

    fn build(lessons: Vec<Lesson>, periods_per_day: u8, days: usize, boundaries: Vec<u8>) -> Problem {
        let input = SolverInput {
            lessons,
            classes: vec![SchoolClass {
                id: "c1".into(),
                name: "7A".into(),
                grade: 7,
            }],
            config: TimetableConfig {
                periods_per_day,
                days_of_week: (0..days).map(|d| format!("D{d}")).collect(),
                interval_boundaries: boundaries,
            },
        };
        Problem::compile(&input).unwrap()
    }

    fn lesson(id: &str, singles: u32, doubles: u32) -> Lesson {
        Lesson {
            id: id.into(),
            name: id.into(),
            subject_ids: vec![],
            teacher_ids: vec!["t1".into()],
            class_ids: vec!["c1".into()],
            singles,
            doubles,
            color: None,
        }
    }

    #[test]
    fn spreads_singles_across_days() {
        let problem = build(vec![lesson("a", 3, 0)], 5, 3, vec![]);
        let tasks = expand_tasks(&problem);
        let order = difficulty_order(&problem, &tasks, &[]);
        let mut grid = Grid::new(&problem, tasks.len());
        let mut rng = fastrand::Rng::with_seed(1);

        let conflicts = greedy_initialize(
            &problem,
            &tasks,
            &order,
            &mut grid,
            &PenaltyWeights::default(),
            LoadLimits::default(),
            &mut rng,
        );

        assert!(conflicts.iter().all(|&c| c == 0));
        let days: Vec<usize> = tasks
            .iter()
            .map(|task| grid.placement(task.task_id).unwrap().day.raw_index())
            .collect();
        let mut unique = days.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3, "daily-repeat guard should spread instances");
    }

    #[test]
    fn doubles_only_start_on_valid_periods() {
        let problem = build(vec![lesson("a", 0, 2)], 4, 2, vec![2]);
        let tasks = expand_tasks(&problem);
        let order = difficulty_order(&problem, &tasks, &[]);
        let mut grid = Grid::new(&problem, tasks.len());
        let mut rng = fastrand::Rng::with_seed(7);

        greedy_initialize(
            &problem,
            &tasks,
            &order,
            &mut grid,
            &PenaltyWeights::default(),
            LoadLimits::default(),
            &mut rng,
        );

        for task in &tasks {
            let placement = grid.placement(task.task_id).unwrap();
            assert!(problem.valid_double_starts.contains(&placement.period));
        }
    }

    #[test]
    fn guard_exhaustion_falls_back_to_a_random_slot() {
        // Three singles but only two days: the guard blocks every day for
        // the third instance.
        let problem = build(vec![lesson("a", 3, 0)], 5, 2, vec![]);
        let tasks = expand_tasks(&problem);
        let order = difficulty_order(&problem, &tasks, &[]);
        let mut grid = Grid::new(&problem, tasks.len());
        let mut rng = fastrand::Rng::with_seed(3);

        let conflicts = greedy_initialize(
            &problem,
            &tasks,
            &order,
            &mut grid,
            &PenaltyWeights::default(),
            LoadLimits::default(),
            &mut rng,
        );

        assert_eq!(
            conflicts.iter().filter(|&&c| c == FALLBACK_CONFLICTS).count(),
            1
        );
        for task in &tasks {
            assert!(grid.placement(task.task_id).is_some());
        }
    }
}
