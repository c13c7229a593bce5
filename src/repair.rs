use std::sync::atomic::{AtomicBool, Ordering};

use bit_set::BitSet;
use itertools::Itertools;
use tracing::{debug, info};

use crate::grid::Grid;
use crate::mutation::Move;
use crate::penalty::{assess_placement, conflict_count, LoadLimits};
use crate::placement::select_slot;
use crate::problem::{Period, Problem, TaskId};
use crate::solver::{RejectPolicy, SolverSettings};
use crate::task::{Placement, Task};
use crate::weights::PenaltyWeights;

/// Iterations between progress reports; cancellation is observed at the
/// same boundary.
pub const PROGRESS_TICK: u64 = 100_000;

const MIN_TEMPERATURE: f64 = 0.0001;

#[derive(Debug, Default)]
pub struct RepairStats {
    pub iterations: u64,
    pub swap_attempts: u64,
    pub successful_swaps: u64,
    pub cancelled: bool,
}

/// Refresh every placed task's cached conflict count. Each task is scored
/// against the grid without itself, exactly as a fresh placement would be.
pub fn recompute_conflicts(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    weights: &PenaltyWeights,
    limits: LoadLimits,
    conflicts: &mut [u32],
) {
    for task in tasks {
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
        conflicts[task.task_id.raw_index()] = conflict_count(counts.total(weights));
        grid.place(problem, task, placement);
    }
}

fn total_conflicts(conflicts: &[u32]) -> u64 {
    conflicts.iter().map(|&count| count as u64).sum()
}

/// Simulated-annealing repair with adaptive reheating and a strategic
/// shuffle on long stagnation. Runs until zero conflicts, budget
/// exhaustion, or cancellation; the grid always holds the working state.
pub fn repair(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    conflicts: &mut Vec<u32>,
    settings: &SolverSettings,
    cancel: &AtomicBool,
    rng: &mut fastrand::Rng,
) -> RepairStats {
    let limits = settings.load_limits();
    let weights = &settings.weights;

    let mut stats = RepairStats::default();
    let mut current = total_conflicts(conflicts);
    let mut best = current;
    let mut best_grid = grid.clone();
    let mut best_conflicts = conflicts.clone();
    let mut since_improvement: u64 = 0;
    let mut since_reheat: u64 = 0;
    let mut temperature = 1.0f64;
    let mut previous_conflicts = vec![0u32; conflicts.len()];

    stats.iterations = settings.max_iterations;
    for iteration in 0..settings.max_iterations {
        if iteration > 0 && iteration % PROGRESS_TICK == 0 {
            info!(iteration, conflicts = current, temperature, "repair progress");
            if cancel.load(Ordering::Relaxed) {
                stats.iterations = iteration;
                stats.cancelled = true;
                break;
            }
        }

        if since_improvement >= settings.shuffle_threshold {
            strategic_shuffle(problem, tasks, grid, conflicts, weights, limits, rng);
            recompute_conflicts(problem, tasks, grid, weights, limits, conflicts);
            current = total_conflicts(conflicts);
            if current < best {
                best = current;
                best_grid = grid.clone();
                best_conflicts.copy_from_slice(conflicts);
            }
            temperature = 1.0;
            since_improvement = 0;
            since_reheat = 0;
        } else if since_reheat >= settings.stagnation_threshold {
            temperature = settings.reheat_temperature;
            since_reheat = 0;
        }

        let conflicted: Vec<TaskId> = conflicts
            .iter()
            .positions(|&count| count > 0)
            .map(TaskId::from_index)
            .collect();
        if conflicted.is_empty() {
            stats.iterations = iteration;
            break;
        }

        let target = conflicted[rng.usize(0..conflicted.len())];
        let mv = if rng.f64() < 0.3 {
            stats.swap_attempts += 1;
            let mv = chain_swap(problem, tasks, grid, settings, limits, rng, target);
            if mv.is_some() {
                stats.successful_swaps += 1;
            }
            mv
        } else {
            simple_move(problem, tasks, grid, settings, limits, rng, target)
        };

        let Some(mv) = mv else {
            since_improvement += 1;
            since_reheat += 1;
            temperature = (temperature - settings.cooling_rate).max(MIN_TEMPERATURE);
            continue;
        };

        mv.apply(problem, tasks, grid);
        previous_conflicts.copy_from_slice(conflicts);
        recompute_conflicts(problem, tasks, grid, weights, limits, conflicts);
        let new = total_conflicts(conflicts);

        let accept = if new <= current {
            true
        } else {
            let delta = (new - current) as f64;
            rng.f64() < (-delta / temperature).exp()
        };

        if accept {
            current = new;
            if new < best {
                best = new;
                best_grid = grid.clone();
                best_conflicts.copy_from_slice(conflicts);
                since_improvement = 0;
                since_reheat = 0;
            } else {
                since_improvement += 1;
                since_reheat += 1;
            }
        } else {
            match settings.reject_policy {
                RejectPolicy::Revert => {
                    mv.reverse(problem, tasks, grid);
                    conflicts.copy_from_slice(&previous_conflicts);
                }
                // The grid keeps the mutation; only the baseline stands still.
                RejectPolicy::KeepGrid => {}
            }
            since_improvement += 1;
            since_reheat += 1;
        }

        temperature = (temperature - settings.cooling_rate).max(MIN_TEMPERATURE);
    }

    // The walk may stand on an accepted uphill state; hand back the best
    // grid seen so the result never regresses below initialization.
    if total_conflicts(conflicts) > best {
        *grid = best_grid;
        conflicts.copy_from_slice(&best_conflicts);
    }

    debug!(
        iterations = stats.iterations,
        conflicts = total_conflicts(conflicts),
        "repair finished"
    );
    stats
}

fn periods_overlap(a: std::ops::Range<Period>, b: std::ops::Range<Period>) -> bool {
    a.start < b.end && b.start < a.end
}

fn slot_legal_for(problem: &Problem, task: &Task, slot: Placement) -> bool {
    !task.is_double || problem.valid_double_starts.contains(&slot.period)
}

fn placed_penalty(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    weights: &PenaltyWeights,
    limits: LoadLimits,
    task_id: TaskId,
) -> u32 {
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
    grid.place(problem, task, placement);
    counts.total(weights)
}

/// The best slot whose penalty is strictly below `current_penalty`, with
/// the task removed from the grid. Candidates are capped per day.
fn best_improving_slot(
    problem: &Problem,
    grid: &Grid,
    task: &Task,
    current_penalty: u32,
    weights: &PenaltyWeights,
    limits: LoadLimits,
    per_day_cap: usize,
) -> Option<Placement> {
    let mut best: Option<(u32, Placement)> = None;
    for day in problem.days() {
        let starts: Vec<Period> = if task.is_double {
            problem.valid_double_starts.iter().copied().take(per_day_cap).collect()
        } else {
            (1..=problem.periods_per_day).take(per_day_cap).collect()
        };
        for period in starts {
            let counts =
                assess_placement(problem, grid, task.lesson, day, period, task.is_double, limits);
            let penalty = counts.total(weights);
            if penalty >= current_penalty {
                continue;
            }
            let better = match best {
                Some((best_penalty, _)) => penalty < best_penalty,
                None => true,
            };
            if better {
                best = Some((penalty, Placement { day, period }));
            }
        }
    }
    best.map(|(_, placement)| placement)
}

/// First placed task, other than the excluded ones, that would collide with
/// `mover` sitting at `slot` (shared teacher or class on an overlapping
/// period).
fn occupant_at(
    problem: &Problem,
    tasks: &[Task],
    grid: &Grid,
    mover: &Task,
    slot: Placement,
    excluded: &[TaskId],
) -> Option<TaskId> {
    let mover_lesson = problem.lesson(mover.lesson);
    for other in tasks {
        if excluded.contains(&other.task_id) {
            continue;
        }
        let Some(other_slot) = grid.placement(other.task_id) else {
            continue;
        };
        if other_slot.day != slot.day {
            continue;
        }
        if !periods_overlap(
            slot.periods(mover.is_double),
            other_slot.periods(other.is_double),
        ) {
            continue;
        }
        let other_lesson = problem.lesson(other.lesson);
        let shares = mover_lesson
            .teachers
            .iter()
            .any(|teacher| other_lesson.teachers.contains(teacher))
            || mover_lesson
                .classes
                .iter()
                .any(|class| other_lesson.classes.contains(class));
        if shares {
            return Some(other.task_id);
        }
    }
    None
}

/// Bounded-depth chain swap: pick a neighbour B of the conflicting task A,
/// move B somewhere strictly better, and slide A into B's slot. If B's
/// better slot is occupied by C, try to move C out first (one level of
/// lookahead, no deeper).
fn chain_swap(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    settings: &SolverSettings,
    limits: LoadLimits,
    rng: &mut fastrand::Rng,
    target: TaskId,
) -> Option<Move> {
    let weights = &settings.weights;
    let a = &tasks[target.raw_index()];
    let a_slot = grid.placement(target)?;
    let a_lesson = problem.lesson(a.lesson);

    let mut overlapping = Vec::new();
    for other in tasks {
        if other.task_id == target {
            continue;
        }
        let Some(other_slot) = grid.placement(other.task_id) else {
            continue;
        };
        if other_slot.day != a_slot.day
            || !periods_overlap(
                a_slot.periods(a.is_double),
                other_slot.periods(other.is_double),
            )
        {
            continue;
        }
        let other_lesson = problem.lesson(other.lesson);
        let shares = a_lesson
            .teachers
            .iter()
            .any(|teacher| other_lesson.teachers.contains(teacher))
            || a_lesson
                .classes
                .iter()
                .any(|class| other_lesson.classes.contains(class));
        if shares {
            overlapping.push(other.task_id);
            if overlapping.len() >= settings.chain_search_limit {
                break;
            }
        }
    }
    if overlapping.is_empty() {
        return None;
    }

    let b_id = overlapping[rng.usize(0..overlapping.len())];
    let b = &tasks[b_id.raw_index()];
    let b_slot = grid.placement(b_id)?;
    if !slot_legal_for(problem, a, b_slot) {
        return None;
    }

    let b_penalty = placed_penalty(problem, tasks, grid, weights, limits, b_id);
    let b_removed = grid.remove(problem, b);
    let b_target = best_improving_slot(problem, grid, b, b_penalty, weights, limits, 20);
    grid.place(problem, b, b_removed);
    let b_target = b_target?;

    match occupant_at(problem, tasks, grid, b, b_target, &[target, b_id]) {
        None => Some(Move::Chain(vec![
            Move::Relocate {
                task: b_id,
                from: b_slot,
                to: b_target,
            },
            Move::Relocate {
                task: target,
                from: a_slot,
                to: b_slot,
            },
        ])),
        Some(c_id) => {
            let c = &tasks[c_id.raw_index()];
            let c_slot = grid.placement(c_id)?;
            let c_penalty = placed_penalty(problem, tasks, grid, weights, limits, c_id);
            let c_removed = grid.remove(problem, c);
            let c_target = best_improving_slot(problem, grid, c, c_penalty, weights, limits, 20);
            grid.place(problem, c, c_removed);
            let c_target = c_target?;

            Some(Move::Chain(vec![
                Move::Relocate {
                    task: c_id,
                    from: c_slot,
                    to: c_target,
                },
                Move::Relocate {
                    task: b_id,
                    from: b_slot,
                    to: b_target,
                },
                Move::Relocate {
                    task: target,
                    from: a_slot,
                    to: b_slot,
                },
            ]))
        }
    }
}

/// Random relocation (0.7) or pairwise swap of two same-kind tasks (0.3).
fn simple_move(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    settings: &SolverSettings,
    limits: LoadLimits,
    rng: &mut fastrand::Rng,
    target: TaskId,
) -> Option<Move> {
    let task = &tasks[target.raw_index()];
    let from = grid.placement(target)?;

    if rng.f64() < 0.7 {
        grid.remove(problem, task);
        let choice = select_slot(problem, grid, task, &settings.weights, limits, rng);
        grid.place(problem, task, from);
        Some(Move::Relocate {
            task: target,
            from,
            to: choice.placement,
        })
    } else {
        let other_id = TaskId::from_index(rng.usize(0..tasks.len()));
        if other_id == target {
            return None;
        }
        let other = &tasks[other_id.raw_index()];
        if other.is_double != task.is_double {
            return None;
        }
        let other_slot = grid.placement(other_id)?;
        Some(Move::Exchange {
            first: target,
            second: other_id,
            first_slot: from,
            second_slot: other_slot,
        })
    }
}

/// Keep the lowest-penalty half of the currently clean tasks in place and
/// re-place everything else in random order via the minimum-score rule.
fn strategic_shuffle(
    problem: &Problem,
    tasks: &[Task],
    grid: &mut Grid,
    conflicts: &[u32],
    weights: &PenaltyWeights,
    limits: LoadLimits,
    rng: &mut fastrand::Rng,
) {
    let mut clean: Vec<(u32, TaskId)> = tasks
        .iter()
        .filter(|task| conflicts[task.task_id.raw_index()] == 0)
        .map(|task| {
            (
                placed_penalty(problem, tasks, grid, weights, limits, task.task_id),
                task.task_id,
            )
        })
        .collect();
    clean.sort_unstable();

    let mut keep = BitSet::with_capacity(tasks.len());
    for &(_, task_id) in clean.iter().take(clean.len() / 2) {
        keep.insert(task_id.raw_index());
    }

    let mut displaced: Vec<TaskId> = tasks
        .iter()
        .map(|task| task.task_id)
        .filter(|task_id| !keep.contains(task_id.raw_index()))
        .collect();
    for &task_id in &displaced {
        grid.remove(problem, &tasks[task_id.raw_index()]);
    }
    rng.shuffle(&mut displaced);
    for &task_id in &displaced {
        let task = &tasks[task_id.raw_index()];
        let choice = select_slot(problem, grid, task, weights, limits, rng);
        grid.place(problem, task, choice.placement);
    }

    debug!(
        kept = keep.len(),
        replaced = displaced.len(),
        "strategic shuffle"
    );
}
