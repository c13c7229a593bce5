use std::sync::atomic::AtomicBool;

use tracing::info;

use crate::grid::Grid;
use crate::input::{SolverInput, ValidationError};
use crate::output::{serialize_grid, SolveResult, SolveStats};
use crate::penalty::LoadLimits;
use crate::placement::greedy_initialize;
use crate::precheck::check_problem;
use crate::problem::Problem;
use crate::repair::{recompute_conflicts, repair};
use crate::report::build_report;
use crate::task::{difficulty_order, expand_tasks};
use crate::weights::PenaltyWeights;

/// What to do when the Metropolis test rejects a move. The original
/// implementation left the mutation in the grid and only withheld the
/// baseline update; `Revert` undoes the mutation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectPolicy {
    #[default]
    Revert,
    KeepGrid,
}

/// Call-site tunables. Every constant of the solve is here, including the
/// PRNG seed, so runs are reproducible by construction.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub max_iterations: u64,
    pub daily_limit: u16,
    pub weekly_limit: u16,
    pub weights: PenaltyWeights,
    pub cooling_rate: f64,
    pub reheat_temperature: f64,
    pub stagnation_threshold: u64,
    pub shuffle_threshold: u64,
    pub chain_search_limit: usize,
    pub priority_keywords: Vec<String>,
    pub seed: u64,
    pub reject_policy: RejectPolicy,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 1_000_000,
            daily_limit: 7,
            weekly_limit: 35,
            weights: PenaltyWeights::default(),
            cooling_rate: 1e-6,
            reheat_temperature: 0.8,
            stagnation_threshold: 50_000,
            shuffle_threshold: 200_000,
            chain_search_limit: 20,
            priority_keywords: ["ITT", "B1", "AESTHETIC", "COMBINED"]
                .into_iter()
                .map(String::from)
                .collect(),
            seed: 4,
            reject_policy: RejectPolicy::default(),
        }
    }
}

impl SolverSettings {
    pub fn load_limits(&self) -> LoadLimits {
        LoadLimits {
            daily: self.daily_limit,
            weekly: self.weekly_limit,
        }
    }
}

pub fn solve(input: &SolverInput, settings: &SolverSettings) -> Result<SolveResult, ValidationError> {
    solve_with_cancellation(input, settings, &AtomicBool::new(false))
}

/// Run one full solve: validate and compile, pre-check feasibility, place
/// greedily, repair stochastically, then report and flatten. All mutable
/// state lives in this call; concurrent solves just use separate settings.
///
/// The cancellation flag is observed every [`crate::repair::PROGRESS_TICK`]
/// iterations; a cancelled solve still returns a well-formed result.
pub fn solve_with_cancellation(
    input: &SolverInput,
    settings: &SolverSettings,
    cancel: &AtomicBool,
) -> Result<SolveResult, ValidationError> {
    let problem = Problem::compile(input)?;
    let limits = settings.load_limits();
    info!(
        lessons = problem.lessons.len(),
        classes = problem.classes.len(),
        teachers = problem.teacher_ids.len(),
        days = problem.num_days(),
        periods_per_day = problem.periods_per_day,
        seed = settings.seed,
        "starting solve"
    );

    let warnings = check_problem(&problem, limits);

    let tasks = expand_tasks(&problem);
    let order = difficulty_order(&problem, &tasks, &settings.priority_keywords);
    let mut grid = Grid::new(&problem, tasks.len());
    let mut rng = fastrand::Rng::with_seed(settings.seed);

    let mut conflicts = greedy_initialize(
        &problem,
        &tasks,
        &order,
        &mut grid,
        &settings.weights,
        limits,
        &mut rng,
    );
    recompute_conflicts(
        &problem,
        &tasks,
        &mut grid,
        &settings.weights,
        limits,
        &mut conflicts,
    );

    let repair_stats = repair(
        &problem,
        &tasks,
        &mut grid,
        &mut conflicts,
        settings,
        cancel,
        &mut rng,
    );

    let failed_lessons = build_report(
        &problem,
        &tasks,
        &mut grid,
        &conflicts,
        &settings.weights,
        limits,
    );
    let slots = serialize_grid(&problem, &tasks, &grid);

    let conflicts_remaining: u64 = conflicts.iter().map(|&count| count as u64).sum();
    let stats = SolveStats {
        total_slots: slots.len() as u64,
        scheduled_lessons: (problem.lessons.len() - failed_lessons.len()) as u64,
        failed_lessons: failed_lessons.len() as u64,
        swap_attempts: repair_stats.swap_attempts,
        successful_swaps: repair_stats.successful_swaps,
        iterations: repair_stats.iterations,
        conflicts_remaining,
    };
    info!(
        success = conflicts_remaining == 0,
        conflicts_remaining,
        iterations = stats.iterations,
        cancelled = repair_stats.cancelled,
        "solve finished"
    );

    Ok(SolveResult {
        success: conflicts_remaining == 0,
        slots,
        failed_lessons,
        warnings,
        stats,
    })
}
