use crate::grid::Grid;
use crate::problem::{DayId, LessonId, Period, Problem};
use crate::task::Placement;
use crate::weights::{PenaltyCount, PenaltyKind, PenaltyWeights};

/// Soft load ceilings used by the overload dimensions.
#[derive(Debug, Clone, Copy)]
pub struct LoadLimits {
    pub daily: u16,
    pub weekly: u16,
}

impl Default for LoadLimits {
    fn default() -> Self {
        LoadLimits {
            daily: 7,
            weekly: 35,
        }
    }
}

/// One conflict unit per this much penalty; the repair loop steers on the
/// rounded-up quotient.
pub const CONFLICT_UNIT: u32 = 100;

pub fn conflict_count(penalty: u32) -> u32 {
    penalty.div_ceil(CONFLICT_UNIT)
}

/// Score a hypothetical placement against the current index. The task being
/// assessed must not be placed while this runs; callers remove it first.
/// Pure over its inputs: no grid mutation, no randomness.
pub fn assess_placement(
    problem: &Problem,
    grid: &Grid,
    lesson_id: LessonId,
    day: DayId,
    period: Period,
    is_double: bool,
    limits: LoadLimits,
) -> PenaltyCount {
    let lesson = problem.lesson(lesson_id);
    let placement = Placement { day, period };
    let mut counts = PenaltyCount::new();

    for p in placement.periods(is_double) {
        for &teacher in lesson.teachers.iter() {
            if grid.teacher_busy(teacher, day, p) {
                counts.add(PenaltyKind::TeacherOverlap, 1);
            }
        }
        for &class in lesson.classes.iter() {
            counts.add(PenaltyKind::ClassOverlap, grid.records(class, day, p).len() as u32);
        }
    }

    if is_double && problem.is_interval_boundary(period) {
        counts.add(PenaltyKind::IntervalViolation, 1);
    }

    for &teacher in lesson.teachers.iter() {
        counts.add(PenaltyKind::TeacherGap, teacher_gap(problem, grid, teacher, placement, is_double));
    }

    for &class in lesson.classes.iter() {
        let shared = same_subject_periods(problem, grid, class, day, lesson_id);
        if shared >= 3 {
            counts.add(PenaltyKind::SubjectImbalance, shared - 2);
        }
    }

    let span = Placement::span(is_double);
    for &teacher in lesson.teachers.iter() {
        let day_load = grid.teacher_day_load(teacher, day) + span;
        if day_load >= limits.daily {
            counts.add(PenaltyKind::DailyOverload, (day_load - limits.daily + 1) as u32);
        }
        let week_load = grid.teacher_week_load(teacher) + span;
        if week_load >= limits.weekly {
            counts.add(PenaltyKind::WeeklyOverload, (week_load - limits.weekly + 1) as u32);
        }
    }

    counts
}

/// Idle periods trapped inside a teacher's day, counting the hypothetical
/// placement as occupied: span length minus occupied count.
fn teacher_gap(
    problem: &Problem,
    grid: &Grid,
    teacher: crate::problem::TeacherId,
    placement: Placement,
    is_double: bool,
) -> u32 {
    let hypothetical = placement.periods(is_double);
    let mut first = None;
    let mut last = 0;
    let mut occupied = 0u32;

    for p in 1..=problem.periods_per_day {
        if grid.teacher_busy(teacher, placement.day, p) || hypothetical.contains(&p) {
            if first.is_none() {
                first = Some(p);
            }
            last = p;
            occupied += 1;
        }
    }

    match first {
        Some(first) => (last - first + 1) as u32 - occupied,
        None => 0,
    }
}

/// How many periods of the class's day already hold a lesson sharing a
/// subject with the given lesson.
fn same_subject_periods(
    problem: &Problem,
    grid: &Grid,
    class: crate::problem::ClassId,
    day: DayId,
    lesson_id: LessonId,
) -> u32 {
    let lesson = problem.lesson(lesson_id);
    let mut shared = 0;
    for p in 1..=problem.periods_per_day {
        let has_shared_subject = grid
            .records(class, day, p)
            .iter()
            .any(|record| problem.lesson(record.lesson).shares_subject_with(lesson));
        if has_shared_subject {
            shared += 1;
        }
    }
    shared
}
