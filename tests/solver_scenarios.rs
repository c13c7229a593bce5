use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;

use timetable_solver::{
    solve, solve_with_cancellation, Lesson, SchoolClass, SolveResult, SolverInput, SolverSettings,
    TimetableConfig,
};

fn lesson(
    id: &str,
    teachers: &[&str],
    classes: &[&str],
    singles: u32,
    doubles: u32,
) -> Lesson {
    Lesson {
        id: id.into(),
        name: id.into(),
        subject_ids: vec![],
        teacher_ids: teachers.iter().map(|t| t.to_string()).collect(),
        class_ids: classes.iter().map(|c| c.to_string()).collect(),
        singles,
        doubles,
        color: None,
    }
}

fn school_class(id: &str) -> SchoolClass {
    SchoolClass {
        id: id.into(),
        name: id.to_uppercase(),
        grade: 7,
    }
}

fn config(periods_per_day: u8, days: &[&str], boundaries: &[u8]) -> TimetableConfig {
    TimetableConfig {
        periods_per_day,
        days_of_week: days.iter().map(|d| d.to_string()).collect(),
        interval_boundaries: boundaries.to_vec(),
    }
}

/// The invariants every solve result must satisfy, success or not.
fn assert_universal_invariants(input: &SolverInput, result: &SolveResult) {
    let lessons: HashMap<&str, &Lesson> = input
        .lessons
        .iter()
        .map(|lesson| (lesson.id.as_str(), lesson))
        .collect();
    let days: HashSet<&str> = input
        .config
        .days_of_week
        .iter()
        .map(String::as_str)
        .collect();

    for slot in &result.slots {
        let lesson = lessons
            .get(slot.lesson_id.as_str())
            .expect("slot references a known lesson");
        assert!(
            lesson.class_ids.contains(&slot.class_id),
            "slot class {} is not in lesson {}'s class set",
            slot.class_id,
            slot.lesson_id
        );
        assert!(days.contains(slot.day.as_str()), "unknown day {}", slot.day);
        assert!(slot.period >= 1 && slot.period <= input.config.periods_per_day);
        assert!(!(slot.is_double_start && slot.is_double_end));

        if slot.is_double_start {
            assert!(
                !input.config.interval_boundaries.contains(&slot.period),
                "double starts on interval boundary {}",
                slot.period
            );
            assert!(
                result.slots.iter().any(|other| other.is_double_end
                    && other.class_id == slot.class_id
                    && other.lesson_id == slot.lesson_id
                    && other.day == slot.day
                    && other.period == slot.period + 1),
                "double start at period {} has no matching end",
                slot.period
            );
        }
    }

    if result.success {
        assert!(result.failed_lessons.is_empty());
        assert_eq!(result.stats.conflicts_remaining, 0);

        let mut teacher_cells: HashMap<(&str, &str, u8), u32> = HashMap::new();
        let mut class_cells: HashMap<(&str, &str, u8), u32> = HashMap::new();
        let mut instances: HashMap<(&str, &str), u32> = HashMap::new();
        for slot in &result.slots {
            let lesson = lessons[slot.lesson_id.as_str()];
            *class_cells
                .entry((slot.class_id.as_str(), slot.day.as_str(), slot.period))
                .or_default() += 1;
            // Count each occupied period once per lesson instance, not per
            // class column, before crossing it with the teacher set.
            if slot.class_id == lesson.class_ids[0] {
                for teacher in &lesson.teacher_ids {
                    *teacher_cells
                        .entry((teacher.as_str(), slot.day.as_str(), slot.period))
                        .or_default() += 1;
                }
            }
            if !slot.is_double_end {
                *instances
                    .entry((slot.lesson_id.as_str(), slot.class_id.as_str()))
                    .or_default() += 1;
            }
        }
        assert!(
            teacher_cells.values().all(|&count| count <= 1),
            "teacher double-booked under success=true"
        );
        assert!(
            class_cells.values().all(|&count| count <= 1),
            "class cell double-booked under success=true"
        );
        for lesson in &input.lessons {
            for class in &lesson.class_ids {
                assert_eq!(
                    instances
                        .get(&(lesson.id.as_str(), class.as_str()))
                        .copied()
                        .unwrap_or(0),
                    lesson.singles + lesson.doubles,
                    "lesson {} has the wrong instance count for class {}",
                    lesson.id,
                    class
                );
            }
        }
    } else {
        assert!(!result.failed_lessons.is_empty());
        assert!(result.stats.conflicts_remaining > 0);
    }
}

#[test]
fn s1_trivial_feasible_week() {
    let input = SolverInput {
        lessons: vec![lesson("maths", &["t1"], &["c1"], 3, 0)],
        classes: vec![school_class("c1")],
        config: config(5, &["Mon"], &[]),
    };
    let settings = SolverSettings {
        max_iterations: 100_000,
        ..SolverSettings::default()
    };
    let result = solve(&input, &settings).unwrap();
    assert_universal_invariants(&input, &result);

    assert!(result.success);
    assert_eq!(result.slots.len(), 3);
    let mut periods = HashSet::new();
    for slot in &result.slots {
        assert_eq!(slot.day, "Mon");
        assert!(!slot.is_double_start && !slot.is_double_end);
        assert!(periods.insert(slot.period));
    }
}

#[test]
fn s2_double_respects_interval_boundary() {
    let input = SolverInput {
        lessons: vec![lesson("science", &["t1"], &["c1"], 0, 1)],
        classes: vec![school_class("c1")],
        config: config(4, &["Mon"], &[2]),
    };
    let result = solve(&input, &SolverSettings::default()).unwrap();
    assert_universal_invariants(&input, &result);

    assert!(result.success);
    assert_eq!(result.slots.len(), 2);
    let start = result
        .slots
        .iter()
        .find(|slot| slot.is_double_start)
        .expect("a double-start record");
    assert!(start.period == 1 || start.period == 3);
}

#[test]
fn s3_hard_teacher_conflict_is_reported() {
    let input = SolverInput {
        lessons: vec![
            lesson("maths", &["t1"], &["c1"], 5, 0),
            lesson("english", &["t1"], &["c2"], 5, 0),
        ],
        classes: vec![school_class("c1"), school_class("c2")],
        config: config(5, &["Mon"], &[]),
    };
    let settings = SolverSettings {
        max_iterations: 20_000,
        ..SolverSettings::default()
    };
    let result = solve(&input, &settings).unwrap();
    assert_universal_invariants(&input, &result);

    assert!(!result.success);
    // Both lessons blame the teacher dimension.
    assert_eq!(result.failed_lessons.len(), 2);
    for failed in &result.failed_lessons {
        assert!(failed.detailed_conflicts.teacher_busy_count > 0);
        assert_eq!(failed.required_periods, 5);
    }
    // Ten periods of teaching fit into five cells for one teacher: at
    // least five overlap positions survive no matter how the instances
    // are arranged.
    assert_eq!(result.slots.len(), 10);
    let mut teacher_periods: HashMap<u8, u32> = HashMap::new();
    for slot in &result.slots {
        *teacher_periods.entry(slot.period).or_default() += 1;
    }
    let overlaps: u32 = teacher_periods.values().map(|&count| count - 1).sum();
    assert!(overlaps >= 5);
}

#[test]
fn s4_multi_class_resource_block_moves_atomically() {
    let input = SolverInput {
        lessons: vec![lesson("assembly", &["t1", "t2"], &["c1", "c2", "c3"], 1, 0)],
        classes: vec![school_class("c1"), school_class("c2"), school_class("c3")],
        config: config(7, &["Mon", "Tue", "Wed", "Thu", "Fri"], &[]),
    };
    let result = solve(&input, &SolverSettings::default()).unwrap();
    assert_universal_invariants(&input, &result);

    assert!(result.success);
    assert_eq!(result.slots.len(), 3);
    let coords: HashSet<(&str, u8)> = result
        .slots
        .iter()
        .map(|slot| (slot.day.as_str(), slot.period))
        .collect();
    assert_eq!(coords.len(), 1, "all classes share one (day, period)");
    let classes: HashSet<&str> = result
        .slots
        .iter()
        .map(|slot| slot.class_id.as_str())
        .collect();
    assert_eq!(classes.len(), 3);
}

#[test]
fn s5_fixed_seed_runs_are_byte_identical() {
    let input = SolverInput {
        lessons: vec![
            lesson("maths", &["t1"], &["c1"], 2, 0),
            lesson("english", &["t1"], &["c2"], 2, 0),
        ],
        classes: vec![school_class("c1"), school_class("c2")],
        config: config(2, &["Mon"], &[]),
    };
    let settings = SolverSettings {
        max_iterations: 5_000,
        seed: 42,
        ..SolverSettings::default()
    };

    let first = solve(&input, &settings).unwrap();
    let second = solve(&input, &settings).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn s6_cancellation_returns_a_well_formed_partial_result() {
    let input = SolverInput {
        lessons: vec![
            lesson("maths", &["t1"], &["c1"], 2, 0),
            lesson("english", &["t1"], &["c2"], 2, 0),
        ],
        classes: vec![school_class("c1"), school_class("c2")],
        config: config(2, &["Mon"], &[]),
    };
    let settings = SolverSettings {
        max_iterations: 300_000,
        ..SolverSettings::default()
    };
    let cancel = AtomicBool::new(true);
    let result = solve_with_cancellation(&input, &settings, &cancel).unwrap();
    assert_universal_invariants(&input, &result);

    assert_eq!(result.stats.iterations, 100_000);
    assert!(!result.success);
    assert!(result.stats.conflicts_remaining > 0);
    assert_eq!(result.slots.len() as u64, result.stats.total_slots);
}

#[test]
fn repair_never_worsens_the_initial_grid() {
    let input = SolverInput {
        lessons: vec![
            lesson("maths", &["t1"], &["c1"], 3, 1),
            lesson("english", &["t2"], &["c1"], 2, 0),
            lesson("sport", &["t1", "t2"], &["c1", "c2"], 1, 1),
        ],
        classes: vec![school_class("c1"), school_class("c2")],
        config: config(6, &["Mon", "Tue", "Wed"], &[3]),
    };
    let skip_repair = SolverSettings {
        max_iterations: 0,
        ..SolverSettings::default()
    };
    let with_repair = SolverSettings {
        max_iterations: 10_000,
        ..SolverSettings::default()
    };

    let initial = solve(&input, &skip_repair).unwrap();
    let repaired = solve(&input, &with_repair).unwrap();
    assert_universal_invariants(&input, &repaired);
    assert!(repaired.stats.conflicts_remaining <= initial.stats.conflicts_remaining);
}

#[test]
fn structural_overload_warns_but_still_solves() {
    let input = SolverInput {
        lessons: vec![lesson("marathon", &["t1"], &["c1"], 36, 0)],
        classes: vec![school_class("c1")],
        config: config(8, &["Mon", "Tue", "Wed", "Thu", "Fri"], &[]),
    };
    let settings = SolverSettings {
        max_iterations: 2_000,
        ..SolverSettings::default()
    };
    let result = solve(&input, &settings).unwrap();
    assert_universal_invariants(&input, &result);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].required_periods, 36);
    assert_eq!(result.stats.total_slots, 36);
}

#[test]
fn malformed_input_is_rejected_before_solving() {
    let bad_boundary = SolverInput {
        lessons: vec![lesson("maths", &["t1"], &["c1"], 1, 0)],
        classes: vec![school_class("c1")],
        config: config(5, &["Mon"], &[5]),
    };
    assert!(solve(&bad_boundary, &SolverSettings::default()).is_err());

    let unknown_class = SolverInput {
        lessons: vec![lesson("maths", &["t1"], &["zz"], 1, 0)],
        classes: vec![school_class("c1")],
        config: config(5, &["Mon"], &[]),
    };
    assert!(solve(&unknown_class, &SolverSettings::default()).is_err());
}
