use std::collections::HashMap;

use crate::input::{SolverInput, ValidationError};

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(u16);

        impl $name {
            pub fn from_index(index: usize) -> Self {
                debug_assert!(index <= u16::MAX as usize);
                $name(index as u16)
            }

            pub fn raw_index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

dense_id!(TeacherId);
dense_id!(ClassId);
dense_id!(LessonId);
dense_id!(SubjectId);
dense_id!(DayId);
dense_id!(TaskId);

/// A timetable period, 1-based in `1..=periods_per_day`.
pub type Period = u8;

#[derive(Debug, Clone)]
pub struct CompiledClass {
    pub id: String,
    pub name: String,
    pub grade: u8,
}

/// A lesson with its resource block resolved to dense ids. Placing any
/// instance of the lesson occupies every teacher and every class at once.
#[derive(Debug, Clone)]
pub struct CompiledLesson {
    pub id: String,
    pub name: String,
    pub teachers: Box<[TeacherId]>,
    pub classes: Box<[ClassId]>,
    pub subjects: Box<[SubjectId]>,
    pub singles: u32,
    pub doubles: u32,
}

impl CompiledLesson {
    pub fn required_periods(&self) -> u32 {
        self.singles + 2 * self.doubles
    }

    pub fn shares_subject_with(&self, other: &CompiledLesson) -> bool {
        self.subjects
            .iter()
            .any(|subject| other.subjects.contains(subject))
    }
}

/// The read-only compiled form of a [`SolverInput`]: string ids interned to
/// dense indices, day list and interval boundaries resolved, and the legal
/// double-start periods precomputed.
#[derive(Debug)]
pub struct Problem {
    pub periods_per_day: Period,
    pub day_names: Vec<String>,
    pub interval_boundaries: Vec<Period>,
    pub valid_double_starts: Vec<Period>,

    pub classes: Vec<CompiledClass>,
    pub lessons: Vec<CompiledLesson>,
    /// Teacher ids as given by the host, in first-seen order.
    pub teacher_ids: Vec<String>,
    pub subject_ids: Vec<String>,
}

impl Problem {
    pub fn compile(input: &SolverInput) -> Result<Problem, ValidationError> {
        let periods_per_day = input.config.periods_per_day;
        if periods_per_day == 0 {
            return Err(ValidationError::NoPeriods);
        }
        if input.config.days_of_week.is_empty() {
            return Err(ValidationError::NoDays);
        }

        let mut seen_days: HashMap<&str, ()> = HashMap::new();
        for day in &input.config.days_of_week {
            if seen_days.insert(day, ()).is_some() {
                return Err(ValidationError::DuplicateDay { name: day.clone() });
            }
        }

        let mut interval_boundaries = input.config.interval_boundaries.clone();
        interval_boundaries.sort_unstable();
        interval_boundaries.dedup();
        for &boundary in &interval_boundaries {
            if boundary == 0 || boundary >= periods_per_day {
                return Err(ValidationError::IntervalBoundaryOutOfRange {
                    value: boundary,
                    max: periods_per_day.saturating_sub(1),
                });
            }
        }

        let valid_double_starts: Vec<Period> = (1..periods_per_day)
            .filter(|period| !interval_boundaries.contains(period))
            .collect();

        let mut class_index: HashMap<&str, ClassId> = HashMap::new();
        let mut classes = Vec::with_capacity(input.classes.len());
        for class in &input.classes {
            if class_index.contains_key(class.id.as_str()) {
                return Err(ValidationError::DuplicateClassId {
                    id: class.id.clone(),
                });
            }
            class_index.insert(&class.id, ClassId::from_index(classes.len()));
            classes.push(CompiledClass {
                id: class.id.clone(),
                name: class.name.clone(),
                grade: class.grade,
            });
        }

        let mut teacher_index: HashMap<&str, TeacherId> = HashMap::new();
        let mut teacher_ids: Vec<String> = Vec::new();
        let mut subject_index: HashMap<&str, SubjectId> = HashMap::new();
        let mut subject_ids: Vec<String> = Vec::new();
        let mut lesson_index: HashMap<&str, ()> = HashMap::new();

        let mut lessons = Vec::with_capacity(input.lessons.len());
        for lesson in &input.lessons {
            if lesson_index.insert(&lesson.id, ()).is_some() {
                return Err(ValidationError::DuplicateLessonId {
                    id: lesson.id.clone(),
                });
            }
            if lesson.teacher_ids.is_empty() {
                return Err(ValidationError::EmptyTeacherSet {
                    lesson: lesson.id.clone(),
                });
            }
            if lesson.class_ids.is_empty() {
                return Err(ValidationError::EmptyClassSet {
                    lesson: lesson.id.clone(),
                });
            }
            if lesson.doubles > 0 && valid_double_starts.is_empty() {
                return Err(ValidationError::NoLegalDoubleStart {
                    lesson: lesson.id.clone(),
                });
            }

            let mut teachers = Vec::with_capacity(lesson.teacher_ids.len());
            for teacher in &lesson.teacher_ids {
                let id = *teacher_index.entry(teacher).or_insert_with(|| {
                    teacher_ids.push(teacher.clone());
                    TeacherId::from_index(teacher_ids.len() - 1)
                });
                if !teachers.contains(&id) {
                    teachers.push(id);
                }
            }

            let mut lesson_classes = Vec::with_capacity(lesson.class_ids.len());
            for class in &lesson.class_ids {
                let id = *class_index.get(class.as_str()).ok_or_else(|| {
                    ValidationError::UnknownClass {
                        lesson: lesson.id.clone(),
                        class_id: class.clone(),
                    }
                })?;
                if !lesson_classes.contains(&id) {
                    lesson_classes.push(id);
                }
            }

            let mut subjects = Vec::with_capacity(lesson.subject_ids.len());
            for subject in &lesson.subject_ids {
                let id = *subject_index.entry(subject).or_insert_with(|| {
                    subject_ids.push(subject.clone());
                    SubjectId::from_index(subject_ids.len() - 1)
                });
                if !subjects.contains(&id) {
                    subjects.push(id);
                }
            }

            lessons.push(CompiledLesson {
                id: lesson.id.clone(),
                name: lesson.name.clone(),
                teachers: teachers.into_boxed_slice(),
                classes: lesson_classes.into_boxed_slice(),
                subjects: subjects.into_boxed_slice(),
                singles: lesson.singles,
                doubles: lesson.doubles,
            });
        }

        Ok(Problem {
            periods_per_day,
            day_names: input.config.days_of_week.clone(),
            interval_boundaries,
            valid_double_starts,
            classes,
            lessons,
            teacher_ids,
            subject_ids,
        })
    }

    pub fn num_days(&self) -> usize {
        self.day_names.len()
    }

    pub fn days(&self) -> impl Iterator<Item = DayId> {
        (0..self.num_days()).map(DayId::from_index)
    }

    pub fn is_interval_boundary(&self, period: Period) -> bool {
        self.interval_boundaries.contains(&period)
    }

    pub fn lesson(&self, id: LessonId) -> &CompiledLesson {
        &self.lessons[id.raw_index()]
    }

    pub fn day_name(&self, day: DayId) -> &str {
        &self.day_names[day.raw_index()]
    }

    /// Weekly capacity of a single class column: every period of every day.
    pub fn class_week_capacity(&self) -> u32 {
        self.num_days() as u32 * self.periods_per_day as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Lesson, SchoolClass, TimetableConfig};

    fn minimal_input() -> SolverInput {
        SolverInput {
            lessons: vec![Lesson {
                id: "l1".into(),
                name: "Maths 7A".into(),
                subject_ids: vec!["maths".into()],
                teacher_ids: vec!["t1".into()],
                class_ids: vec!["c1".into()],
                singles: 2,
                doubles: 1,
                color: None,
            }],
            classes: vec![SchoolClass {
                id: "c1".into(),
                name: "7A".into(),
                grade: 7,
            }],
            config: TimetableConfig {
                periods_per_day: 6,
                days_of_week: vec!["Mon".into(), "Tue".into()],
                interval_boundaries: vec![3],
            },
        }
    }

    #[test]
    fn compiles_and_precomputes_double_starts() {
        let problem = Problem::compile(&minimal_input()).unwrap();
        assert_eq!(problem.valid_double_starts, vec![1, 2, 4, 5]);
        assert_eq!(problem.lessons[0].required_periods(), 4);
        assert!(problem.is_interval_boundary(3));
        assert!(!problem.is_interval_boundary(4));
    }

    #[test]
    fn rejects_out_of_range_boundary() {
        let mut input = minimal_input();
        input.config.interval_boundaries = vec![6];
        assert!(matches!(
            Problem::compile(&input),
            Err(ValidationError::IntervalBoundaryOutOfRange { value: 6, .. })
        ));
    }

    #[test]
    fn rejects_unknown_class_reference() {
        let mut input = minimal_input();
        input.lessons[0].class_ids = vec!["c9".into()];
        assert!(matches!(
            Problem::compile(&input),
            Err(ValidationError::UnknownClass { .. })
        ));
    }

    #[test]
    fn rejects_double_without_legal_start() {
        let mut input = minimal_input();
        input.config.periods_per_day = 1;
        input.config.interval_boundaries = vec![];
        assert!(matches!(
            Problem::compile(&input),
            Err(ValidationError::NoLegalDoubleStart { .. })
        ));
    }

    #[test]
    fn dedupes_resource_sets() {
        let mut input = minimal_input();
        input.lessons[0].teacher_ids = vec!["t1".into(), "t1".into(), "t2".into()];
        let problem = Problem::compile(&input).unwrap();
        assert_eq!(problem.lessons[0].teachers.len(), 2);
        assert_eq!(problem.teacher_ids, vec!["t1".to_string(), "t2".to_string()]);
    }
}
