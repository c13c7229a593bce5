use std::ops::Range;

use crate::problem::{DayId, LessonId, Period, Problem, TaskId};

/// An atomic placement unit: one single or one double period of a lesson.
/// A lesson with `s` singles and `d` doubles expands into `s + d` tasks.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub task_id: TaskId,
    pub lesson: LessonId,
    pub is_double: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Placement {
    pub day: DayId,
    pub period: Period,
}

impl Placement {
    /// The periods occupied by a task at this placement, in grid order.
    pub fn periods(self, is_double: bool) -> Range<Period> {
        let span = if is_double { 2 } else { 1 };
        self.period..self.period + span
    }

    pub fn span(is_double: bool) -> u16 {
        if is_double {
            2
        } else {
            1
        }
    }
}

/// Expand every lesson into its task instances. Task ids are assigned in
/// expansion order (all singles of a lesson, then its doubles) and stay
/// stable for the whole solve.
pub fn expand_tasks(problem: &Problem) -> Vec<Task> {
    let mut tasks = Vec::new();
    for (lesson_index, lesson) in problem.lessons.iter().enumerate() {
        let lesson_id = LessonId::from_index(lesson_index);
        for _ in 0..lesson.singles {
            tasks.push(Task {
                task_id: TaskId::from_index(tasks.len()),
                lesson: lesson_id,
                is_double: false,
            });
        }
        for _ in 0..lesson.doubles {
            tasks.push(Task {
                task_id: TaskId::from_index(tasks.len()),
                lesson: lesson_id,
                is_double: true,
            });
        }
    }
    tasks
}

/// Order tasks hardest-first. The key mirrors how tightly a task couples
/// resources: block size, then a bonus for lessons whose name matches a
/// priority keyword, then the remaining tie-breakers, then the stable id.
pub fn difficulty_order(problem: &Problem, tasks: &[Task], keywords: &[String]) -> Vec<TaskId> {
    let mut order: Vec<TaskId> = tasks.iter().map(|task| task.task_id).collect();
    order.sort_by_key(|&task_id| {
        let lesson = problem.lesson(tasks[task_id.raw_index()].lesson);
        let block_size = lesson.teachers.len() * lesson.classes.len();
        let keyword_bonus = keywords
            .iter()
            .any(|keyword| lesson.name.to_uppercase().contains(&keyword.to_uppercase()));
        (
            std::cmp::Reverse(block_size),
            std::cmp::Reverse(keyword_bonus as usize),
            std::cmp::Reverse(lesson.teachers.len() + lesson.classes.len()),
            std::cmp::Reverse(lesson.doubles),
            std::cmp::Reverse(lesson.required_periods()),
            task_id,
        )
    });
    order
}
