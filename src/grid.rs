use crate::problem::{ClassId, DayId, LessonId, Period, Problem, TaskId, TeacherId};
use crate::task::{Placement, Task};

/// One lesson instance recorded in a grid cell. A cell may hold several
/// records while the schedule still contains conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRecord {
    pub task: TaskId,
    pub lesson: LessonId,
}

/// Dense occupancy index over `|classes| × |days| × periods_per_day` cells,
/// with per-resource busy counts and load counters kept exactly in sync
/// with the set of placed tasks. Every mutation is reversible: removing a
/// task restores the state the index would have had without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    num_days: usize,
    periods: usize,

    cells: Vec<Vec<CellRecord>>,
    teacher_occupancy: Vec<u16>,
    teacher_day_load: Vec<u16>,
    teacher_week_load: Vec<u16>,
    class_week_load: Vec<u16>,
    lesson_day_count: Vec<u16>,
    placements: Vec<Option<Placement>>,
}

impl Grid {
    pub fn new(problem: &Problem, num_tasks: usize) -> Grid {
        let num_days = problem.num_days();
        let periods = problem.periods_per_day as usize;
        let num_classes = problem.classes.len();
        let num_teachers = problem.teacher_ids.len();
        let num_lessons = problem.lessons.len();

        Grid {
            num_days,
            periods,
            cells: vec![Vec::new(); num_classes * num_days * periods],
            teacher_occupancy: vec![0; num_teachers * num_days * periods],
            teacher_day_load: vec![0; num_teachers * num_days],
            teacher_week_load: vec![0; num_teachers],
            class_week_load: vec![0; num_classes],
            lesson_day_count: vec![0; num_lessons * num_days],
            placements: vec![None; num_tasks],
        }
    }

    fn cell_index(&self, class: ClassId, day: DayId, period: Period) -> usize {
        (class.raw_index() * self.num_days + day.raw_index()) * self.periods
            + (period as usize - 1)
    }

    fn teacher_index(&self, teacher: TeacherId, day: DayId, period: Period) -> usize {
        (teacher.raw_index() * self.num_days + day.raw_index()) * self.periods
            + (period as usize - 1)
    }

    pub fn place(&mut self, problem: &Problem, task: &Task, placement: Placement) {
        debug_assert!(self.placements[task.task_id.raw_index()].is_none());

        let lesson = problem.lesson(task.lesson);
        let record = CellRecord {
            task: task.task_id,
            lesson: task.lesson,
        };

        for period in placement.periods(task.is_double) {
            for &class in lesson.classes.iter() {
                let index = self.cell_index(class, placement.day, period);
                let cell = &mut self.cells[index];
                // Records stay ordered by task id so that removal followed by
                // re-placement reproduces the cell byte for byte.
                let position = cell
                    .iter()
                    .position(|existing| existing.task > record.task)
                    .unwrap_or(cell.len());
                cell.insert(position, record);
            }
            for &teacher in lesson.teachers.iter() {
                let index = self.teacher_index(teacher, placement.day, period);
                self.teacher_occupancy[index] += 1;
            }
        }

        let span = Placement::span(task.is_double);
        for &teacher in lesson.teachers.iter() {
            self.teacher_day_load[teacher.raw_index() * self.num_days + placement.day.raw_index()] +=
                span;
            self.teacher_week_load[teacher.raw_index()] += span;
        }
        for &class in lesson.classes.iter() {
            self.class_week_load[class.raw_index()] += span;
        }
        self.lesson_day_count[task.lesson.raw_index() * self.num_days + placement.day.raw_index()] +=
            1;
        self.placements[task.task_id.raw_index()] = Some(placement);
    }

    pub fn remove(&mut self, problem: &Problem, task: &Task) -> Placement {
        let placement = self.placements[task.task_id.raw_index()]
            .take()
            .expect("removing a task that is not placed");

        let lesson = problem.lesson(task.lesson);
        for period in placement.periods(task.is_double) {
            for &class in lesson.classes.iter() {
                let index = self.cell_index(class, placement.day, period);
                let cell = &mut self.cells[index];
                let position = cell
                    .iter()
                    .position(|record| record.task == task.task_id)
                    .expect("grid cell is missing a record for a placed task");
                cell.remove(position);
            }
            for &teacher in lesson.teachers.iter() {
                let index = self.teacher_index(teacher, placement.day, period);
                self.teacher_occupancy[index] -= 1;
            }
        }

        let span = Placement::span(task.is_double);
        for &teacher in lesson.teachers.iter() {
            self.teacher_day_load[teacher.raw_index() * self.num_days + placement.day.raw_index()] -=
                span;
            self.teacher_week_load[teacher.raw_index()] -= span;
        }
        for &class in lesson.classes.iter() {
            self.class_week_load[class.raw_index()] -= span;
        }
        self.lesson_day_count[task.lesson.raw_index() * self.num_days + placement.day.raw_index()] -=
            1;

        placement
    }

    pub fn placement(&self, task: TaskId) -> Option<Placement> {
        self.placements[task.raw_index()]
    }

    pub fn records(&self, class: ClassId, day: DayId, period: Period) -> &[CellRecord] {
        &self.cells[self.cell_index(class, day, period)]
    }

    pub fn teacher_busy(&self, teacher: TeacherId, day: DayId, period: Period) -> bool {
        self.teacher_occupancy[self.teacher_index(teacher, day, period)] > 0
    }

    pub fn teacher_day_load(&self, teacher: TeacherId, day: DayId) -> u16 {
        self.teacher_day_load[teacher.raw_index() * self.num_days + day.raw_index()]
    }

    pub fn teacher_week_load(&self, teacher: TeacherId) -> u16 {
        self.teacher_week_load[teacher.raw_index()]
    }

    pub fn class_week_load(&self, class: ClassId) -> u16 {
        self.class_week_load[class.raw_index()]
    }

    /// Whether any instance of the lesson already sits on the given day.
    /// Drives the initializer's daily-repeat guard.
    pub fn lesson_placed_on(&self, lesson: LessonId, day: DayId) -> bool {
        self.lesson_day_count[lesson.raw_index() * self.num_days + day.raw_index()] > 0
    }
}
