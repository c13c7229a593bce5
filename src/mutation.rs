use crate::grid::Grid;
use crate::problem::{Problem, TaskId};
use crate::task::{Placement, Task};

/// A reversible edit to the grid. Operators build a move, apply it, and the
/// repair loop reverses it when the Metropolis test rejects the new state
/// under [`RejectPolicy::Revert`](crate::solver::RejectPolicy).
#[derive(Clone, Debug)]
pub enum Move {
    Relocate {
        task: TaskId,
        from: Placement,
        to: Placement,
    },
    Exchange {
        first: TaskId,
        second: TaskId,
        first_slot: Placement,
        second_slot: Placement,
    },
    Chain(Vec<Move>),
}

impl Move {
    pub fn apply(&self, problem: &Problem, tasks: &[Task], grid: &mut Grid) {
        match self {
            Move::Relocate { task, from, to } => {
                let task = &tasks[task.raw_index()];
                let removed = grid.remove(problem, task);
                debug_assert_eq!(removed, *from);
                grid.place(problem, task, *to);
            }
            Move::Exchange {
                first,
                second,
                first_slot,
                second_slot,
            } => {
                let first = &tasks[first.raw_index()];
                let second = &tasks[second.raw_index()];
                let removed_first = grid.remove(problem, first);
                let removed_second = grid.remove(problem, second);
                debug_assert_eq!(removed_first, *first_slot);
                debug_assert_eq!(removed_second, *second_slot);
                grid.place(problem, first, *second_slot);
                grid.place(problem, second, *first_slot);
            }
            Move::Chain(moves) => {
                for step in moves {
                    step.apply(problem, tasks, grid);
                }
            }
        }
    }

    pub fn reverse(&self, problem: &Problem, tasks: &[Task], grid: &mut Grid) {
        match self {
            Move::Relocate { task, from, to } => {
                let task = &tasks[task.raw_index()];
                let removed = grid.remove(problem, task);
                debug_assert_eq!(removed, *to);
                grid.place(problem, task, *from);
            }
            Move::Exchange {
                first,
                second,
                first_slot,
                second_slot,
            } => {
                let first = &tasks[first.raw_index()];
                let second = &tasks[second.raw_index()];
                grid.remove(problem, first);
                grid.remove(problem, second);
                grid.place(problem, first, *first_slot);
                grid.place(problem, second, *second_slot);
            }
            Move::Chain(moves) => {
                for step in moves.iter().rev() {
                    step.reverse(problem, tasks, grid);
                }
            }
        }
    }
}
