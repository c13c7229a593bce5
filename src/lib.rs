//! Best-effort school-timetable constraint solver.
//!
//! Lessons bind sets of teachers and classes to required counts of single
//! and double periods; the solver assigns every instance to a (day, period)
//! cell of the weekly grid, minimizing a multi-dimensional penalty, and
//! reports whatever conflicts it could not resolve instead of failing.

pub mod grid;
pub mod input;
pub mod mutation;
pub mod output;
pub mod penalty;
pub mod placement;
pub mod precheck;
pub mod problem;
pub mod repair;
pub mod report;
pub mod solver;
pub mod task;
pub mod weights;

pub use input::{Lesson, SchoolClass, SolverInput, TimetableConfig, ValidationError};
pub use output::{SlotKind, SlotRecord, SolveResult, SolveStats};
pub use precheck::{FeasibilityWarning, OverloadedResource};
pub use report::{ConflictBreakdown, FailedLesson, SwapFeasibility, SwapSuggestion};
pub use solver::{solve, solve_with_cancellation, RejectPolicy, SolverSettings};
pub use weights::{PenaltyKind, PenaltyWeights};
