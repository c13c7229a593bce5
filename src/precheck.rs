use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::penalty::LoadLimits;
use crate::problem::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverloadedResource {
    Teacher,
    Class,
}

/// A structurally impossible aggregate load, detected before solving.
/// Advisory only: the solve still runs and surfaces the overload as
/// unresolved conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityWarning {
    pub resource: OverloadedResource,
    pub id: String,
    pub required_periods: u32,
    pub capacity: u32,
}

pub fn check_problem(problem: &Problem, limits: LoadLimits) -> Vec<FeasibilityWarning> {
    let mut warnings = Vec::new();

    let mut teacher_load = vec![0u32; problem.teacher_ids.len()];
    let mut class_load = vec![0u32; problem.classes.len()];
    for lesson in &problem.lessons {
        for &teacher in lesson.teachers.iter() {
            teacher_load[teacher.raw_index()] += lesson.required_periods();
        }
        for &class in lesson.classes.iter() {
            class_load[class.raw_index()] += lesson.required_periods();
        }
    }

    for (teacher, &load) in teacher_load.iter().enumerate() {
        let capacity = limits.weekly as u32;
        if load > capacity {
            warn!(
                teacher = %problem.teacher_ids[teacher],
                load, capacity, "teacher is structurally overloaded"
            );
            warnings.push(FeasibilityWarning {
                resource: OverloadedResource::Teacher,
                id: problem.teacher_ids[teacher].clone(),
                required_periods: load,
                capacity,
            });
        }
    }

    for (class, &load) in class_load.iter().enumerate() {
        let capacity = problem.class_week_capacity();
        if load > capacity {
            warn!(
                class = %problem.classes[class].id,
                load, capacity, "class is structurally overloaded"
            );
            warnings.push(FeasibilityWarning {
                resource: OverloadedResource::Class,
                id: problem.classes[class].id.clone(),
                required_periods: load,
                capacity,
            });
        }
    }

    warnings
}
