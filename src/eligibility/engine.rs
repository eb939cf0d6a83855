use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use super::error::GraphError;
use super::graph::CourseGraph;
use crate::database::models::{Course, CourseSummary};

/// Admission decision for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Decision {
    Eligible,
    #[serde(rename_all = "camelCase")]
    Ineligible { missing_prerequisites: Vec<CourseSummary> },
}

impl Decision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Decision::Eligible)
    }
}

/// Read-only eligibility queries over a graph snapshot.
///
/// Only the directly listed prerequisites are checked; a prerequisite's own
/// prerequisites are not required to be in the completed set.
pub struct EligibilityEngine<'g> {
    graph: &'g CourseGraph,
}

impl<'g> EligibilityEngine<'g> {
    pub fn new(graph: &'g CourseGraph) -> Self {
        Self { graph }
    }

    pub fn check(&self, course_id: Uuid, completed: &HashSet<Uuid>) -> Result<Decision, GraphError> {
        let course = self.graph.course(course_id).ok_or(GraphError::NotFound(course_id))?;
        Ok(self.decide(course, completed))
    }

    /// Courses from the graph the student may enroll in, in graph order.
    /// Already completed courses are not filtered out.
    pub fn eligible_courses(&self, completed: &HashSet<Uuid>) -> Vec<&'g Course> {
        self.graph
            .all_courses()
            .iter()
            .filter(|course| self.decide(course, completed).is_eligible())
            .collect()
    }

    fn decide(&self, course: &Course, completed: &HashSet<Uuid>) -> Decision {
        let missing: Vec<CourseSummary> = course
            .prerequisites
            .iter()
            .filter(|id| !completed.contains(*id))
            .map(|&id| self.summary_of(id))
            .collect();

        if missing.is_empty() {
            Decision::Eligible
        } else {
            Decision::Ineligible {
                missing_prerequisites: missing,
            }
        }
    }

    fn summary_of(&self, id: Uuid) -> CourseSummary {
        match self.graph.course(id) {
            Some(course) => course.summary(),
            // Edges to removed courses are stripped on delete, so this only
            // covers a snapshot taken mid-delete.
            None => CourseSummary {
                id,
                title: String::new(),
                code: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (CourseGraph, Uuid, Uuid) {
        let a = Course::new("Algebra").with_code("MAT101");
        let b = Course::new("Calculus").with_code("MAT201");
        let (a_id, b_id) = (a.id, b.id);
        let mut graph = CourseGraph::from_courses(vec![a, b]);
        graph.add_prerequisite(b_id, a_id).unwrap();
        (graph, a_id, b_id)
    }

    #[test]
    fn course_without_prerequisites_is_always_eligible() {
        let (graph, a, _) = scenario();
        let engine = EligibilityEngine::new(&graph);
        assert_eq!(engine.check(a, &HashSet::new()).unwrap(), Decision::Eligible);
    }

    #[test]
    fn missing_prerequisite_is_reported_then_cleared() {
        let (graph, a, b) = scenario();
        let engine = EligibilityEngine::new(&graph);

        match engine.check(b, &HashSet::new()).unwrap() {
            Decision::Ineligible { missing_prerequisites } => {
                assert_eq!(missing_prerequisites.len(), 1);
                assert_eq!(missing_prerequisites[0].id, a);
                assert_eq!(missing_prerequisites[0].title, "Algebra");
            }
            other => panic!("expected ineligible, got {:?}", other),
        }

        let completed: HashSet<Uuid> = [a].into_iter().collect();
        assert_eq!(engine.check(b, &completed).unwrap(), Decision::Eligible);
    }

    #[test]
    fn missing_list_follows_prerequisite_order() {
        let courses: Vec<Course> = (0..4).map(|i| Course::new(format!("C{}", i))).collect();
        let ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
        let mut graph = CourseGraph::from_courses(courses);
        graph.add_prerequisite(ids[0], ids[3]).unwrap();
        graph.add_prerequisite(ids[0], ids[1]).unwrap();
        graph.add_prerequisite(ids[0], ids[2]).unwrap();

        let completed: HashSet<Uuid> = [ids[1]].into_iter().collect();
        let decision = EligibilityEngine::new(&graph).check(ids[0], &completed).unwrap();
        let Decision::Ineligible { missing_prerequisites } = decision else {
            panic!("expected ineligible");
        };
        let missing: Vec<Uuid> = missing_prerequisites.iter().map(|c| c.id).collect();
        assert_eq!(missing, vec![ids[3], ids[2]]);
    }

    #[test]
    fn only_direct_prerequisites_are_checked() {
        let (mut graph, _, b) = scenario();
        let c = Course::new("Analysis");
        let c_id = c.id;
        graph.upsert_course(c);
        graph.add_prerequisite(c_id, b).unwrap();

        // B completed without A: C is still admissible.
        let completed: HashSet<Uuid> = [b].into_iter().collect();
        let engine = EligibilityEngine::new(&graph);
        assert!(engine.check(c_id, &completed).unwrap().is_eligible());
        assert!(!engine.check(b, &completed).unwrap().is_eligible());
    }

    #[test]
    fn eligible_iff_prerequisites_subset_of_completed() {
        let courses: Vec<Course> = (0..4).map(|i| Course::new(format!("C{}", i))).collect();
        let ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
        let mut graph = CourseGraph::from_courses(courses);
        graph.add_prerequisite(ids[3], ids[0]).unwrap();
        graph.add_prerequisite(ids[3], ids[1]).unwrap();
        graph.add_prerequisite(ids[2], ids[0]).unwrap();
        let engine = EligibilityEngine::new(&graph);

        for mask in 0u8..16 {
            let completed: HashSet<Uuid> = ids
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, id)| *id)
                .collect();
            for &id in &ids {
                let subset = graph
                    .prerequisites_of(id)
                    .unwrap()
                    .iter()
                    .all(|p| completed.contains(p));
                assert_eq!(engine.check(id, &completed).unwrap().is_eligible(), subset);
            }
        }
    }

    #[test]
    fn eligible_courses_preserve_order_and_keep_completed_ones() {
        let (graph, a, b) = scenario();
        let engine = EligibilityEngine::new(&graph);

        let none: Vec<Uuid> = engine.eligible_courses(&HashSet::new()).iter().map(|c| c.id).collect();
        assert_eq!(none, vec![a]);

        let completed: HashSet<Uuid> = [a].into_iter().collect();
        let with_a: Vec<Uuid> = engine.eligible_courses(&completed).iter().map(|c| c.id).collect();
        assert_eq!(with_a, vec![a, b]);
    }

    #[test]
    fn unknown_course_is_not_found() {
        let (graph, _, _) = scenario();
        let ghost = Uuid::new_v4();
        assert_eq!(
            EligibilityEngine::new(&graph).check(ghost, &HashSet::new()),
            Err(GraphError::NotFound(ghost))
        );
    }

    #[test]
    fn ineligible_decision_serializes_missing_list() {
        let (graph, _, b) = scenario();
        let decision = EligibilityEngine::new(&graph).check(b, &HashSet::new()).unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["status"], "ineligible");
        assert_eq!(json["missingPrerequisites"][0]["code"], "MAT101");
    }
}
