use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::error::GraphError;
use crate::database::models::Course;

/// Courses plus the directed "requires" relation between them.
///
/// Courses keep their insertion order so listings are stable. The relation is
/// kept acyclic: every edge insertion runs a reachability search first.
#[derive(Debug, Clone, Default)]
pub struct CourseGraph {
    courses: Vec<Course>,
    index: HashMap<Uuid, usize>,
}

impl CourseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stored courses. Edges are taken as stored; the
    /// storage layer already rejected self-references and cycles.
    pub fn from_courses(courses: Vec<Course>) -> Self {
        let index = courses
            .iter()
            .enumerate()
            .map(|(pos, course)| (course.id, pos))
            .collect();
        Self { courses, index }
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    pub fn course(&self, id: Uuid) -> Option<&Course> {
        self.index.get(&id).map(|&pos| &self.courses[pos])
    }

    pub fn course_mut(&mut self, id: Uuid) -> Option<&mut Course> {
        match self.index.get(&id) {
            Some(&pos) => Some(&mut self.courses[pos]),
            None => None,
        }
    }

    pub fn all_courses(&self) -> &[Course] {
        &self.courses
    }

    /// Insert a course, or replace the stored one with the same id.
    pub fn upsert_course(&mut self, course: Course) {
        match self.index.get(&course.id) {
            Some(&pos) => self.courses[pos] = course,
            None => {
                self.index.insert(course.id, self.courses.len());
                self.courses.push(course);
            }
        }
    }

    /// Remove a course and every edge pointing at it.
    pub fn remove_course(&mut self, id: Uuid) -> Option<Course> {
        let pos = self.index.remove(&id)?;
        let removed = self.courses.remove(pos);
        for course in &mut self.courses {
            course.prerequisites.retain(|p| *p != id);
        }
        self.reindex();
        Some(removed)
    }

    /// Direct prerequisites only.
    pub fn prerequisites_of(&self, id: Uuid) -> Result<&[Uuid], GraphError> {
        self.course(id)
            .map(|c| c.prerequisites.as_slice())
            .ok_or(GraphError::NotFound(id))
    }

    pub fn add_prerequisite(&mut self, course_id: Uuid, prereq_id: Uuid) -> Result<(), GraphError> {
        self.validate_new_edge(course_id, prereq_id)?;
        if let Some(course) = self.course_mut(course_id) {
            course.prerequisites.push(prereq_id);
        }
        Ok(())
    }

    /// Check every rule for a new `course_id -> prereq_id` edge without
    /// touching the graph.
    pub fn validate_new_edge(&self, course_id: Uuid, prereq_id: Uuid) -> Result<(), GraphError> {
        if course_id == prereq_id {
            return Err(GraphError::SelfReference(course_id));
        }
        let course = self.course(course_id).ok_or(GraphError::NotFound(course_id))?;
        if !self.contains(prereq_id) {
            return Err(GraphError::NotFound(prereq_id));
        }
        if course.prerequisites.contains(&prereq_id) {
            return Err(GraphError::DuplicateEdge {
                course: course_id,
                prerequisite: prereq_id,
            });
        }
        if self.requires(prereq_id, course_id) {
            return Err(GraphError::CycleDetected {
                course: course_id,
                prerequisite: prereq_id,
            });
        }
        Ok(())
    }

    /// Returns whether the edge existed. A missing edge is not an error.
    pub fn remove_prerequisite(&mut self, course_id: Uuid, prereq_id: Uuid) -> Result<bool, GraphError> {
        let course = self
            .course_mut(course_id)
            .ok_or(GraphError::NotFound(course_id))?;
        let before = course.prerequisites.len();
        course.prerequisites.retain(|p| *p != prereq_id);
        Ok(course.prerequisites.len() != before)
    }

    /// True when `from` directly or transitively requires `target`.
    pub fn requires(&self, from: Uuid, target: Uuid) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(course) = self.course(current) else {
                continue;
            };
            for &next in &course.prerequisites {
                if next == target {
                    return true;
                }
                stack.push(next);
            }
        }
        false
    }

    fn reindex(&mut self) {
        self.index = self
            .courses
            .iter()
            .enumerate()
            .map(|(pos, course)| (course.id, pos))
            .collect();
    }
}
