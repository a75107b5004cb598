//! Seed records and the knobs that size a seeding run.

use chrono::NaiveTime;
use rollcall_models::Batch;
use uuid::Uuid;

/// Seed data for a class section.
pub struct ClassSeed {
    pub year: String,
    pub name: String,
    pub batch: Batch,
    pub key: String,
}

/// One weekly slot of a seeded subject.
pub struct TimingSeed {
    pub days: Vec<String>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Seed data for a subject taught in a single class.
pub struct SubjectSeed {
    pub name: String,
    pub class_id: Uuid,
    pub timings: Vec<TimingSeed>,
}

/// Seed data for a teacher or student account.
pub struct UserSeed {
    pub name: String,
    pub sap_id: String,
    pub email: String,
    pub password_hash: String,
    pub class_id: Option<Uuid>,
    pub roll_no: Option<String>,
}

/// Subjects per class are capped so every class fits a conflict-free week.
pub const MAX_SUBJECTS_PER_CLASS: usize = 16;

#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub classes: usize,
    pub subjects_per_class: usize,
    pub teachers: usize,
    pub students_per_class: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            classes: 4,
            subjects_per_class: 5,
            teachers: 6,
            students_per_class: 30,
        }
    }
}

impl SeedConfig {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            ..Default::default()
        }
    }

    pub fn with_subjects(mut self, subjects_per_class: usize) -> Self {
        self.subjects_per_class = subjects_per_class.min(MAX_SUBJECTS_PER_CLASS);
        self
    }

    pub fn with_teachers(mut self, teachers: usize) -> Self {
        self.teachers = teachers;
        self
    }

    pub fn with_students(mut self, students_per_class: usize) -> Self {
        self.students_per_class = students_per_class;
        self
    }

    pub fn total_subjects(&self) -> usize {
        self.classes * self.subjects_per_class
    }

    pub fn total_students(&self) -> usize {
        self.classes * self.students_per_class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_per_class_is_capped() {
        let config = SeedConfig::new(2).with_subjects(40);
        assert_eq!(config.subjects_per_class, MAX_SUBJECTS_PER_CLASS);
        assert_eq!(config.total_subjects(), 2 * MAX_SUBJECTS_PER_CLASS);
    }

    #[test]
    fn totals_follow_class_count() {
        let config = SeedConfig::new(3).with_students(10).with_teachers(2);
        assert_eq!(config.total_students(), 30);
        assert_eq!(config.teachers, 2);
    }
}
