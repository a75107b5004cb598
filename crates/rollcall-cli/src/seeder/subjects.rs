//! Subject seeding.
//!
//! Every seeded subject belongs to exactly one class. Within a class the
//! subjects get one-hour slots that alternate between a Mon/Wed/Fri and a
//! Tue/Thu week, so a class never has two subjects in the same slot. The
//! generated week is still run through the same conflict check the API uses
//! before anything is written.

use chrono::NaiveTime;
use rayon::prelude::*;
use rollcall_models::schedule::check_internal;
use rollcall_models::{TimeOfDay, Timing, Weekday};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::{SubjectSeed, TimingSeed};

const TOPICS: [&str; 8] = [
    "Mathematics",
    "Data Structures",
    "Operating Systems",
    "Computer Networks",
    "Database Systems",
    "Software Engineering",
    "Digital Electronics",
    "Communication Skills",
];

const FIRST_SLOT_HOUR: u32 = 8;

fn slot(index: usize) -> TimingSeed {
    let days: &[&str] = if index % 2 == 0 {
        &["Mon", "Wed", "Fri"]
    } else {
        &["Tue", "Thu"]
    };
    let hour = FIRST_SLOT_HOUR + (index / 2) as u32;

    TimingSeed {
        days: days.iter().map(|d| d.to_string()).collect(),
        start: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap_or(NaiveTime::MIN),
    }
}

fn subject_name(index: usize, class_key: &str) -> String {
    let topic = TOPICS[index % TOPICS.len()];
    match index / TOPICS.len() {
        0 => format!("{} ({})", topic, class_key),
        n => format!("{} {} ({})", topic, n + 1, class_key),
    }
}

/// Generates `per_class` subjects for each `(class_id, class_key)`.
pub fn generate_subjects(classes: &[(Uuid, String)], per_class: usize) -> Vec<SubjectSeed> {
    classes
        .par_iter()
        .flat_map(|(class_id, class_key)| {
            (0..per_class)
                .map(|i| SubjectSeed {
                    name: subject_name(i, class_key),
                    class_id: *class_id,
                    timings: vec![slot(i)],
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn to_timing(seed: &TimingSeed) -> Result<Timing, Box<dyn std::error::Error>> {
    let days = seed
        .days
        .iter()
        .map(|d| d.parse::<Weekday>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Timing::new(
        days,
        TimeOfDay::from(seed.start),
        TimeOfDay::from(seed.end),
    )?)
}

/// Checks that the subjects of each class leave the class conflict-free.
pub fn check_week(subjects: &[SubjectSeed]) -> Result<(), Box<dyn std::error::Error>> {
    let mut class_ids: Vec<Uuid> = subjects.iter().map(|s| s.class_id).collect();
    class_ids.sort();
    class_ids.dedup();

    for class_id in class_ids {
        let week = subjects
            .iter()
            .filter(|s| s.class_id == class_id)
            .flat_map(|s| s.timings.iter())
            .map(to_timing)
            .collect::<Result<Vec<_>, _>>()?;
        check_internal(&week)?;
    }
    Ok(())
}

/// Seeds subjects with their class links and timings. Returns `(subject_id,
/// class_id)` pairs in generation order.
pub async fn seed_subjects(
    db: &PgPool,
    classes: &[(Uuid, String)],
    per_class: usize,
) -> Result<Vec<(Uuid, Uuid)>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "📚 Seeding {} subjects ({} per class)...",
        classes.len() * per_class,
        per_class
    );

    let subjects = generate_subjects(classes, per_class);
    check_week(&subjects)?;

    let mut tx = db.begin().await?;
    let ids = insert_subjects_chunk(&mut tx, &subjects).await?;
    link_classes(&mut tx, &ids, &subjects).await?;
    insert_timings(&mut tx, &ids, &subjects).await?;
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} subjects in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids
        .into_iter()
        .zip(subjects.iter().map(|s| s.class_id))
        .collect())
}

async fn insert_subjects_chunk(
    tx: &mut Transaction<'_, Postgres>,
    subjects: &[SubjectSeed],
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    if subjects.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "INSERT INTO subjects (name) SELECT * FROM UNNEST($1::text[]) RETURNING id",
    )
    .bind(&names)
    .fetch_all(&mut **tx)
    .await?;

    Ok(ids)
}

async fn link_classes(
    tx: &mut Transaction<'_, Postgres>,
    subject_ids: &[Uuid],
    subjects: &[SubjectSeed],
) -> Result<(), Box<dyn std::error::Error>> {
    let class_ids: Vec<Uuid> = subjects.iter().map(|s| s.class_id).collect();
    sqlx::query(
        "INSERT INTO subject_classes (subject_id, class_id)
         SELECT * FROM UNNEST($1::uuid[], $2::uuid[])",
    )
    .bind(subject_ids)
    .bind(&class_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_timings(
    tx: &mut Transaction<'_, Postgres>,
    subject_ids: &[Uuid],
    subjects: &[SubjectSeed],
) -> Result<(), Box<dyn std::error::Error>> {
    let rows: Vec<(Uuid, i32, &TimingSeed)> = subject_ids
        .iter()
        .zip(subjects)
        .flat_map(|(id, subject)| {
            subject
                .timings
                .iter()
                .enumerate()
                .map(move |(position, timing)| (*id, position as i32, timing))
        })
        .collect();

    // 5 params per timing
    const BATCH_SIZE: usize = 1000;

    for chunk in rows.chunks(BATCH_SIZE) {
        let mut query = String::from(
            "INSERT INTO subject_timings (subject_id, position, days, start_time, end_time) VALUES ",
        );
        for i in 0..chunk.len() {
            if i > 0 {
                query.push_str(", ");
            }
            let p = i * 5;
            query.push_str(&format!(
                "(${}, ${}, ${}, ${}, ${})",
                p + 1,
                p + 2,
                p + 3,
                p + 4,
                p + 5
            ));
        }

        let mut q = sqlx::query(&query);
        for (subject_id, position, timing) in chunk {
            q = q
                .bind(subject_id)
                .bind(position)
                .bind(&timing.days)
                .bind(timing.start)
                .bind(timing.end);
        }
        q.execute(&mut **tx).await?;
    }

    Ok(())
}

/// Deletes all subjects; their class links and timings cascade.
pub async fn clear_subjects(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM subjects")
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::models::MAX_SUBJECTS_PER_CLASS;

    fn classes(n: usize) -> Vec<(Uuid, String)> {
        (0..n)
            .map(|i| (Uuid::new_v4(), format!("2023-SE-IT-{}-morning", i)))
            .collect()
    }

    #[test]
    fn full_week_has_no_conflicts() {
        let subjects = generate_subjects(&classes(3), MAX_SUBJECTS_PER_CLASS);
        assert_eq!(subjects.len(), 3 * MAX_SUBJECTS_PER_CLASS);
        assert!(check_week(&subjects).is_ok());
    }

    #[test]
    fn last_slot_ends_before_midnight() {
        let last = slot(MAX_SUBJECTS_PER_CLASS - 1);
        assert!(last.start < last.end);
    }

    #[test]
    fn names_are_unique_within_a_class() {
        let subjects = generate_subjects(&classes(1), MAX_SUBJECTS_PER_CLASS);
        let mut names: Vec<_> = subjects.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), MAX_SUBJECTS_PER_CLASS);
    }

    #[test]
    fn check_week_catches_a_clash() {
        let class_id = Uuid::new_v4();
        let subjects = vec![
            SubjectSeed {
                name: "A".into(),
                class_id,
                timings: vec![slot(0)],
            },
            SubjectSeed {
                name: "B".into(),
                class_id,
                timings: vec![slot(0)],
            },
        ];
        assert!(check_week(&subjects).is_err());
    }
}
