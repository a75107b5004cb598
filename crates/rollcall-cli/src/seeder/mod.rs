//! Demo data seeding.
//!
//! `seed_all` builds a complete, usable dataset: classes, subjects with a
//! conflict-free weekly timetable, teachers assigned to those subjects and
//! students enrolled in each class. `clear_all` removes everything except
//! admin accounts.

pub mod classes;
pub mod models;
pub mod subjects;
pub mod users;

pub use models::{MAX_SUBJECTS_PER_CLASS, SeedConfig};

use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🌱 Starting database seeding...\n");
    println!("Configuration:");
    println!("   Classes: {}", config.classes);
    println!("   Subjects per class: {}", config.subjects_per_class);
    println!("   Teachers: {}", config.teachers);
    println!("   Students per class: {}", config.students_per_class);
    println!();

    let classes = classes::seed_classes(db, config.classes, config.students_per_class).await?;
    let class_ids: Vec<Uuid> = classes.iter().map(|(id, _)| *id).collect();

    let subjects = subjects::seed_subjects(db, &classes, config.subjects_per_class).await?;
    let teacher_ids = users::seed_teachers(db, config.teachers).await?;
    users::assign_teachers(db, &teacher_ids, &subjects).await?;
    let student_ids = users::seed_students(db, &class_ids, config.students_per_class).await?;

    println!("\n✅ Seeding completed in {:?}", start_time.elapsed());
    println!("   Classes: {}", classes.len());
    println!("   Subjects: {}", subjects.len());
    println!("   Teachers: {}", teacher_ids.len());
    println!("   Students: {}", student_ids.len());
    println!("\n   Seeded accounts use their SAP ID as password.");

    Ok(())
}

/// Removes tickets, attendance, teachers, students, subjects and classes.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded data...");

    let mut tx = db.begin().await?;

    let tickets = sqlx::query("DELETE FROM tickets")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let sessions = sqlx::query("DELETE FROM attendance_sessions")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let users = users::clear_users(&mut tx).await?;
    let subjects = subjects::clear_subjects(&mut tx).await?;
    let classes = classes::clear_classes(&mut tx).await?;

    tx.commit().await?;

    println!("   ✓ Deleted {} tickets", tickets);
    println!("   ✓ Deleted {} attendance sessions", sessions);
    println!("   ✓ Deleted {} users", users);
    println!("   ✓ Deleted {} subjects", subjects);
    println!("   ✓ Deleted {} classes", classes);
    println!("\n✅ Cleared in {:?}", start_time.elapsed());

    Ok(())
}
