//! Teacher and student seeding.
//!
//! Seeded accounts follow the same convention as accounts created through the
//! API: the initial password is the SAP ID. Hashing is the slow part, so it
//! runs across the rayon pool at a reduced bcrypt cost.

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use rollcall_models::UserRole;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use std::time::Instant;
use uuid::Uuid;

use super::models::UserSeed;

const SEED_HASH_COST: u32 = 4;

pub fn teacher_sap_id(index: usize) -> String {
    format!("9{:07}", index + 1)
}

pub fn student_sap_id(class_index: usize, roll: usize) -> String {
    format!("6{:04}{:03}", class_index + 1, roll + 1)
}

fn generate_user(
    sap_id: String,
    role_prefix: &str,
    class_id: Option<Uuid>,
    roll_no: Option<String>,
) -> Result<UserSeed, bcrypt::BcryptError> {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    let email = format!(
        "{}.{}+{}{}@example.com",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        role_prefix,
        sap_id
    );
    let password_hash = bcrypt::hash(&sap_id, SEED_HASH_COST)?;

    Ok(UserSeed {
        name: format!("{} {}", first_name, last_name),
        sap_id,
        email,
        password_hash,
        class_id,
        roll_no,
    })
}

pub fn generate_teachers(count: usize) -> Result<Vec<UserSeed>, bcrypt::BcryptError> {
    (0..count)
        .into_par_iter()
        .map(|i| generate_user(teacher_sap_id(i), "teacher", None, None))
        .collect()
}

/// Generates `per_class` students for each class, in class order.
pub fn generate_students(
    class_ids: &[Uuid],
    per_class: usize,
) -> Result<Vec<UserSeed>, bcrypt::BcryptError> {
    class_ids
        .par_iter()
        .enumerate()
        .flat_map(|(class_idx, &class_id)| {
            (0..per_class)
                .into_par_iter()
                .map(move |roll| {
                    generate_user(
                        student_sap_id(class_idx, roll),
                        "student",
                        Some(class_id),
                        Some((roll + 1).to_string()),
                    )
                })
        })
        .collect()
}

/// Round-robins subjects over teachers. Each teacher is also assigned the
/// classes of the subjects they got, so every assignment is markable.
pub fn plan_assignments(
    teacher_ids: &[Uuid],
    subjects: &[(Uuid, Uuid)],
) -> (Vec<(Uuid, Uuid)>, Vec<(Uuid, Uuid)>) {
    if teacher_ids.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let mut teacher_subjects = Vec::with_capacity(subjects.len());
    let mut teacher_classes = BTreeSet::new();

    for (i, (subject_id, class_id)) in subjects.iter().enumerate() {
        let teacher_id = teacher_ids[i % teacher_ids.len()];
        teacher_subjects.push((teacher_id, *subject_id));
        teacher_classes.insert((teacher_id, *class_id));
    }

    (teacher_subjects, teacher_classes.into_iter().collect())
}

pub async fn seed_teachers(
    db: &PgPool,
    count: usize,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("👩‍🏫 Seeding {} teachers...", count);

    let users = generate_teachers(count)?;
    let ids = insert_users_batch(db, &users, UserRole::Teacher).await?;

    println!(
        "   ✓ Inserted {} teachers in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids)
}

pub async fn seed_students(
    db: &PgPool,
    class_ids: &[Uuid],
    per_class: usize,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🎓 Seeding {} students ({} per class)...",
        class_ids.len() * per_class,
        per_class
    );

    let users = generate_students(class_ids, per_class)?;
    let ids = insert_users_batch(db, &users, UserRole::Student).await?;

    println!(
        "   ✓ Inserted {} students in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids)
}

pub async fn insert_users_batch(
    db: &PgPool,
    users: &[UserSeed],
    role: UserRole,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    // 7 params per user
    const BATCH_SIZE: usize = 800;

    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk, role).await?);
    }

    tx.commit().await?;
    Ok(ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
    role: UserRole,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO users (name, sap_id, email, password, role, class_id, roll_no) VALUES ",
    );

    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 7;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6,
            p + 7
        ));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q
            .bind(&user.name)
            .bind(&user.sap_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(role)
            .bind(user.class_id)
            .bind(&user.roll_no);
    }

    let ids: Vec<Uuid> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Writes the teacher-subject and teacher-class links.
pub async fn assign_teachers(
    db: &PgPool,
    teacher_ids: &[Uuid],
    subjects: &[(Uuid, Uuid)],
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let (teacher_subjects, teacher_classes) = plan_assignments(teacher_ids, subjects);
    println!(
        "🔗 Assigning {} subjects to {} teachers...",
        teacher_subjects.len(),
        teacher_ids.len()
    );

    let (ts_teachers, ts_subjects): (Vec<Uuid>, Vec<Uuid>) = teacher_subjects.into_iter().unzip();
    let (tc_teachers, tc_classes): (Vec<Uuid>, Vec<Uuid>) = teacher_classes.into_iter().unzip();

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO teacher_subjects (teacher_id, subject_id)
         SELECT * FROM UNNEST($1::uuid[], $2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(&ts_teachers)
    .bind(&ts_subjects)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO teacher_classes (teacher_id, class_id)
         SELECT * FROM UNNEST($1::uuid[], $2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(&tc_teachers)
    .bind(&tc_classes)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    println!("   ✓ Assigned teachers in {:?}", start_time.elapsed());

    Ok(())
}

/// Deletes every teacher and student account. Admins are kept.
pub async fn clear_users(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM users WHERE role <> $1")
        .bind(UserRole::Admin)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sap_ids_are_unique_across_classes() {
        let mut ids: Vec<String> = (0..3)
            .flat_map(|c| (0..50).map(move |r| student_sap_id(c, r)))
            .chain((0..20).map(teacher_sap_id))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn students_default_password_is_sap_id() {
        let class_id = Uuid::new_v4();
        let students = generate_students(&[class_id], 2).unwrap();
        assert_eq!(students.len(), 2);
        for student in &students {
            assert_eq!(student.class_id, Some(class_id));
            assert!(bcrypt::verify(&student.sap_id, &student.password_hash).unwrap());
            assert!(student.email.ends_with("@example.com"));
        }
    }

    #[test]
    fn assignments_cover_each_subject_once() {
        let teachers = vec![Uuid::new_v4(), Uuid::new_v4()];
        let class_a = Uuid::new_v4();
        let class_b = Uuid::new_v4();
        let subjects = vec![
            (Uuid::new_v4(), class_a),
            (Uuid::new_v4(), class_a),
            (Uuid::new_v4(), class_b),
        ];

        let (teacher_subjects, teacher_classes) = plan_assignments(&teachers, &subjects);

        assert_eq!(teacher_subjects.len(), 3);
        assert_eq!(teacher_subjects[0].0, teachers[0]);
        assert_eq!(teacher_subjects[1].0, teachers[1]);
        assert_eq!(teacher_subjects[2].0, teachers[0]);
        // teacher 0: class_a, class_b; teacher 1: class_a
        assert_eq!(teacher_classes.len(), 3);
    }

    #[test]
    fn no_teachers_means_no_assignments() {
        let (subjects, classes) = plan_assignments(&[], &[(Uuid::new_v4(), Uuid::new_v4())]);
        assert!(subjects.is_empty());
        assert!(classes.is_empty());
    }
}
