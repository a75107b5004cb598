//! Class section seeding.

use rollcall_models::{Batch, class_key};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::ClassSeed;

const DEPARTMENTS: [&str; 6] = ["SE-IT", "SE-COMP", "TE-IT", "TE-COMP", "BE-IT", "BE-COMP"];

/// Generates `count` classes with distinct keys, e.g. `2023-SE-IT-A-morning`.
pub fn generate_classes(count: usize) -> Vec<ClassSeed> {
    (0..count)
        .map(|i| {
            let department = DEPARTMENTS[i % DEPARTMENTS.len()];
            let round = i / DEPARTMENTS.len();
            let division = (b'A' + (round % 26) as u8) as char;
            let year = (2023 + round / 26).to_string();
            let name = format!("{}-{}", department, division);
            let batch = if i % 2 == 0 {
                Batch::Morning
            } else {
                Batch::Evening
            };

            ClassSeed {
                key: class_key(&year, &name, batch),
                year,
                name,
                batch,
            }
        })
        .collect()
}

/// Seeds classes and returns `(id, key)` pairs in generation order.
pub async fn seed_classes(
    db: &PgPool,
    count: usize,
    students_per_class: usize,
) -> Result<Vec<(Uuid, String)>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} classes...", count);

    let classes = generate_classes(count);
    let mut tx = db.begin().await?;
    let ids = insert_classes_chunk(&mut tx, &classes, students_per_class).await?;
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids
        .into_iter()
        .zip(classes.into_iter().map(|c| c.key))
        .collect())
}

async fn insert_classes_chunk(
    tx: &mut Transaction<'_, Postgres>,
    classes: &[ClassSeed],
    students_per_class: usize,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO class_sections (year, name, batch, num_students, full_name) VALUES ");

    for i in 0..classes.len() {
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

    query.push_str(" RETURNING id");

    let num_students = i32::try_from(students_per_class)?;
    let mut q = sqlx::query_scalar(&query);
    for class in classes {
        q = q
            .bind(&class.year)
            .bind(&class.name)
            .bind(class.batch)
            .bind(num_students)
            .bind(&class.key);
    }

    let ids: Vec<Uuid> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Deletes all class sections. Anything referencing them must be gone first.
pub async fn clear_classes(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query("DELETE FROM class_sections")
        .execute(&mut **tx)
        .await?
        .rows_affected();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_keys_are_unique() {
        let classes = generate_classes(200);
        let keys: HashSet<_> = classes.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys.len(), 200);
    }

    #[test]
    fn first_class_key() {
        let classes = generate_classes(2);
        assert_eq!(classes[0].key, "2023-SE-IT-A-morning");
        assert_eq!(classes[1].key, "2023-SE-COMP-A-evening");
    }
}
