use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{AttendanceRecord, ClassInfo};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CsvRow {
    pub class_name: String,
    pub class_descriptor: String,
    pub student_id: String,
    pub full_name: String,
    pub date: NaiveDate,
    pub is_present: bool,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    upsert_class(pool, "10B", "Grade 10 Biology").await?;

    let students = [
        ("S1", "Avery Lee"),
        ("S2", "Jules Moreno"),
        ("S3", "Kiara Patel"),
        ("S4", "Noah Brooks"),
        ("S5", "Mina Okafor"),
    ];
    for (student_id, name) in students {
        upsert_student(pool, student_id, name, "10B").await?;
    }

    let days = recent_school_days(Utc::now().date_naive(), 10);
    for (index, day) in days.iter().enumerate() {
        for (student_id, _) in students {
            let is_present = !(student_id == "S3" && matches!(index, 1 | 4 | 8));
            insert_mark(pool, student_id, *day, is_present).await?;
        }
    }

    info!(days = days.len(), students = students.len(), "seeded class 10B");
    Ok(())
}

/// The last `count` weekdays strictly before `today`, oldest first.
pub fn recent_school_days(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = today;

    while days.len() < count {
        day = day - Duration::days(1);
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
    }

    days.reverse();
    days
}

pub async fn fetch_class(pool: &PgPool, name: &str) -> anyhow::Result<ClassInfo> {
    let row = sqlx::query("SELECT name, descriptor FROM attendance_insights.classes WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("unknown class {name}"))?;

    Ok(ClassInfo {
        name: row.get("name"),
        descriptor: row.get("descriptor"),
    })
}

pub async fn fetch_attendance(
    pool: &PgPool,
    class_name: &str,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT a.student_id, a.attended_on, a.is_present
        FROM attendance_insights.attendance a
        JOIN attendance_insights.students s ON s.student_id = a.student_id
        WHERE s.class_name = $1 AND a.attended_on >= $2
        ORDER BY a.attended_on, a.student_id
        "#,
    )
    .bind(class_name)
    .bind(since_date)
    .fetch_all(pool)
    .await?;

    let records = rows
        .into_iter()
        .map(|row| AttendanceRecord {
            student_id: row.get("student_id"),
            date: row.get("attended_on"),
            is_present: row.get("is_present"),
        })
        .collect();

    Ok(records)
}

pub fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {}", index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_csv(csv_path)?;
    let mut inserted = 0usize;

    for row in rows {
        upsert_class(pool, &row.class_name, &row.class_descriptor).await?;
        upsert_student(pool, &row.student_id, &row.full_name, &row.class_name).await?;
        if insert_mark(pool, &row.student_id, row.date, row.is_present).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn upsert_class(pool: &PgPool, name: &str, descriptor: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_insights.classes (name, descriptor)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET descriptor = EXCLUDED.descriptor
        "#,
    )
    .bind(name)
    .bind(descriptor)
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_student(
    pool: &PgPool,
    student_id: &str,
    full_name: &str,
    class_name: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_insights.students (student_id, full_name, class_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_id) DO UPDATE
        SET full_name = EXCLUDED.full_name, class_name = EXCLUDED.class_name
        "#,
    )
    .bind(student_id)
    .bind(full_name)
    .bind(class_name)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_mark(
    pool: &PgPool,
    student_id: &str,
    attended_on: NaiveDate,
    is_present: bool,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_insights.attendance (id, student_id, attended_on, is_present)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, attended_on) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(attended_on)
    .bind(is_present)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn school_days_skip_weekends() {
        // 2026-03-09 is a Monday.
        let today = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let days = recent_school_days(today, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            ]
        );
    }

    #[test]
    fn reads_attendance_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "class_name,class_descriptor,student_id,full_name,date,is_present\n\
             10B,Grade 10 Biology,S1,Avery Lee,2026-03-02,true\n\
             10B,Grade 10 Biology,S3,Kiara Patel,2026-03-02,false"
        )
        .unwrap();

        let rows = read_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].student_id, "S3");
        assert!(!rows[1].is_present);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn rejects_malformed_presence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "class_name,class_descriptor,student_id,full_name,date,is_present\n\
             10B,Grade 10 Biology,S1,Avery Lee,2026-03-02,maybe"
        )
        .unwrap();

        assert!(read_csv(file.path()).is_err());
    }
}
