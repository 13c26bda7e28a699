use sqlx::SqlitePool;

/// Full bootstrap test: connect, migrate, verify schema and seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: SqlitePool) {
    kehila_db::health_check(&pool).await.unwrap();

    let tables = [
        "users",
        "categories",
        "requests",
        "request_updates",
        "request_sequences",
        "audit_logs",
        "notifications",
        "settings",
        "transactions",
        "meetings",
        "projects",
    ];
    for table in tables {
        sqlx::query(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
    }

    let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM categories ORDER BY sort_order")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(
        slugs,
        [
            "infrastructure",
            "sanitation",
            "education",
            "welfare",
            "security",
            "culture",
            "other"
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_check_constraint(pool: SqlitePool) {
    let result = sqlx::query(
        "INSERT INTO requests (reference_number, submitter_name, submitter_email, subject, category, status) \
         VALUES ('REQ-2026-0001', 'a', 'a@example.com', 's', 'other', 'done')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "unknown status must violate the CHECK constraint");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_category_is_rejected(pool: SqlitePool) {
    let result = sqlx::query(
        "INSERT INTO requests (reference_number, submitter_name, submitter_email, subject, category) \
         VALUES ('REQ-2026-0001', 'a', 'a@example.com', 's', 'parking')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "category must reference categories(slug)");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_audit_logs_are_append_only(pool: SqlitePool) {
    sqlx::query("INSERT INTO audit_logs (action_type, entity_type) VALUES ('x', 'y')")
        .execute(&pool)
        .await
        .unwrap();
    assert!(sqlx::query("UPDATE audit_logs SET action_type = 'z'")
        .execute(&pool)
        .await
        .is_err());
    assert!(sqlx::query("DELETE FROM audit_logs").execute(&pool).await.is_err());
}
