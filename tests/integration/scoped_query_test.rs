//! Scope disjointness tests.
//!
//! Seeds a schema where item visibility is keyed on the session user
//! variable, then checks that two users see exactly their own link-driven
//! row sets. Each test owns its schema so tests can run concurrently.

use super::common;
use scopeq::db::{ScopedClient, Value};
use scopeq::error::ScopeqError;
use scopeq::scope::Scope;

/// DDL and seed data for a link-driven visibility layout: users '1' and
/// '2', items '1'..'4', links ('1','1'), ('2','2'), ('3','1'), ('3','2').
/// `items` is a view over `items_base` filtered by the session variable.
fn seed_statements(schema: &str) -> Vec<String> {
    vec![
        format!("DROP SCHEMA IF EXISTS {schema} CASCADE"),
        format!("CREATE SCHEMA {schema}"),
        format!("CREATE TABLE {schema}.users (id text PRIMARY KEY)"),
        format!("CREATE TABLE {schema}.items_base (id text PRIMARY KEY)"),
        format!(
            "CREATE TABLE {schema}.item_links (\
             item_id text NOT NULL REFERENCES {schema}.items_base (id), \
             user_id text NOT NULL REFERENCES {schema}.users (id), \
             PRIMARY KEY (item_id, user_id))"
        ),
        format!("INSERT INTO {schema}.users VALUES ('1'), ('2')"),
        format!("INSERT INTO {schema}.items_base VALUES ('1'), ('2'), ('3'), ('4')"),
        format!(
            "INSERT INTO {schema}.item_links VALUES \
             ('1', '1'), ('2', '2'), ('3', '1'), ('3', '2')"
        ),
        format!(
            "CREATE VIEW {schema}.items AS \
             SELECT b.* FROM {schema}.items_base b \
             WHERE EXISTS (\
                 SELECT 1 FROM {schema}.item_links l \
                 WHERE l.item_id = b.id \
                   AND l.user_id = current_setting('app.user_id', true))"
        ),
    ]
}

#[tokio::test]
async fn test_users_see_disjoint_link_driven_rows() {
    let Some(executor) = common::connect().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let schema = "scopeq_links";

    common::run_all(&executor, &seed_statements(schema)).await;

    let result = executor
        .execute(
            &Scope::tenant_user(schema, "1"),
            "SELECT id FROM items ORDER BY id",
        )
        .await
        .unwrap();
    assert_eq!(common::ids(&result), vec!["1", "3"]);

    let result = executor
        .execute(
            &Scope::tenant_user(schema, "2"),
            "SELECT id FROM items ORDER BY id",
        )
        .await
        .unwrap();
    assert_eq!(common::ids(&result), vec!["2", "3"]);

    // Without a user dimension nothing is visible.
    let result = executor
        .execute(&Scope::tenant(schema), "SELECT id FROM items ORDER BY id")
        .await
        .unwrap();
    assert!(result.is_empty());

    common::run_all(&executor, &[format!("DROP SCHEMA {schema} CASCADE")]).await;
    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_row_level_security_policy_scopes_rows() {
    let Some(executor) = common::connect().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    // RLS does not apply to superusers or BYPASSRLS roles; the link-view
    // test above covers those environments.
    let check = executor
        .execute(
            &Scope::none(),
            "SELECT (rolsuper OR rolbypassrls) AS bypass \
             FROM pg_roles WHERE rolname = current_user",
        )
        .await
        .unwrap();
    if check.value(0, "bypass") != Some(&Value::Bool(false)) {
        eprintln!("Skipping test: test role bypasses row-level security");
        executor.close().await.unwrap();
        return;
    }

    let schema = "scopeq_rls";
    let mut statements = vec![
        format!("DROP SCHEMA IF EXISTS {schema} CASCADE"),
        format!("CREATE SCHEMA {schema}"),
        format!("CREATE TABLE {schema}.items (id text PRIMARY KEY)"),
        format!(
            "CREATE TABLE {schema}.item_links (\
             item_id text NOT NULL, user_id text NOT NULL, \
             PRIMARY KEY (item_id, user_id))"
        ),
        format!("INSERT INTO {schema}.items VALUES ('1'), ('2'), ('3'), ('4')"),
        format!(
            "INSERT INTO {schema}.item_links VALUES \
             ('1', '1'), ('2', '2'), ('3', '1'), ('3', '2')"
        ),
        format!("ALTER TABLE {schema}.items ENABLE ROW LEVEL SECURITY"),
    ];
    // FORCE applies the policy to the table owner as well.
    statements.push(format!(
        "ALTER TABLE {schema}.items FORCE ROW LEVEL SECURITY"
    ));
    statements.push(format!(
        "CREATE POLICY items_by_link ON {schema}.items FOR SELECT USING (\
         EXISTS (SELECT 1 FROM {schema}.item_links l \
                 WHERE l.item_id = items.id \
                   AND l.user_id = current_setting('app.user_id', true)))"
    ));
    common::run_all(&executor, &statements).await;

    let result = executor
        .execute(
            &Scope::tenant_user(schema, "1"),
            "SELECT id FROM items ORDER BY id",
        )
        .await
        .unwrap();
    assert_eq!(common::ids(&result), vec!["1", "3"]);

    let result = executor
        .execute(
            &Scope::tenant_user(schema, "2"),
            "SELECT id FROM items ORDER BY id",
        )
        .await
        .unwrap();
    assert_eq!(common::ids(&result), vec!["2", "3"]);

    common::run_all(&executor, &[format!("DROP SCHEMA {schema} CASCADE")]).await;
    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_adversarial_user_id_is_inert() {
    let Some(executor) = common::connect().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let schema = "scopeq_inject";

    common::run_all(&executor, &seed_statements(schema)).await;

    // A breakout attempt in the user id must behave as plain data: it
    // matches no links and drops nothing.
    let hostile = format!("1'; DROP TABLE {schema}.items_base; --");
    let result = executor
        .execute(
            &Scope::tenant_user(schema, hostile),
            "SELECT id FROM items ORDER BY id",
        )
        .await
        .unwrap();
    assert!(result.is_empty());

    let result = executor
        .execute(
            &Scope::tenant(schema),
            "SELECT id FROM items_base ORDER BY id",
        )
        .await
        .unwrap();
    assert_eq!(common::ids(&result).len(), 4);

    common::run_all(&executor, &[format!("DROP SCHEMA {schema} CASCADE")]).await;
    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_query_error_propagates() {
    let Some(executor) = common::connect().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = executor
        .execute(&Scope::user("1"), "SELECT * FROM missing_table_abc")
        .await
        .unwrap_err();

    match err {
        ScopeqError::Query(msg) => {
            assert!(
                msg.contains("does not exist"),
                "Expected a missing-relation error, got: {msg}"
            );
        }
        other => panic!("Expected Query error, got {other:?}"),
    }

    executor.close().await.unwrap();
}
