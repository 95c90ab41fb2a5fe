//! Runs against a real server configured through `DB_*` variables:
//! `cargo test --test postgres -- --ignored`

use std::sync::Arc;

use serde_json::json;
use slintschema::{Column, ConnectionConfig, Database, Execution, Model};

#[tokio::test]
#[ignore = "needs a running PostgreSQL server"]
async fn round_trip_against_postgres() -> slintschema::Result<()> {
    let db = Arc::new(Database::connect(&ConnectionConfig::from_env()?).await?);
    db.drop_table("slintschema_roundtrip").await?;

    let accounts = Model::new(
        &db,
        "slintschema_roundtrip",
        [
            Column::varchar("name").not_null(),
            Column::boolean("active"),
            Column::decimal("balance"),
        ],
    )
    .await?;
    assert!(db.table_exists("slintschema_roundtrip").await?);

    accounts
        .create(&json!({ "name": "Acme", "active": true, "balance": "12.50" }))
        .await?;
    let rows = accounts.all().await?;
    assert_eq!(rows.count(), 1);
    assert_eq!(rows.rows()[0]["name"], "Acme");
    assert_eq!(rows.rows()[0]["active"], true);
    assert_eq!(rows.rows()[0]["id"], 1);
    assert_eq!(rows.rows()[0]["balance"], json!(12.5));

    let again = db
        .create_table("slintschema_roundtrip", [Column::varchar("name")])
        .await?;
    assert_eq!(again, Execution::DuplicateSkipped);

    db.drop_table("slintschema_roundtrip").await?;
    db.close().await
}
