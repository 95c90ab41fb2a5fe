use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slintschema::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Serialize, Deserialize)]
pub struct Campaign {
    pub name: String,
    pub active: bool,
}

#[tokio::main]
async fn main() -> slintschema::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let db = Arc::new(Database::connect(&ConnectionConfig::from_env()?).await?);

    let campaigns = Model::new(
        &db,
        "campaigns",
        [
            Column::varchar("name").not_null(),
            Column::boolean("active").with_default(true),
        ],
    )
    .await?;

    let emails = Model::new(
        &db,
        "emails",
        [
            Column::varchar("subject").with_max_length(250),
            Column::text("body"),
        ],
    )
    .await?;

    campaigns
        .create(&Campaign {
            name: "Spring launch".into(),
            active: true,
        })
        .await?;

    let all = campaigns.all().await?;
    println!("{}", all);
    let decoded: Vec<Campaign> = all.decode()?;
    println!("All campaigns: {:?}", decoded);

    println!("{} has {} rows", emails.table()?, emails.all().await?.count());

    db.close().await
}
