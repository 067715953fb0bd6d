//! Snapshot of a real MySQL server running in docker.
//!
//! Run with `cargo test -p backup-mysql-source -- --ignored` on a machine
//! with a docker daemon.

use anyhow::{Context, Result};
use backup_core::{OutputSink, Snapshot, SnapshotOptions, TableFilter};
use backup_mysql_source::testing::MySQLContainer;
use mysql_async::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TEST_PORT: u16 = 13310;

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_snapshot_of_live_database() -> Result<()> {
    init_logging();

    let container = MySQLContainer::new("mysql-backup-snapshot", TEST_PORT);
    container.start()?;
    container.wait_until_ready(90).await?;

    let pool = container.pool()?;
    let mut conn = pool.get_conn().await?;
    for statement in [
        "CREATE TABLE wp_users (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE wp_posts (
            id INT PRIMARY KEY,
            user_id INT,
            body TEXT,
            CONSTRAINT fk_author FOREIGN KEY (user_id) REFERENCES wp_users (id)
        )",
        "CREATE TABLE orders (id INT PRIMARY KEY)",
        "CREATE VIEW wp_authors AS SELECT name FROM wp_users",
        "INSERT INTO wp_users VALUES (1, 'O''Neil'), (2, NULL)",
        "INSERT INTO wp_posts VALUES (10, 1, 'first\nsecond')",
        "INSERT INTO orders VALUES (99)",
    ] {
        conn.query_drop(statement)
            .await
            .with_context(|| format!("fixture failed: {statement}"))?;
    }
    drop(conn);

    let mut catalog = backup_mysql_source::connect(&container.connection_opts()).await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("testdb.sql");
    let mut sink = OutputSink::open(&path)?;

    let options = SnapshotOptions {
        filter: TableFilter::parse("wp_*"),
        batch_size: 1,
        ..Default::default()
    };
    let summary = Snapshot::new(options)?.run(&mut catalog, &mut sink).await?;
    sink.close()?;
    catalog.disconnect().await?;
    pool.disconnect().await?;

    let script = std::fs::read_to_string(&path)?;
    assert_eq!(summary.tables, 2);
    assert_eq!(summary.views, 1);
    assert_eq!(summary.foreign_keys, 1);
    assert_eq!(summary.rows, 3);
    assert!(script.contains("CREATE TABLE IF NOT EXISTS `wp_posts`"));
    assert!(script.contains("ALTER TABLE `wp_posts`\n ADD CONSTRAINT `fk_author` FOREIGN KEY"));
    assert!(script.contains("CREATE OR REPLACE VIEW `wp_authors`"));
    assert!(script.contains("('1','O\\'Neil')"));
    assert!(script.contains("('2',NULL)"));
    assert!(script.contains("'first\\nsecond'"));
    assert!(!script.contains("orders"));
    Ok(())
}
