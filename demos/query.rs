// Example: querying local and custom sources from Rust
// Run from the repository root: cargo run --example query

use anyhow::Result;
use async_trait::async_trait;
use queryer::{query, register_fetcher, Fetch, Filetype, RawData};

/// A fetcher that serves a fixed JSON document for `custom://` URLs
struct CustomFetcher;

#[async_trait]
impl Fetch for CustomFetcher {
    async fn fetch(&self, _source: &str) -> Result<RawData> {
        Ok(RawData::new(
            Filetype::Json,
            r#"[{"name": "aa", "score": 88}, {"name": "bb", "score": 51}]"#,
        ))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // file fetcher
    let sql = "SELECT name, age FROM file://./demos/data.json WHERE age >= 18 ORDER BY age DESC";
    let ds = query(sql).await?;
    println!("{}", ds);

    // same data as CSV
    let sql = "SELECT name, score * 2 AS doubled FROM file://./demos/data.json WHERE city IS NOT NULL";
    println!("{}", query(sql).await?.to_csv()?);

    // register custom fetcher
    register_fetcher("custom", CustomFetcher);
    let sql = "SELECT * FROM custom://do_not_care WHERE score >= 60";
    println!("{}", query(sql).await?.to_json()?);

    Ok(())
}
