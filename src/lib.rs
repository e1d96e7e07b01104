// queryer - run SQL directly against CSV/JSON data sources
// This is the library root that exposes the public API
//
//     let ds = queryer::query("SELECT name FROM file://./data.json WHERE age >= 18").await?;
//     println!("{}", ds.to_json()?);
//
// The ffi module exposes the same thing to C as `query`/`free_str`.

pub mod dataset;
pub mod error;
pub mod ffi;
pub mod query;
pub mod source;

// Re-export commonly used types for convenience
pub use dataset::{Column, DataSet, DataType, OutputFormat, Row, Schema, Value};
pub use error::{QueryError, Result};
pub use query::{QueryExecutor, QueryParser, SelectQuery};
pub use source::{register_fetcher, retrieve_data, Fetch, FetcherRegistry, Filetype, RawData};

use tracing::{debug, info};

/// Run a SQL query, fetching its source through the default registry
pub async fn query(sql: impl AsRef<str>) -> Result<DataSet> {
    query_with(sql, source::default_registry()).await
}

/// Run a SQL query, fetching its source through the given registry
pub async fn query_with(sql: impl AsRef<str>, registry: &FetcherRegistry) -> Result<DataSet> {
    let query = QueryParser::parse(sql.as_ref())?;

    info!("retrieving data from source: {}", query.source);
    let raw = registry.retrieve(&query.source).await?;

    let dataset = source::load(raw)?;
    debug!("source has {} row(s)", dataset.row_count());

    let result = QueryExecutor::execute(&query, dataset)?;
    debug!("query returned {} row(s)", result.row_count());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;

    struct ScoresFetcher;

    #[async_trait]
    impl Fetch for ScoresFetcher {
        async fn fetch(&self, _source: &str) -> anyhow::Result<RawData> {
            Ok(RawData::new(
                Filetype::Json,
                r#"[{"name": "aa", "score": 88}, {"name": "bb", "score": 51}]"#,
            ))
        }
    }

    #[tokio::test]
    async fn test_query_local_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "location,new_cases,new_deaths").unwrap();
        writeln!(file, "France,1200,40").unwrap();
        writeln!(file, "Peru,300,610").unwrap();
        writeln!(file, "India,9000,700").unwrap();

        let sql = format!(
            "SELECT location name, new_cases FROM file://{} \
             WHERE new_deaths >= 600 ORDER BY new_cases DESC",
            file.path().display()
        );
        let ds = query(sql).await.unwrap();

        assert_eq!(ds.schema.column_names(), vec!["name", "new_cases"]);
        assert_eq!(
            ds.to_csv().unwrap(),
            "name,new_cases\nIndia,9000\nPeru,300\n"
        );
    }

    #[tokio::test]
    async fn test_query_with_custom_registry() {
        let registry = FetcherRegistry::new();
        registry.register("custom", ScoresFetcher);

        let ds = query_with("SELECT * FROM custom://do_not_care WHERE score >= 60", &registry)
            .await
            .unwrap();
        assert_eq!(ds.to_json().unwrap(), r#"[{"name":"aa","score":88}]"#);

        // the default registry doesn't know the scheme
        let err = query("SELECT * FROM custom://do_not_care").await.unwrap_err();
        assert!(matches!(err, QueryError::Fetch { .. }));
    }
}
