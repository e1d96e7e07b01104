// Query Executor
// This module runs a parsed SelectQuery against a loaded DataSet

use super::expr::Expr;
use super::parser::{Projection, SelectQuery, SortKey};
use crate::dataset::{DataSet, Row, Schema, Value};
use crate::error::{QueryError, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Executes the row-level parts of a query: filter, sort, slice, project
/// Fetching and loading the source happens before this, in `crate::query_with`
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute a query over a data set and return the result set
    pub fn execute(query: &SelectQuery, dataset: DataSet) -> Result<DataSet> {
        let DataSet { schema, rows } = dataset;

        // Check column references up front, so they fail even on empty data
        if let Some(condition) = &query.condition {
            condition.validate(&schema)?;
        }
        let sort_keys = Self::resolve_sort_keys(query, &schema)?;
        let (names, exprs) = Self::output_columns(query, &schema)?;

        // 1. filter
        let mut rows = match &query.condition {
            Some(condition) => {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if condition.matches(&schema, &row)? {
                        kept.push(row);
                    }
                }
                kept
            }
            None => rows,
        };
        debug!("{} row(s) after filtering", rows.len());

        // 2. sort - evaluate keys once per row, then a stable sort
        if !sort_keys.is_empty() {
            let mut keyed = rows
                .into_iter()
                .map(|row| -> Result<(Vec<Value>, Row)> {
                    let keys = sort_keys
                        .iter()
                        .map(|key| key.expr.evaluate(&schema, &row))
                        .collect::<Result<Vec<_>>>()?;
                    Ok((keys, row))
                })
                .collect::<Result<Vec<_>>>()?;

            keyed.sort_by(|(a, _), (b, _)| compare_keys(&sort_keys, a, b));
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }

        // 3. offset / limit
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let rows: Vec<Row> = rows.into_iter().skip(offset).take(limit).collect();

        // 4. project
        let projected = rows
            .iter()
            .map(|row| {
                exprs
                    .iter()
                    .map(|expr| expr.evaluate(&schema, row))
                    .collect::<Result<Vec<_>>>()
                    .map(Row::new)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DataSet::from_rows(names, projected))
    }

    /// Expand the SELECT list into output names and expressions
    /// Output names must be unique, since JSON rows are keyed by them
    fn output_columns(query: &SelectQuery, schema: &Schema) -> Result<(Vec<String>, Vec<Expr>)> {
        let mut names = Vec::new();
        let mut exprs = Vec::new();
        for projection in &query.projection {
            match projection {
                Projection::Wildcard => {
                    for column in &schema.columns {
                        names.push(column.name.clone());
                        exprs.push(Expr::Column(column.name.clone()));
                    }
                }
                Projection::Expr { expr, name } => {
                    expr.validate(schema)?;
                    names.push(name.clone());
                    exprs.push(expr.clone());
                }
            }
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(QueryError::Execution(format!(
                "duplicate output column: {}",
                duplicate
            )));
        }
        Ok((names, exprs))
    }

    /// ORDER BY may name a SELECT alias; swap in the aliased expression
    /// when the name isn't also a source column
    fn resolve_sort_keys(query: &SelectQuery, schema: &Schema) -> Result<Vec<SortKey>> {
        query
            .order_by
            .iter()
            .map(|key| -> Result<SortKey> {
                let expr = match &key.expr {
                    Expr::Column(name) if schema.get_column_index(name).is_none() => query
                        .projection
                        .iter()
                        .find_map(|projection| match projection {
                            Projection::Expr { expr, name: alias } if alias == name => {
                                Some(expr.clone())
                            }
                            _ => None,
                        })
                        .unwrap_or_else(|| key.expr.clone()),
                    other => other.clone(),
                };
                expr.validate(schema)?;
                Ok(SortKey {
                    expr,
                    descending: key.descending,
                    nulls_first: key.nulls_first,
                })
            })
            .collect()
    }
}

/// Lexicographic comparison of evaluated sort keys
fn compare_keys(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for (key, (a, b)) in keys.iter().zip(a.iter().zip(b)) {
        let ordering = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            // NULL placement is independent of ASC/DESC
            (true, false) if key.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if key.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if key.descending => b.sort_cmp(a),
            (false, false) => a.sort_cmp(b),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
