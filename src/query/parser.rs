// SQL Parser
// This module converts a SQL string into a SelectQuery
// We use the sqlparser crate for the grammar, then keep only what we can execute

use super::dialect::SqlDialect;
use super::expr::{BinaryOp, Expr, UnaryOp};
use crate::dataset::Value;
use crate::error::{QueryError, Result};
use sqlparser::ast::{
    self, BinaryOperator, Expr as SqlExpr, GroupByExpr, SelectItem, SetExpr, Statement,
    TableFactor, UnaryOperator, Value as SqlValue,
};
use sqlparser::parser::Parser;

/// A parsed SELECT over a single data source
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Source URL from the FROM clause, e.g. `file://./data.json`
    pub source: String,
    /// WHERE condition
    pub condition: Option<Expr>,
    /// Output columns, in order
    pub projection: Vec<Projection>,
    /// ORDER BY keys, primary key first
    pub order_by: Vec<SortKey>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// One item of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*` - every source column
    Wildcard,
    /// An expression and the name of its output column
    Expr { expr: Expr, name: String },
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub descending: bool,
    pub nulls_first: bool,
}

/// The query parser
pub struct QueryParser;

impl QueryParser {
    /// Parse a SQL string into a SelectQuery
    /// This is the main entry point for parsing SQL
    pub fn parse(sql: &str) -> Result<SelectQuery> {
        let ast = Parser::parse_sql(&SqlDialect, sql)?;

        // We only support single statements
        if ast.len() != 1 {
            return Err(QueryError::Parse(
                "only a single statement is supported".to_string(),
            ));
        }

        match &ast[0] {
            Statement::Query(query) => Self::parse_query(query),
            _ => Err(QueryError::Unsupported(
                "only SELECT statements are supported".to_string(),
            )),
        }
    }

    /// Parse a SELECT query
    fn parse_query(query: &ast::Query) -> Result<SelectQuery> {
        if query.with.is_some() {
            return Err(unsupported("WITH clauses"));
        }
        if query.fetch.is_some() {
            return Err(unsupported("FETCH, use LIMIT instead"));
        }
        if !query.locks.is_empty() {
            return Err(unsupported("locking clauses"));
        }
        if !query.limit_by.is_empty() {
            return Err(unsupported("LIMIT BY"));
        }
        if query.for_clause.is_some() || query.settings.is_some() || query.format_clause.is_some() {
            return Err(unsupported("FOR, SETTINGS and FORMAT clauses"));
        }

        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            _ => return Err(unsupported("set operations and VALUES")),
        };

        if select.distinct.is_some() {
            return Err(unsupported("DISTINCT"));
        }
        if !matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if exprs.is_empty()) {
            return Err(unsupported("GROUP BY"));
        }
        if select.having.is_some() {
            return Err(unsupported("HAVING"));
        }
        if select.top.is_some() {
            return Err(unsupported("TOP, use LIMIT instead"));
        }
        if select.into.is_some() {
            return Err(unsupported("SELECT INTO"));
        }
        if select.qualify.is_some() || !select.named_window.is_empty() {
            return Err(unsupported("window clauses"));
        }
        if select.prewhere.is_some() || !select.lateral_views.is_empty() {
            return Err(unsupported("PREWHERE and LATERAL VIEW"));
        }
        if !select.cluster_by.is_empty()
            || !select.distribute_by.is_empty()
            || !select.sort_by.is_empty()
        {
            return Err(unsupported("CLUSTER BY, DISTRIBUTE BY and SORT BY"));
        }
        if select.connect_by.is_some() || select.value_table_mode.is_some() {
            return Err(unsupported("CONNECT BY and value tables"));
        }

        let source = Self::extract_source(select)?;

        let condition = select
            .selection
            .as_ref()
            .map(Self::convert_expr)
            .transpose()?;

        let projection = select
            .projection
            .iter()
            .map(Self::parse_select_item)
            .collect::<Result<Vec<_>>>()?;

        let order_by = match &query.order_by {
            Some(order_by) => order_by
                .exprs
                .iter()
                .map(|item| -> Result<SortKey> {
                    Ok(SortKey {
                        expr: Self::convert_expr(&item.expr)?,
                        descending: item.asc == Some(false),
                        nulls_first: item.nulls_first.unwrap_or(true),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let offset = query
            .offset
            .as_ref()
            .map(|offset| Self::parse_count(&offset.value, "OFFSET"))
            .transpose()?;
        let limit = query
            .limit
            .as_ref()
            .map(|limit| Self::parse_count(limit, "LIMIT"))
            .transpose()?;

        Ok(SelectQuery {
            source,
            condition,
            projection,
            order_by,
            offset,
            limit,
        })
    }

    /// Helper: Extract the source URL from the FROM clause
    fn extract_source(select: &ast::Select) -> Result<String> {
        let table = match select.from.as_slice() {
            [] => return Err(QueryError::Parse("no data source in FROM".to_string())),
            [table] => table,
            _ => return Err(unsupported("more than one data source")),
        };

        if !table.joins.is_empty() {
            return Err(unsupported("JOIN"));
        }

        match &table.relation {
            TableFactor::Table { name, .. } => Ok(name
                .0
                .iter()
                .map(|i| i.value.clone())
                .collect::<Vec<_>>()
                .join(".")),
            _ => Err(unsupported("data sources other than a URL")),
        }
    }

    /// Helper: Parse one SELECT list item
    fn parse_select_item(item: &SelectItem) -> Result<Projection> {
        match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => Ok(Projection::Wildcard),
            SelectItem::UnnamedExpr(expr) => {
                let name = match expr {
                    SqlExpr::Identifier(ident) => ident.value.clone(),
                    SqlExpr::CompoundIdentifier(idents) => idents
                        .last()
                        .map(|i| i.value.clone())
                        .unwrap_or_else(|| expr.to_string()),
                    other => other.to_string(),
                };
                Ok(Projection::Expr {
                    expr: Self::convert_expr(expr)?,
                    name,
                })
            }
            SelectItem::ExprWithAlias { expr, alias } => Ok(Projection::Expr {
                expr: Self::convert_expr(expr)?,
                name: alias.value.clone(),
            }),
        }
    }

    /// Helper: Parse a LIMIT/OFFSET count
    fn parse_count(expr: &SqlExpr, clause: &str) -> Result<usize> {
        match expr {
            SqlExpr::Value(SqlValue::Number(n, _)) => n.parse().map_err(|_| {
                QueryError::Parse(format!("{} must be a non-negative integer, got {}", clause, n))
            }),
            _ => Err(QueryError::Parse(format!(
                "{} must be an integer literal, got {}",
                clause, expr
            ))),
        }
    }

    /// Helper: Convert a sqlparser expression into our Expr
    fn convert_expr(expr: &SqlExpr) -> Result<Expr> {
        match expr {
            SqlExpr::Identifier(ident) => Ok(Expr::Column(ident.value.clone())),
            SqlExpr::CompoundIdentifier(idents) => idents
                .last()
                .map(|i| Expr::Column(i.value.clone()))
                .ok_or_else(|| unsupported("empty identifier")),
            SqlExpr::Value(value) => Ok(Expr::Literal(Self::convert_value(value)?)),
            SqlExpr::Nested(inner) => Self::convert_expr(inner),
            SqlExpr::UnaryOp { op, expr } => {
                let inner = Self::convert_expr(expr)?;
                match op {
                    UnaryOperator::Plus => Ok(inner),
                    UnaryOperator::Minus => Ok(Expr::Unary {
                        op: UnaryOp::Negate,
                        expr: Box::new(inner),
                    }),
                    UnaryOperator::Not => Ok(Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(inner),
                    }),
                    other => Err(unsupported(format!("unary operator {}", other))),
                }
            }
            SqlExpr::BinaryOp { left, op, right } => Ok(Expr::binary(
                Self::convert_expr(left)?,
                Self::convert_operator(op)?,
                Self::convert_expr(right)?,
            )),
            SqlExpr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(Self::convert_expr(inner)?),
                negated: false,
            }),
            SqlExpr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(Self::convert_expr(inner)?),
                negated: true,
            }),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => Ok(Expr::InList {
                expr: Box::new(Self::convert_expr(expr)?),
                list: list
                    .iter()
                    .map(Self::convert_expr)
                    .collect::<Result<Vec<_>>>()?,
                negated: *negated,
            }),
            SqlExpr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Expr::Between {
                expr: Box::new(Self::convert_expr(expr)?),
                low: Box::new(Self::convert_expr(low)?),
                high: Box::new(Self::convert_expr(high)?),
                negated: *negated,
            }),
            SqlExpr::Like {
                negated,
                any,
                expr,
                pattern,
                escape_char,
            } => Self::convert_like(expr, pattern, escape_char, *any, *negated, false),
            SqlExpr::ILike {
                negated,
                any,
                expr,
                pattern,
                escape_char,
            } => Self::convert_like(expr, pattern, escape_char, *any, *negated, true),
            other => Err(unsupported(format!("expression {}", other))),
        }
    }

    fn convert_like(
        expr: &SqlExpr,
        pattern: &SqlExpr,
        escape_char: &Option<String>,
        any: bool,
        negated: bool,
        case_insensitive: bool,
    ) -> Result<Expr> {
        if any {
            return Err(unsupported("LIKE ANY"));
        }
        let pattern = match pattern {
            SqlExpr::Value(SqlValue::SingleQuotedString(s))
            | SqlExpr::Value(SqlValue::DoubleQuotedString(s)) => s.clone(),
            other => return Err(unsupported(format!("LIKE pattern {}", other))),
        };
        let escape = match escape_char.as_deref() {
            None => None,
            Some(escape) => {
                let mut chars = escape.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(QueryError::Parse(format!(
                            "ESCAPE must be a single character, got '{}'",
                            escape
                        )))
                    }
                }
            }
        };
        Ok(Expr::Like {
            expr: Box::new(Self::convert_expr(expr)?),
            pattern,
            escape,
            negated,
            case_insensitive,
        })
    }

    /// Helper: Map a binary operator
    fn convert_operator(op: &BinaryOperator) -> Result<BinaryOp> {
        match op {
            BinaryOperator::Plus => Ok(BinaryOp::Plus),
            BinaryOperator::Minus => Ok(BinaryOp::Minus),
            BinaryOperator::Multiply => Ok(BinaryOp::Multiply),
            BinaryOperator::Divide => Ok(BinaryOp::Divide),
            BinaryOperator::Modulo => Ok(BinaryOp::Modulo),
            BinaryOperator::Eq => Ok(BinaryOp::Eq),
            BinaryOperator::NotEq => Ok(BinaryOp::NotEq),
            BinaryOperator::Lt => Ok(BinaryOp::Lt),
            BinaryOperator::LtEq => Ok(BinaryOp::LtEq),
            BinaryOperator::Gt => Ok(BinaryOp::Gt),
            BinaryOperator::GtEq => Ok(BinaryOp::GtEq),
            BinaryOperator::And => Ok(BinaryOp::And),
            BinaryOperator::Or => Ok(BinaryOp::Or),
            other => Err(unsupported(format!("operator {}", other))),
        }
    }

    /// Helper: Parse a single SQL literal
    fn convert_value(value: &SqlValue) -> Result<Value> {
        match value {
            SqlValue::Number(n, _) => {
                let is_integer = !n.contains(['.', 'e', 'E']);
                match n.parse::<i64>() {
                    Ok(i) if is_integer => Ok(Value::Integer(i)),
                    // Too large for i64, or written with a fraction/exponent
                    _ => n
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| QueryError::Parse(format!("invalid number: {}", n))),
                }
            }
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                Ok(Value::Text(s.clone()))
            }
            SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
            SqlValue::Null => Ok(Value::Null),
            other => Err(unsupported(format!("literal {}", other))),
        }
    }
}

fn unsupported(what: impl std::fmt::Display) -> QueryError {
    QueryError::Unsupported(what.to_string())
}
