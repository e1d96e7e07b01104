// Expressions
// The parser converts sqlparser's AST into this smaller tree, which only
// holds what the executor can evaluate against a row

use crate::dataset::{Row, Schema, Value};
use crate::error::{QueryError, Result};
use std::cmp::Ordering;

/// An expression evaluated against one row at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a column of the source
    Column(String),
    /// A constant value
    Literal(Value),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// expr IS [NOT] NULL
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// expr [NOT] IN (a, b, ...)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// expr [NOT] BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// expr [NOT] LIKE 'pattern' [ESCAPE 'c'] (ILIKE when case_insensitive)
    Like {
        expr: Box<Expr>,
        pattern: String,
        escape: Option<char>,
        negated: bool,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Check that every column the expression references exists
    /// Lets a bad column fail even when there are no rows to evaluate
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        match self {
            Expr::Column(name) => schema
                .get_column_index(name)
                .map(|_| ())
                .ok_or_else(|| QueryError::ColumnNotFound(name.clone())),
            Expr::Literal(_) => Ok(()),
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Like { expr, .. } => {
                expr.validate(schema)
            }
            Expr::Binary { left, right, .. } => {
                left.validate(schema)?;
                right.validate(schema)
            }
            Expr::InList { expr, list, .. } => {
                expr.validate(schema)?;
                list.iter().try_for_each(|item| item.validate(schema))
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.validate(schema)?;
                low.validate(schema)?;
                high.validate(schema)
            }
        }
    }

    /// Evaluate the expression for one row
    pub fn evaluate(&self, schema: &Schema, row: &Row) -> Result<Value> {
        match self {
            Expr::Column(name) => {
                let index = schema
                    .get_column_index(name)
                    .ok_or_else(|| QueryError::ColumnNotFound(name.clone()))?;
                Ok(row.values.get(index).cloned().unwrap_or(Value::Null))
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Unary { op, expr } => unary(*op, expr.evaluate(schema, row)?),
            Expr::Binary { left, op, right } => match op {
                BinaryOp::And | BinaryOp::Or => logical(*op, left, right, schema, row),
                _ => binary(left.evaluate(schema, row)?, *op, right.evaluate(schema, row)?),
            },
            Expr::IsNull { expr, negated } => {
                let is_null = expr.evaluate(schema, row)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let value = expr.evaluate(schema, row)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    let item = item.evaluate(schema, row)?;
                    if item.is_null() {
                        saw_null = true;
                    } else if value.compare(&item) == Some(Ordering::Equal) {
                        return Ok(Value::Boolean(!negated));
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Boolean(*negated)
                })
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = expr.evaluate(schema, row)?;
                let above = binary(value.clone(), BinaryOp::GtEq, low.evaluate(schema, row)?)?;
                let below = binary(value, BinaryOp::LtEq, high.evaluate(schema, row)?)?;
                let within = and(&above, &below)?;
                if *negated {
                    unary(UnaryOp::Not, within)
                } else {
                    Ok(within)
                }
            }
            Expr::Like {
                expr,
                pattern,
                escape,
                negated,
                case_insensitive,
            } => {
                let value = expr.evaluate(schema, row)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let matched =
                    like_match(&value.to_string(), pattern, *escape, *case_insensitive);
                Ok(Value::Boolean(matched != *negated))
            }
        }
    }

    /// Evaluate as a filter predicate: only boolean true keeps the row
    pub fn matches(&self, schema: &Schema, row: &Row) -> Result<bool> {
        match self.evaluate(schema, row)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(QueryError::Execution(format!(
                "filter condition must be boolean, got {}",
                other
            ))),
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| QueryError::Execution("integer overflow".to_string())),
        (UnaryOp::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, other) => Err(QueryError::Execution(format!(
            "NOT expects a boolean, got {}",
            other
        ))),
        (UnaryOp::Negate, other) => Err(QueryError::Execution(format!("cannot negate {}", other))),
    }
}

/// AND/OR with short-circuit evaluation
fn logical(op: BinaryOp, left: &Expr, right: &Expr, schema: &Schema, row: &Row) -> Result<Value> {
    let left = expect_boolean(left.evaluate(schema, row)?)?;
    match (op, &left) {
        (BinaryOp::And, Value::Boolean(false)) => return Ok(Value::Boolean(false)),
        (BinaryOp::Or, Value::Boolean(true)) => return Ok(Value::Boolean(true)),
        _ => {}
    }
    let right = expect_boolean(right.evaluate(schema, row)?)?;
    if op == BinaryOp::And {
        and(&left, &right)
    } else {
        or(&left, &right)
    }
}

fn expect_boolean(value: Value) -> Result<Value> {
    match value {
        Value::Boolean(_) | Value::Null => Ok(value),
        other => Err(QueryError::Execution(format!(
            "expected a boolean operand, got {}",
            other
        ))),
    }
}

// Kleene logic: false dominates AND, true dominates OR, otherwise NULL is contagious
fn and(left: &Value, right: &Value) -> Result<Value> {
    Ok(match (left, right) {
        (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
        (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
        _ => Value::Null,
    })
}

fn or(left: &Value, right: &Value) -> Result<Value> {
    Ok(match (left, right) {
        (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
        (Value::Boolean(false), Value::Boolean(false)) => Value::Boolean(false),
        _ => Value::Null,
    })
}

fn binary(left: Value, op: BinaryOp, right: Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match op {
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => {
            let ordering = left.compare(&right).ok_or_else(|| {
                QueryError::Execution(format!(
                    "cannot compare {:?} with {:?}",
                    left.data_type(),
                    right.data_type()
                ))
            })?;
            let result = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::NotEq => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }
        BinaryOp::And => and(&expect_boolean(left)?, &expect_boolean(right)?),
        BinaryOp::Or => or(&expect_boolean(left)?, &expect_boolean(right)?),
        _ => arithmetic(left, op, right),
    }
}

fn arithmetic(left: Value, op: BinaryOp, right: Value) -> Result<Value> {
    let overflow = || QueryError::Execution("integer overflow".to_string());

    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Plus => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
                BinaryOp::Minus => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
                BinaryOp::Multiply => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
                BinaryOp::Divide if b == 0 => Ok(Value::Null),
                BinaryOp::Divide => Ok(Value::Float(a as f64 / b as f64)),
                BinaryOp::Modulo if b == 0 => Ok(Value::Null),
                _ => a.checked_rem(b).map(Value::Integer).ok_or_else(overflow),
            }
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(match op {
                BinaryOp::Plus => Value::Float(a + b),
                BinaryOp::Minus => Value::Float(a - b),
                BinaryOp::Multiply => Value::Float(a * b),
                BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => Value::Null,
                BinaryOp::Divide => Value::Float(a / b),
                _ => Value::Float(a % b),
            }),
            _ => Err(QueryError::Execution(format!(
                "arithmetic on non-numeric values: {} and {}",
                left, right
            ))),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    Char(char),
}

/// Split a LIKE pattern into wildcards and literal characters
/// The escape character makes the next character literal; a trailing one is literal itself
fn like_tokens(pattern: &str, escape: Option<char>, case_insensitive: bool) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let literal = match c {
            c if Some(c) == escape => chars.next().unwrap_or(c),
            '%' => {
                tokens.push(LikeToken::AnyRun);
                continue;
            }
            '_' => {
                tokens.push(LikeToken::AnyOne);
                continue;
            }
            c => c,
        };
        if case_insensitive {
            tokens.extend(literal.to_lowercase().map(LikeToken::Char));
        } else {
            tokens.push(LikeToken::Char(literal));
        }
    }
    tokens
}

/// SQL LIKE: % matches any run of characters, _ matches exactly one
fn like_match(text: &str, pattern: &str, escape: Option<char>, case_insensitive: bool) -> bool {
    let text: Vec<char> = if case_insensitive {
        text.chars().flat_map(char::to_lowercase).collect()
    } else {
        text.chars().collect()
    };
    let pattern = like_tokens(pattern, escape, case_insensitive);

    let (mut t, mut p) = (0, 0);
    // position of the last % seen, and the text position it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(LikeToken::AnyOne) => true,
            Some(LikeToken::Char(c)) => *c == text[t],
            _ => false,
        };
        if step {
            t += 1;
            p += 1;
        } else if pattern.get(p) == Some(&LikeToken::AnyRun) {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|token| *token == LikeToken::AnyRun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, DataType};

    fn schema() -> Schema {
        Schema::new(vec![
            Column {
                name: "name".into(),
                data_type: DataType::Text,
            },
            Column {
                name: "age".into(),
                data_type: DataType::Integer,
            },
            Column {
                name: "score".into(),
                data_type: DataType::Float,
            },
        ])
    }

    fn row(name: &str, age: Option<i64>, score: f64) -> Row {
        Row::new(vec![
            Value::Text(name.into()),
            age.map(Value::Integer).unwrap_or(Value::Null),
            Value::Float(score),
        ])
    }

    fn eval(expr: &Expr, row: &Row) -> Value {
        expr.evaluate(&schema(), row).unwrap()
    }

    #[test]
    fn test_comparison_across_numeric_types() {
        let expr = Expr::binary(
            Expr::column("age"),
            BinaryOp::GtEq,
            Expr::literal(Value::Float(17.5)),
        );
        assert_eq!(eval(&expr, &row("a", Some(18), 1.0)), Value::Boolean(true));
        assert_eq!(eval(&expr, &row("a", Some(17), 1.0)), Value::Boolean(false));
        assert_eq!(eval(&expr, &row("a", None, 1.0)), Value::Null);
    }

    #[test]
    fn test_kleene_logic() {
        let null_cmp = Expr::binary(
            Expr::column("age"),
            BinaryOp::Gt,
            Expr::literal(Value::Integer(1)),
        );
        let falsy = Expr::literal(Value::Boolean(false));
        let truthy = Expr::literal(Value::Boolean(true));
        let r = row("a", None, 0.0);

        assert_eq!(
            eval(&Expr::binary(null_cmp.clone(), BinaryOp::And, falsy), &r),
            Value::Boolean(false)
        );
        assert_eq!(
            eval(&Expr::binary(null_cmp.clone(), BinaryOp::Or, truthy.clone()), &r),
            Value::Boolean(true)
        );
        assert_eq!(eval(&Expr::binary(null_cmp, BinaryOp::And, truthy), &r), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        let r = row("a", Some(7), 0.5);
        let add = Expr::binary(
            Expr::column("age"),
            BinaryOp::Plus,
            Expr::literal(Value::Integer(3)),
        );
        assert_eq!(eval(&add, &r), Value::Integer(10));

        let div = Expr::binary(
            Expr::column("age"),
            BinaryOp::Divide,
            Expr::literal(Value::Integer(2)),
        );
        assert_eq!(eval(&div, &r), Value::Float(3.5));

        let by_zero = Expr::binary(
            Expr::column("age"),
            BinaryOp::Modulo,
            Expr::literal(Value::Integer(0)),
        );
        assert_eq!(eval(&by_zero, &r), Value::Null);

        let mixed = Expr::binary(Expr::column("score"), BinaryOp::Multiply, Expr::column("age"));
        assert_eq!(eval(&mixed, &r), Value::Float(3.5));

        let overflow = Expr::binary(
            Expr::literal(Value::Integer(i64::MAX)),
            BinaryOp::Plus,
            Expr::literal(Value::Integer(1)),
        );
        assert!(matches!(
            overflow.evaluate(&schema(), &r),
            Err(QueryError::Execution(_))
        ));
    }

    #[test]
    fn test_in_list_and_between() {
        let r = row("bob", Some(30), 0.0);
        let in_list = Expr::InList {
            expr: Box::new(Expr::column("age")),
            list: vec![Expr::literal(Value::Integer(1)), Expr::literal(Value::Integer(30))],
            negated: false,
        };
        assert_eq!(eval(&in_list, &r), Value::Boolean(true));

        let not_in_with_null = Expr::InList {
            expr: Box::new(Expr::column("age")),
            list: vec![Expr::literal(Value::Integer(1)), Expr::literal(Value::Null)],
            negated: true,
        };
        assert_eq!(eval(&not_in_with_null, &r), Value::Null);

        let between = Expr::Between {
            expr: Box::new(Expr::column("age")),
            low: Box::new(Expr::literal(Value::Integer(18))),
            high: Box::new(Expr::literal(Value::Integer(30))),
            negated: false,
        };
        assert_eq!(eval(&between, &r), Value::Boolean(true));
    }

    #[test]
    fn test_like() {
        let like = |text: &str, pattern: &str| like_match(text, pattern, None, false);
        assert!(like("Albania", "Al%"));
        assert!(like("Albania", "%ban%"));
        assert!(like("cat", "c_t"));
        assert!(!like("cart", "c_t"));
        assert!(like("", "%"));
        assert!(like("abcabd", "%abd"));

        let ilike = Expr::Like {
            expr: Box::new(Expr::column("name")),
            pattern: "BO%".into(),
            escape: None,
            negated: false,
            case_insensitive: true,
        };
        assert_eq!(eval(&ilike, &row("bob", None, 0.0)), Value::Boolean(true));
    }

    #[test]
    fn test_like_escape() {
        assert!(like_match("a%b", "a!%b", Some('!'), false));
        assert!(!like_match("axb", "a!%b", Some('!'), false));
        assert!(like_match("a_b%", "a!_b%", Some('!'), false));
        assert!(!like_match("axb", "a!_b", Some('!'), false));
        assert!(like_match("a!b", "a!!b", Some('!'), false));
        assert!(!like_match("50%", "50!", Some('!'), false));
        assert!(like_match("50!", "50!", Some('!'), false));

        // an uppercase escape character survives ILIKE
        assert!(like_match("x%Y", "X\\%y", Some('\\'), true));
        assert!(like_match("x%y", "XQ%Y", Some('Q'), true));
        assert!(!like_match("xzy", "XQ%Y", Some('Q'), true));
    }

    #[test]
    fn test_errors() {
        let r = row("a", Some(1), 0.0);
        let missing = Expr::column("nope");
        assert!(matches!(
            missing.evaluate(&schema(), &r),
            Err(QueryError::ColumnNotFound(c)) if c == "nope"
        ));
        assert!(missing.validate(&schema()).is_err());

        let bad_cmp = Expr::binary(
            Expr::column("name"),
            BinaryOp::Gt,
            Expr::literal(Value::Integer(1)),
        );
        assert!(matches!(
            bad_cmp.evaluate(&schema(), &r),
            Err(QueryError::Execution(_))
        ));

        let not_bool = Expr::column("age");
        assert!(not_bool.matches(&schema(), &r).is_err());
    }
}
