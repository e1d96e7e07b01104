// Query module - handles SQL parsing and execution
pub mod dialect;
pub mod executor;
pub mod expr;
pub mod parser;

pub use executor::QueryExecutor;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use parser::{Projection, QueryParser, SelectQuery, SortKey};
