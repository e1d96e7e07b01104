// SQL dialect
// Identical to a generic dialect except identifiers may contain URL
// characters, so `FROM https://host/data.csv?raw=true` lexes as one name.
// Only backticks quote identifiers; "..." is a string literal

use sqlparser::dialect::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlDialect;

impl Dialect for SqlDialect {
    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        ch.is_ascii_alphanumeric() || [':', '/', '?', '&', '=', '-', '_', '.'].contains(&ch)
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        ch == '`'
    }
}
