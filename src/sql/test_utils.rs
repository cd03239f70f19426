//! Parse rendered SQL back with `sqlparser` to prove it is well formed.

use sqlparser::dialect::{
    Dialect as ParserDialect, DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

fn parser_for(dialect: Dialect) -> Box<dyn ParserDialect> {
    match dialect {
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
    }
}

/// `Err` carries the parser message and the offending statement.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser = parser_for(dialect);
    match Parser::parse_sql(parser.as_ref(), sql) {
        Ok(statements) if statements.len() == 1 => Ok(()),
        Ok(statements) => Err(format!(
            "expected one {} statement, got {}:\n{}",
            dialect,
            statements.len(),
            sql
        )),
        Err(e) => Err(format!("{} rejected the query: {}\n{}", dialect, e, sql)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_engine_specific_paging() {
        validate_sql("SELECT \"a\" FROM \"t\" LIMIT 5 OFFSET 10", Dialect::DuckDb).unwrap();
        validate_sql(
            "SELECT [a] FROM [t] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY",
            Dialect::TSql,
        )
        .unwrap();
    }

    #[test]
    fn test_rejects_garbage_and_multiple_statements() {
        assert!(validate_sql("SELEC a FORM t", Dialect::Postgres).is_err());
        assert!(validate_sql("SELECT 1; SELECT 2", Dialect::MySql).is_err());
    }
}
