use crate::core::{PersistError, Result};
use crate::parser::ast::SelectExpr;
use crate::plugins::ExpressionConverter;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

/// A compiled select clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSelect {
    pub expr: SelectExpr,
    /// Positional parameters referenced, which must match the supplied params.
    pub positional_count: usize,
}

/// Parses raw `WHERE`-style fragments such as `userid = ? AND status IN (1, 2)`.
pub struct SelectParserAdapter {
    dialect: GenericDialect,
}

impl SelectParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    pub fn parse(&self, select: &str) -> Result<ParsedSelect> {
        let mut parser = Parser::new(&self.dialect)
            .try_with_sql(select)
            .map_err(|e| PersistError::Parse(e.to_string()))?;

        let sql_expr = parser
            .parse_expr()
            .map_err(|e| PersistError::Parse(e.to_string()))?;

        let trailing = parser.peek_token();
        if trailing.token != Token::EOF {
            return Err(PersistError::Parse(format!(
                "Unexpected '{}' after select clause",
                trailing.token
            )));
        }

        let converter = ExpressionConverter::new();
        let expr = converter.convert(sql_expr)?;

        Ok(ParsedSelect {
            expr,
            positional_count: converter.positional_count(),
        })
    }
}

impl Default for SelectParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}
