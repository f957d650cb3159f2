use super::{ExpressionConverter, ExpressionPlugin};
use crate::core::{PersistError, Result};
use crate::parser::ast::SelectExpr;
use sqlparser::ast as sql_ast;

pub struct LikePlugin;

impl ExpressionPlugin for LikePlugin {
    fn name(&self) -> &'static str {
        "LIKE"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(
            expr,
            sql_ast::Expr::Like { .. } | sql_ast::Expr::ILike { .. }
        )
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr> {
        let (negated, expr, pattern, has_escape, case_insensitive) = match expr {
            sql_ast::Expr::Like {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => (negated, expr, pattern, escape_char.is_some(), false),
            sql_ast::Expr::ILike {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => (negated, expr, pattern, escape_char.is_some(), true),
            _ => unreachable!("LikePlugin called with non-LIKE expression"),
        };

        if has_escape {
            return Err(PersistError::UnsupportedOperation(
                "LIKE ESCAPE not supported".into(),
            ));
        }

        Ok(SelectExpr::Like {
            expr: Box::new(converter.convert(*expr)?),
            pattern: Box::new(converter.convert(*pattern)?),
            negated,
            case_insensitive,
        })
    }
}
