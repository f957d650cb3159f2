use super::{ExpressionConverter, ExpressionPlugin};
use crate::core::Result;
use crate::parser::ast::SelectExpr;
use sqlparser::ast as sql_ast;

pub struct BetweenPlugin;

impl ExpressionPlugin for BetweenPlugin {
    fn name(&self) -> &'static str {
        "BETWEEN"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::Between { .. })
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr> {
        match expr {
            sql_ast::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let expr = Box::new(converter.convert(*expr)?);
                let low = Box::new(converter.convert(*low)?);
                let high = Box::new(converter.convert(*high)?);
                Ok(SelectExpr::Between {
                    expr,
                    low,
                    high,
                    negated,
                })
            }
            _ => unreachable!("BetweenPlugin called with non-BETWEEN expression"),
        }
    }
}
