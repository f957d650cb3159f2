use super::{ExpressionConverter, ExpressionPlugin};
use crate::core::Result;
use crate::parser::ast::SelectExpr;
use sqlparser::ast as sql_ast;

/// Unary sign operators, which is how `sqlparser` reads negative literals.
pub struct ArithmeticPlugin;

impl ExpressionPlugin for ArithmeticPlugin {
    fn name(&self) -> &'static str {
        "ARITHMETIC"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(
            expr,
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Minus | sql_ast::UnaryOperator::Plus,
                ..
            }
        )
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr> {
        match expr {
            sql_ast::Expr::UnaryOp { op, expr } => {
                let inner = converter.convert(*expr)?;
                match op {
                    sql_ast::UnaryOperator::Plus => Ok(inner),
                    _ => Ok(SelectExpr::Negate(Box::new(inner))),
                }
            }
            _ => unreachable!("ArithmeticPlugin called with non-sign expression"),
        }
    }
}
