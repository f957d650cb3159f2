use super::{ExpressionConverter, ExpressionPlugin};
use crate::core::Result;
use crate::parser::ast::SelectExpr;
use sqlparser::ast as sql_ast;

pub struct ComparisonPlugin;

impl ExpressionPlugin for ComparisonPlugin {
    fn name(&self) -> &'static str {
        "COMPARISON"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        if let sql_ast::Expr::BinaryOp { op, .. } = expr {
            matches!(
                op,
                sql_ast::BinaryOperator::Eq
                    | sql_ast::BinaryOperator::NotEq
                    | sql_ast::BinaryOperator::Lt
                    | sql_ast::BinaryOperator::LtEq
                    | sql_ast::BinaryOperator::Gt
                    | sql_ast::BinaryOperator::GtEq
            )
        } else {
            false
        }
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr> {
        match expr {
            sql_ast::Expr::BinaryOp { left, op, right } => {
                // Left is converted first so `?` numbering follows the text.
                let left = Box::new(converter.convert(*left)?);
                let op = converter.convert_compare_op(&op)?;
                let right = Box::new(converter.convert(*right)?);
                Ok(SelectExpr::Compare { left, op, right })
            }
            _ => unreachable!("ComparisonPlugin called with non-comparison expression"),
        }
    }
}
