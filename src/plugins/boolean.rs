use super::{ExpressionConverter, ExpressionPlugin};
use crate::core::Result;
use crate::parser::ast::{LogicalOp, SelectExpr};
use sqlparser::ast as sql_ast;

pub struct BooleanPlugin;

impl ExpressionPlugin for BooleanPlugin {
    fn name(&self) -> &'static str {
        "BOOLEAN"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        match expr {
            sql_ast::Expr::BinaryOp { op, .. } => {
                matches!(
                    op,
                    sql_ast::BinaryOperator::And | sql_ast::BinaryOperator::Or
                )
            }
            sql_ast::Expr::UnaryOp { op, .. } => {
                matches!(op, sql_ast::UnaryOperator::Not)
            }
            _ => false,
        }
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr> {
        match expr {
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let left = Box::new(converter.convert(*left)?);
                let op = match op {
                    sql_ast::BinaryOperator::And => LogicalOp::And,
                    sql_ast::BinaryOperator::Or => LogicalOp::Or,
                    _ => unreachable!("BooleanPlugin called with non-logical operator"),
                };
                let right = Box::new(converter.convert(*right)?);
                Ok(SelectExpr::Logical { left, op, right })
            }
            sql_ast::Expr::UnaryOp { op, expr } => match op {
                sql_ast::UnaryOperator::Not => {
                    Ok(SelectExpr::Not(Box::new(converter.convert(*expr)?)))
                }
                _ => unreachable!("BooleanPlugin called with non-NOT unary operator"),
            },
            _ => unreachable!("BooleanPlugin called with non-boolean expression"),
        }
    }
}
