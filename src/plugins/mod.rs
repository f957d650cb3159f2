pub mod arithmetic;
pub mod between;
pub mod comparison;
pub mod in_list;
pub mod is_null;
pub mod like;
pub mod nested;
mod boolean;

use crate::core::{PersistError, Result, Value};
use crate::parser::ast::{CompareOp, Placeholder, SelectExpr};
use sqlparser::ast as sql_ast;
use std::cell::Cell;

/// Converts one family of `sqlparser` expressions into a `SelectExpr`.
pub trait ExpressionPlugin: Send + Sync {
    /// Plugin name for diagnostics.
    fn name(&self) -> &'static str;

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool;

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<SelectExpr>;
}

pub struct ExpressionPluginRegistry {
    plugins: Vec<Box<dyn ExpressionPlugin>>,
}

impl ExpressionPluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ExpressionPlugin>) {
        log::trace!("registered select expression plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn with_default_plugins() -> Self {
        let mut registry = Self::new();

        // Nested first so parentheses unwrap before anything else looks.
        registry.register(Box::new(nested::NestedPlugin));
        registry.register(Box::new(like::LikePlugin));
        registry.register(Box::new(between::BetweenPlugin));
        registry.register(Box::new(is_null::IsNullPlugin));
        registry.register(Box::new(arithmetic::ArithmeticPlugin));
        registry.register(Box::new(comparison::ComparisonPlugin));
        registry.register(Box::new(in_list::InListPlugin));
        registry.register(Box::new(boolean::BooleanPlugin));

        registry
    }

    pub fn find_plugin(&self, expr: &sql_ast::Expr) -> Option<&dyn ExpressionPlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.can_handle(expr))
            .map(|boxed| &**boxed)
    }
}

impl Default for ExpressionPluginRegistry {
    fn default() -> Self {
        Self::with_default_plugins()
    }
}

/// Plugin driven converter. Holds the positional placeholder counter, so one
/// converter is used per parsed clause.
pub struct ExpressionConverter {
    registry: ExpressionPluginRegistry,
    next_positional: Cell<usize>,
}

impl ExpressionConverter {
    pub fn new() -> Self {
        Self::with_custom_plugins(ExpressionPluginRegistry::with_default_plugins())
    }

    pub fn with_custom_plugins(registry: ExpressionPluginRegistry) -> Self {
        Self {
            registry,
            next_positional: Cell::new(0),
        }
    }

    /// Positional parameters referenced so far: the `?` count or the highest `$n`.
    pub fn positional_count(&self) -> usize {
        self.next_positional.get()
    }

    pub fn convert(&self, expr: sql_ast::Expr) -> Result<SelectExpr> {
        match &expr {
            sql_ast::Expr::Identifier(ident) => {
                return Ok(SelectExpr::Column(ident.value.clone()));
            }
            sql_ast::Expr::CompoundIdentifier(idents) => {
                // Table qualifiers are irrelevant against a single table.
                let name = idents.last().map(|ident| ident.value.clone()).unwrap_or_default();
                return Ok(SelectExpr::Column(name));
            }
            sql_ast::Expr::Value(val) => {
                return self.convert_value(&val.value);
            }
            _ => {}
        }

        if let Some(plugin) = self.registry.find_plugin(&expr) {
            return plugin.convert(expr, self);
        }

        Err(PersistError::UnsupportedOperation(format!(
            "Unsupported select expression: {}",
            expr
        )))
    }

    pub fn convert_value(&self, val: &sql_ast::Value) -> Result<SelectExpr> {
        let literal = match val {
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    Value::Integer(i)
                } else if let Ok(f) = n.parse::<f64>() {
                    Value::Float(f)
                } else {
                    return Err(PersistError::Parse(format!("Invalid number: {}", n)));
                }
            }
            sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
                Value::Text(s.clone())
            }
            sql_ast::Value::Boolean(b) => Value::Boolean(*b),
            sql_ast::Value::Null => Value::Null,
            sql_ast::Value::Placeholder(raw) => {
                return Ok(SelectExpr::Placeholder(self.convert_placeholder(raw)?));
            }
            _ => {
                return Err(PersistError::UnsupportedOperation(format!(
                    "Unsupported value: {}",
                    val
                )));
            }
        };
        Ok(SelectExpr::Literal(literal))
    }

    fn convert_placeholder(&self, raw: &str) -> Result<Placeholder> {
        if raw == "?" {
            let index = self.next_positional.get();
            self.next_positional.set(index + 1);
            return Ok(Placeholder::Positional(index));
        }
        if let Some(number) = raw.strip_prefix('$') {
            let position: usize = number
                .parse()
                .map_err(|_| PersistError::Parse(format!("Invalid placeholder '{}'", raw)))?;
            if position == 0 {
                return Err(PersistError::Parse("Placeholders are numbered from $1".into()));
            }
            if position > self.next_positional.get() {
                self.next_positional.set(position);
            }
            return Ok(Placeholder::Positional(position - 1));
        }
        if let Some(name) = raw.strip_prefix(':') {
            if !name.is_empty() {
                return Ok(Placeholder::Named(name.to_string()));
            }
        }
        Err(PersistError::Parse(format!("Invalid placeholder '{}'", raw)))
    }

    pub fn convert_compare_op(&self, op: &sql_ast::BinaryOperator) -> Result<CompareOp> {
        use sql_ast::BinaryOperator as SqlOp;

        match op {
            SqlOp::Eq => Ok(CompareOp::Eq),
            SqlOp::NotEq => Ok(CompareOp::NotEq),
            SqlOp::Lt => Ok(CompareOp::Lt),
            SqlOp::LtEq => Ok(CompareOp::LtEq),
            SqlOp::Gt => Ok(CompareOp::Gt),
            SqlOp::GtEq => Ok(CompareOp::GtEq),
            _ => Err(PersistError::UnsupportedOperation(format!(
                "Unsupported comparison operator: {}",
                op
            ))),
        }
    }
}

impl Default for ExpressionConverter {
    fn default() -> Self {
        Self::new()
    }
}
