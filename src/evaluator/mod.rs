use crate::core::{PersistError, Result, Value};
use crate::expression::eval_like;
use crate::parser::ast::{CompareOp, LogicalOp, Placeholder, SelectExpr};
use crate::parser::ParsedSelect;
use crate::storage::{Record, SelectParams};
use std::cmp::Ordering;

/// Evaluates a compiled select clause against records with bound parameters.
pub struct SelectEvaluator<'a> {
    select: &'a ParsedSelect,
    params: &'a SelectParams,
}

impl<'a> SelectEvaluator<'a> {
    /// Checks that `params` cover every placeholder in `select`.
    pub fn bind(select: &'a ParsedSelect, params: &'a SelectParams) -> Result<Self> {
        let supplied = match params {
            SelectParams::Positional(values) => values.len(),
            _ => 0,
        };
        if select.positional_count > 0 && supplied != select.positional_count {
            return Err(PersistError::Parse(format!(
                "Select expects {} positional parameters, {} supplied",
                select.positional_count, supplied
            )));
        }
        if select.positional_count == 0 && supplied > 0 {
            return Err(PersistError::Parse(format!(
                "Select takes no positional parameters, {} supplied",
                supplied
            )));
        }
        Ok(Self { select, params })
    }

    /// Whether `record` satisfies the clause. Unknown (NULL) counts as false.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        Ok(self.evaluate(&self.select.expr, record)?.as_bool())
    }

    fn evaluate(&self, expr: &SelectExpr, record: &Record) -> Result<Value> {
        match expr {
            SelectExpr::Column(name) => Ok(record.get(name).cloned().unwrap_or(Value::Null)),
            SelectExpr::Literal(value) => Ok(value.clone()),
            SelectExpr::Placeholder(placeholder) => self.resolve(placeholder),
            SelectExpr::Negate(inner) => match self.evaluate(inner, record)? {
                Value::Integer(i) => Ok(Value::Integer(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Null => Ok(Value::Null),
                other => other
                    .as_f64()
                    .map(|f| Value::Float(-f))
                    .ok_or_else(|| {
                        PersistError::TypeMismatch(format!("Cannot negate {}", other.type_name()))
                    }),
            },
            SelectExpr::Compare { left, op, right } => {
                let left = self.evaluate(left, record)?;
                let right = self.evaluate(right, record)?;
                Ok(match compare(&left, &right) {
                    Some(ordering) => Value::Boolean(apply_compare(*op, ordering)),
                    None => Value::Null,
                })
            }
            SelectExpr::Logical { left, op, right } => {
                let left = self.evaluate(left, record)?;
                match op {
                    LogicalOp::And if !left.is_null() && !left.as_bool() => Ok(Value::Boolean(false)),
                    LogicalOp::Or if left.as_bool() => Ok(Value::Boolean(true)),
                    _ => {
                        let right = self.evaluate(right, record)?;
                        Ok(three_valued(*op, &left, &right))
                    }
                }
            }
            SelectExpr::Not(inner) => match self.evaluate(inner, record)? {
                Value::Null => Ok(Value::Null),
                value => Ok(Value::Boolean(!value.as_bool())),
            },
            SelectExpr::IsNull { expr, negated } => {
                let is_null = self.evaluate(expr, record)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            SelectExpr::In {
                expr,
                list,
                negated,
            } => {
                let needle = self.evaluate(expr, record)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut found = false;
                for item in list {
                    let candidate = self.evaluate(item, record)?;
                    if compare(&needle, &candidate) == Some(Ordering::Equal) {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Boolean(found != *negated))
            }
            SelectExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = self.evaluate(expr, record)?;
                let low = self.evaluate(low, record)?;
                let high = self.evaluate(high, record)?;
                match (compare(&value, &low), compare(&value, &high)) {
                    (Some(lower), Some(upper)) => {
                        let inside = lower != Ordering::Less && upper != Ordering::Greater;
                        Ok(Value::Boolean(inside != *negated))
                    }
                    _ => Ok(Value::Null),
                }
            }
            SelectExpr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let value = self.evaluate(expr, record)?;
                let pattern = self.evaluate(pattern, record)?;
                if value.is_null() || pattern.is_null() {
                    return Ok(Value::Null);
                }
                let matched = eval_like(
                    &value.to_string(),
                    &pattern.to_string(),
                    !*case_insensitive,
                )?;
                Ok(Value::Boolean(matched != *negated))
            }
        }
    }

    fn resolve(&self, placeholder: &Placeholder) -> Result<Value> {
        match (placeholder, self.params) {
            (Placeholder::Positional(index), SelectParams::Positional(values)) => {
                values.get(*index).cloned().ok_or_else(|| {
                    PersistError::Parse(format!("Missing positional parameter ${}", index + 1))
                })
            }
            (Placeholder::Named(name), SelectParams::Named(values)) => values
                .get(name)
                .cloned()
                .ok_or_else(|| PersistError::Parse(format!("Missing named parameter :{}", name))),
            (Placeholder::Positional(index), _) => Err(PersistError::Parse(format!(
                "Missing positional parameter ${}",
                index + 1
            ))),
            (Placeholder::Named(name), _) => Err(PersistError::Parse(format!(
                "Missing named parameter :{}",
                name
            ))),
        }
    }
}

/// SQL comparison: `None` when either side is NULL or the types are unrelated.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (a, b) if a.is_numeric() && b.is_numeric() => Some(a.compare(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), other) | (other, Value::Boolean(a)) if other.is_numeric() => {
            let flipped = matches!(left, Value::Boolean(_));
            let ordering = Value::Integer(i64::from(*a)).compare(other);
            Some(if flipped { ordering } else { ordering.reverse() })
        }
        (number, text) if number.is_numeric() && text.is_numeric_text() => number
            .as_f64()
            .zip(text.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (text, number) if number.is_numeric() && text.is_numeric_text() => text
            .as_f64()
            .zip(number.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        _ => None,
    }
}

fn apply_compare(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    }
}

fn three_valued(op: LogicalOp, left: &Value, right: &Value) -> Value {
    let truth = |value: &Value| (!value.is_null()).then(|| value.as_bool());
    match (op, truth(left), truth(right)) {
        (LogicalOp::And, Some(false), _) | (LogicalOp::And, _, Some(false)) => Value::Boolean(false),
        (LogicalOp::And, Some(true), Some(true)) => Value::Boolean(true),
        (LogicalOp::Or, Some(true), _) | (LogicalOp::Or, _, Some(true)) => Value::Boolean(true),
        (LogicalOp::Or, Some(false), Some(false)) => Value::Boolean(false),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SelectParserAdapter;

    fn matches(select: &str, params: SelectParams, record: &Record) -> bool {
        let parsed = SelectParserAdapter::new().parse(select).unwrap();
        SelectEvaluator::bind(&parsed, &params)
            .unwrap()
            .matches(record)
            .unwrap()
    }

    fn row() -> Record {
        Record::new()
            .with("id", 3)
            .with("name", "Alice")
            .with("status", 1)
            .with("description", Value::Null)
    }

    #[test]
    fn test_comparisons_and_logic() {
        let record = row();
        assert!(matches("id = 3 AND name = 'Alice'", SelectParams::None, &record));
        assert!(matches("id > 5 OR status = 1", SelectParams::None, &record));
        assert!(!matches("NOT (status = 1)", SelectParams::None, &record));
        assert!(matches("id BETWEEN 1 AND 3", SelectParams::None, &record));
        assert!(matches("status IN (0, 1)", SelectParams::None, &record));
        assert!(matches("name LIKE 'Al%'", SelectParams::None, &record));
        assert!(matches("name ILIKE 'al%'", SelectParams::None, &record));
    }

    #[test]
    fn test_null_semantics() {
        let record = row();
        assert!(matches("description IS NULL", SelectParams::None, &record));
        assert!(!matches("description = 'x'", SelectParams::None, &record));
        assert!(!matches("description <> 'x'", SelectParams::None, &record));
        assert!(!matches("missing = 1", SelectParams::None, &record));
    }

    #[test]
    fn test_parameter_binding() {
        let record = row();
        assert!(matches(
            "id = ? AND name = ?",
            SelectParams::positional([Value::Integer(3), Value::from("Alice")]),
            &record
        ));
        assert!(matches(
            "status = :status",
            SelectParams::named([("status", 1)]),
            &record
        ));
        assert!(matches("id = ?", SelectParams::positional(["3"]), &record));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let parsed = SelectParserAdapter::new().parse("id = ? AND status = ?").unwrap();
        let params = SelectParams::positional([1]);
        assert!(SelectEvaluator::bind(&parsed, &params).is_err());

        let parsed = SelectParserAdapter::new().parse("status = :status").unwrap();
        let evaluator = SelectEvaluator::bind(&parsed, &SelectParams::None).unwrap();
        assert!(evaluator.matches(&row()).is_err());
    }
}
