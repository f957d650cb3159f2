use crate::core::Value;
use std::fmt;

/// Parameter reference inside a select clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` or `$n`, zero based.
    Positional(usize),
    /// `:name`
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Parsed `WHERE`-style condition evaluated against a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Column(String),
    Literal(Value),
    Placeholder(Placeholder),
    Negate(Box<SelectExpr>),
    Compare {
        left: Box<SelectExpr>,
        op: CompareOp,
        right: Box<SelectExpr>,
    },
    Logical {
        left: Box<SelectExpr>,
        op: LogicalOp,
        right: Box<SelectExpr>,
    },
    Not(Box<SelectExpr>),
    IsNull {
        expr: Box<SelectExpr>,
        negated: bool,
    },
    In {
        expr: Box<SelectExpr>,
        list: Vec<SelectExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SelectExpr>,
        low: Box<SelectExpr>,
        high: Box<SelectExpr>,
        negated: bool,
    },
    Like {
        expr: Box<SelectExpr>,
        pattern: Box<SelectExpr>,
        negated: bool,
        case_insensitive: bool,
    },
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: bool| if negated { "NOT " } else { "" };
        match self {
            Self::Column(name) => write!(f, "{}", name),
            Self::Literal(Value::Text(text)) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Literal(value) => write!(f, "{}", value),
            Self::Placeholder(Placeholder::Positional(index)) => write!(f, "${}", index + 1),
            Self::Placeholder(Placeholder::Named(name)) => write!(f, ":{}", name),
            Self::Negate(expr) => write!(f, "-{}", expr),
            Self::Compare { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Self::Logical { left, op, right } => {
                let op = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                write!(f, "({} {} {})", left, op, right)
            }
            Self::Not(expr) => write!(f, "NOT {}", expr),
            Self::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(*negated)),
            Self::In {
                expr,
                list,
                negated,
            } => {
                let items: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{} {}IN ({})", expr, not(*negated), items.join(", "))
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "{} {}BETWEEN {} AND {}", expr, not(*negated), low, high),
            Self::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {}{} {}", expr, not(*negated), keyword, pattern)
            }
        }
    }
}
