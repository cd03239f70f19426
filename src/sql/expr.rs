//! Expression tree for predicates, projections and aggregates.
//!
//! Trees are built with the free constructors (`col`, `sum`, `lit_str`, ...)
//! and the [`ExprExt`] combinators, then rendered through
//! [`ToTokens`](super::render::ToTokens).

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::dialect::Dialect;
use super::query::{Query, SelectExpr};
use super::render::ToTokens;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        table: Option<String>,
        column: String,
    },
    Literal(Literal),
    /// Constant predicate, as opposed to a boolean value.
    Truth(bool),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// Searched CASE when `operand` is `None`, simple CASE otherwise.
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        ty: CastType,
    },
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    /// Columns qualified with an enclosing query's table name correlate the
    /// subquery with that query's current row.
    Exists {
        subquery: Box<Query>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// `LIKE` always carries an explicit escape character so user text can
    /// contain `%` and `_`.
    LikeEscape {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape_char: char,
        negated: bool,
    },
    Star {
        table: Option<String>,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

/// Types a filter literal or column may be coerced to. The spelling of each
/// is up to the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Decimal,
    Text,
    Date,
    Timestamp,
}

impl Expr {
    /// Render as SQL text for a dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Column name, when this is a column reference.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Expr::Column { column, .. } => Some(column),
            _ => None,
        }
    }

    fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }
}

pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.to_string(),
    }
}

pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.to_string()),
        column: column.to_string(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Literal::Int(n).into()
}

pub fn lit_float(f: f64) -> Expr {
    Literal::Float(f).into()
}

pub fn lit_decimal(d: Decimal) -> Expr {
    Literal::Decimal(d).into()
}

pub fn lit_str(s: &str) -> Expr {
    Literal::String(s.to_string()).into()
}

pub fn lit_bool(b: bool) -> Expr {
    Literal::Bool(b).into()
}

pub fn lit_date(d: NaiveDate) -> Expr {
    Literal::Date(d).into()
}

pub fn lit_timestamp(t: NaiveDateTime) -> Expr {
    Literal::Timestamp(t).into()
}

pub fn lit_null() -> Expr {
    Literal::Null.into()
}

pub fn star() -> Expr {
    Expr::Star { table: None }
}

pub fn truth() -> Expr {
    Expr::Truth(true)
}

pub fn falsehood() -> Expr {
    Expr::Truth(false)
}

pub fn exists(subquery: Query) -> Expr {
    Expr::Exists {
        subquery: Box::new(subquery),
        negated: false,
    }
}

/// Call of a function by its portable name; dialects may rename it.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.to_string(),
        args,
        distinct: false,
    }
}

macro_rules! unary_functions {
    ($($(#[$meta:meta])* $fn_name:ident => $sql:literal),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $fn_name(expr: Expr) -> Expr {
                func($sql, vec![expr])
            }
        )*
    };
}

unary_functions! {
    count => "COUNT",
    sum => "SUM",
    avg => "AVG",
    /// Order-based, so it applies to text and dates as well as numbers.
    min => "MIN",
    /// Order-based, like [`min`].
    max => "MAX",
    lower => "LOWER",
    trim => "TRIM",
}

pub fn count_star() -> Expr {
    count(star())
}

pub fn count_distinct(expr: Expr) -> Expr {
    Expr::Function {
        name: "COUNT".to_string(),
        args: vec![expr],
        distinct: true,
    }
}

pub fn concat(args: Vec<Expr>) -> Expr {
    func("CONCAT", args)
}

pub fn cast(expr: Expr, ty: CastType) -> Expr {
    Expr::Cast {
        expr: expr.boxed(),
        ty,
    }
}

/// `CASE WHEN condition THEN then END`; rows failing the condition yield
/// NULL, which aggregates skip.
pub fn case_when(condition: Expr, then: Expr) -> Expr {
    Expr::Case {
        operand: None,
        when_clauses: vec![(condition, then)],
        else_clause: None,
    }
}

/// AND of all predicates. The empty conjunction is TRUE.
pub fn conjunction(predicates: Vec<Expr>) -> Expr {
    fold_logical(predicates, BinaryOperator::And, truth)
}

/// OR of all predicates. The empty disjunction is FALSE.
pub fn disjunction(predicates: Vec<Expr>) -> Expr {
    fold_logical(predicates, BinaryOperator::Or, falsehood)
}

fn fold_logical(predicates: Vec<Expr>, op: BinaryOperator, empty: fn() -> Expr) -> Expr {
    let mut iter = predicates.into_iter();
    let Some(first) = iter.next() else {
        return empty();
    };
    iter.fold(first, |acc, next| acc.binary(op, next))
}

macro_rules! binary_methods {
    ($($(#[$meta:meta])* $method:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            fn $method(self, other: impl Into<Expr>) -> Expr {
                self.binary(BinaryOperator::$op, other)
            }
        )*
    };
}

/// Fluent combinators over anything convertible to an [`Expr`].
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: self.into_expr().boxed(),
            op,
            right: other.into().boxed(),
        }
    }

    binary_methods! {
        eq => Eq,
        ne => Ne,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
        and => And,
        or => Or,
        add => Plus,
        sub => Minus,
        mul => Mul,
        div => Div,
    }

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: self.into_expr().boxed(),
        }
    }

    fn like_escape(self, pattern: impl Into<Expr>, escape_char: char) -> Expr {
        Expr::LikeEscape {
            expr: self.into_expr().boxed(),
            pattern: pattern.into().boxed(),
            escape_char,
            negated: false,
        }
    }

    fn not_like_escape(self, pattern: impl Into<Expr>, escape_char: char) -> Expr {
        Expr::LikeEscape {
            expr: self.into_expr().boxed(),
            pattern: pattern.into().boxed(),
            escape_char,
            negated: true,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: self.into_expr().boxed(),
            negated: false,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: self.into_expr().boxed(),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: self.into_expr().boxed(),
            values,
            negated: false,
        }
    }

    fn in_subquery(self, subquery: Query) -> Expr {
        Expr::InSubquery {
            expr: self.into_expr().boxed(),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: self.into_expr().boxed(),
            low: low.into().boxed(),
            high: high.into().boxed(),
            negated: false,
        }
    }

    fn paren(self) -> Expr {
        Expr::Paren(self.into_expr().boxed())
    }

    /// Select-list item named `name`.
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr::new(self.into_expr()).with_alias(name)
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

macro_rules! literal_from {
    ($($ty:ty => |$v:ident| $lit:expr),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from($v: $ty) -> Self {
                    Expr::Literal($lit)
                }
            }
        )*
    };
}

literal_from! {
    i64 => |n| Literal::Int(n),
    i32 => |n| Literal::Int(i64::from(n)),
    f64 => |f| Literal::Float(f),
    Decimal => |d| Literal::Decimal(d),
    bool => |b| Literal::Bool(b),
    String => |s| Literal::String(s),
    &str => |s| Literal::String(s.to_string()),
    NaiveDate => |d| Literal::Date(d),
    NaiveDateTime => |t| Literal::Timestamp(t),
}
