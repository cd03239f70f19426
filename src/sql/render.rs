//! Lowering of expressions and queries into token streams.
//!
//! Parentheses are inserted only where precedence requires them, plus around
//! any mix of AND and OR so that grouped filter logic stays readable.

use super::dialect::Dialect;
use super::expr::{BinaryOperator, Expr, Literal, UnaryOperator};
use super::query::{OrderByExpr, Query, SelectExpr, SortDir, NullsOrder, TableRef};
use super::token::{Keyword, Token, TokenStream};

/// Anything that can be written into a [`TokenStream`].
pub trait ToTokens {
    fn write_tokens(&self, out: &mut TokenStream, dialect: Dialect);

    fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut out = TokenStream::new();
        self.write_tokens(&mut out, dialect);
        out
    }
}

fn precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator::*;
    match op {
        Or => 1,
        And => 2,
        Eq | Ne | Lt | Gt | Lte | Gte => 3,
        Plus | Minus => 4,
        Mul | Div => 5,
    }
}

fn needs_parens(parent: BinaryOperator, child: &Expr, on_right: bool) -> bool {
    let Expr::BinaryOp { op: child, .. } = child else {
        return false;
    };
    let child = *child;
    if parent.is_logical() && child.is_logical() {
        return parent != child;
    }
    let (outer, inner) = (precedence(parent), precedence(child));
    inner < outer
        || (inner == outer
            && (on_right || outer == 3)
            && !matches!(parent, BinaryOperator::Plus | BinaryOperator::Mul))
}

fn wrapped(out: &mut TokenStream, expr: &Expr, dialect: Dialect, parens: bool) {
    if parens {
        out.punct('(');
        expr.write_tokens(out, dialect);
        out.punct(')');
    } else {
        expr.write_tokens(out, dialect);
    }
}

/// Subject of a postfix predicate (`IS NULL`, `IN`, `LIKE`, `BETWEEN`).
fn subject(out: &mut TokenStream, expr: &Expr, dialect: Dialect) {
    wrapped(out, expr, dialect, matches!(expr, Expr::BinaryOp { .. }));
}

fn negation(out: &mut TokenStream, negated: bool) {
    if negated {
        out.keyword(Keyword::Not).space();
    }
}

impl ToTokens for Literal {
    fn write_tokens(&self, out: &mut TokenStream, _dialect: Dialect) {
        let token = match self {
            Literal::Int(n) => Token::Integer(*n),
            Literal::Float(f) => Token::Float(*f),
            Literal::Decimal(d) => Token::Decimal(d.normalize().to_string()),
            Literal::String(s) => Token::Str(s.clone()),
            Literal::Bool(b) => Token::Bool(*b),
            Literal::Date(d) => Token::Date(d.format("%Y-%m-%d").to_string()),
            Literal::Timestamp(t) => Token::Timestamp(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Literal::Null => Token::Keyword(Keyword::Null),
        };
        out.push(token);
    }
}

impl ToTokens for Expr {
    fn write_tokens(&self, out: &mut TokenStream, dialect: Dialect) {
        match self {
            Expr::Column { table, column } => {
                if let Some(table) = table {
                    out.push(Token::Ident(table.clone())).punct('.');
                }
                out.push(Token::Ident(column.clone()));
            }
            Expr::Literal(lit) => lit.write_tokens(out, dialect),
            Expr::Truth(b) => {
                out.push(Token::Predicate(*b));
            }
            Expr::BinaryOp { left, op, right } => {
                wrapped(out, left, dialect, needs_parens(*op, left, false));
                out.space().push(Token::Operator(*op)).space();
                wrapped(out, right, dialect, needs_parens(*op, right, true));
            }
            Expr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => out.keyword(Keyword::Not).space(),
                    UnaryOperator::Minus => out.punct('-'),
                };
                subject(out, expr, dialect);
            }
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                out.push(Token::Function(name.clone())).punct('(');
                if *distinct {
                    out.keyword(Keyword::Distinct).space();
                }
                out.comma_list(args, |out, arg| arg.write_tokens(out, dialect));
                out.punct(')');
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                out.keyword(Keyword::Case);
                if let Some(operand) = operand {
                    out.space();
                    operand.write_tokens(out, dialect);
                }
                for (condition, result) in when_clauses {
                    out.space().keyword(Keyword::When).space();
                    condition.write_tokens(out, dialect);
                    out.space().keyword(Keyword::Then).space();
                    result.write_tokens(out, dialect);
                }
                if let Some(otherwise) = else_clause {
                    out.space().keyword(Keyword::Else).space();
                    otherwise.write_tokens(out, dialect);
                }
                out.space().keyword(Keyword::End);
            }
            Expr::Cast { expr, ty } => {
                out.keyword(Keyword::Cast).punct('(');
                expr.write_tokens(out, dialect);
                out.space()
                    .keyword(Keyword::As)
                    .space()
                    .push(Token::Type(*ty))
                    .punct(')');
            }
            // `x IN ()` is not valid SQL; nothing matches an empty list.
            Expr::In { values, negated, .. } if values.is_empty() => {
                out.push(Token::Predicate(*negated));
            }
            Expr::In {
                expr,
                values,
                negated,
            } => {
                subject(out, expr, dialect);
                out.space();
                negation(out, *negated);
                out.keyword(Keyword::In).space().punct('(');
                out.comma_list(values, |out, value| value.write_tokens(out, dialect));
                out.punct(')');
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                subject(out, expr, dialect);
                out.space();
                negation(out, *negated);
                out.keyword(Keyword::In).space().punct('(');
                subquery.write_tokens(out, dialect);
                out.punct(')');
            }
            Expr::Exists { subquery, negated } => {
                negation(out, *negated);
                out.keyword(Keyword::Exists).space().punct('(');
                subquery.write_tokens(out, dialect);
                out.punct(')');
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                subject(out, expr, dialect);
                out.space();
                negation(out, *negated);
                out.keyword(Keyword::Between).space();
                subject(out, low, dialect);
                out.space().keyword(Keyword::And).space();
                subject(out, high, dialect);
            }
            Expr::IsNull { expr, negated } => {
                subject(out, expr, dialect);
                out.space().keyword(if *negated {
                    Keyword::IsNotNull
                } else {
                    Keyword::IsNull
                });
            }
            Expr::LikeEscape {
                expr,
                pattern,
                escape_char,
                negated,
            } => {
                subject(out, expr, dialect);
                out.space();
                negation(out, *negated);
                out.keyword(Keyword::Like).space();
                subject(out, pattern, dialect);
                out.space()
                    .keyword(Keyword::Escape)
                    .space()
                    .push(Token::Str(escape_char.to_string()));
            }
            Expr::Star { table } => {
                if let Some(table) = table {
                    out.push(Token::Ident(table.clone())).punct('.');
                }
                out.punct('*');
            }
            Expr::Paren(inner) => wrapped(out, inner, dialect, true),
        }
    }
}

impl ToTokens for SelectExpr {
    fn write_tokens(&self, out: &mut TokenStream, dialect: Dialect) {
        self.expr.write_tokens(out, dialect);
        if let Some(alias) = &self.alias {
            out.space()
                .keyword(Keyword::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
    }
}

impl ToTokens for TableRef {
    fn write_tokens(&self, out: &mut TokenStream, _dialect: Dialect) {
        out.push(Token::Table {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            out.space()
                .keyword(Keyword::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
    }
}

impl ToTokens for OrderByExpr {
    fn write_tokens(&self, out: &mut TokenStream, dialect: Dialect) {
        self.expr.write_tokens(out, dialect);
        if let Some(dir) = self.dir {
            out.space().keyword(match dir {
                SortDir::Asc => Keyword::Asc,
                SortDir::Desc => Keyword::Desc,
            });
        }
        match self.nulls {
            Some(nulls) if dialect.rules().supports_nulls_order() => {
                out.space().keyword(match nulls {
                    NullsOrder::First => Keyword::NullsFirst,
                    NullsOrder::Last => Keyword::NullsLast,
                });
            }
            _ => {}
        }
    }
}

impl ToTokens for Query {
    fn write_tokens(&self, out: &mut TokenStream, dialect: Dialect) {
        let rules = dialect.rules();

        out.keyword(Keyword::Select);
        if self.distinct {
            out.space().keyword(Keyword::Distinct);
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                out.punct(',');
            }
            out.newline().indent(1);
            item.write_tokens(out, dialect);
        }

        if let Some(table) = &self.from {
            out.newline().keyword(Keyword::From).space();
            table.write_tokens(out, dialect);
        }
        if let Some(predicate) = &self.where_clause {
            out.newline().keyword(Keyword::Where).space();
            predicate.write_tokens(out, dialect);
        }
        if !self.group_by.is_empty() {
            out.newline().keyword(Keyword::GroupBy).space();
            out.comma_list(&self.group_by, |out, expr| expr.write_tokens(out, dialect));
        }
        if let Some(predicate) = &self.having {
            out.newline().keyword(Keyword::Having).space();
            predicate.write_tokens(out, dialect);
        }

        if !self.order_by.is_empty() {
            out.newline().keyword(Keyword::OrderBy).space();
            out.comma_list(&self.order_by, |out, key| key.write_tokens(out, dialect));
        } else if self.limit_offset.is_some() && rules.paging_requires_order_by() {
            // Any order will do; the engine only insists that one is named.
            out.newline()
                .keyword(Keyword::OrderBy)
                .space()
                .punct('(')
                .keyword(Keyword::Select)
                .space()
                .keyword(Keyword::Null)
                .punct(')');
        }

        if let Some(window) = &self.limit_offset {
            out.newline();
            rules.write_paging(out, window.limit, window.offset);
        }
    }
}
