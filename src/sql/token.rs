//! Tokens: the dialect-neutral output of query rendering.
//!
//! Keywords and punctuation are fixed text. Identifiers, literals, cast
//! targets and function names are resolved against the dialect only when the
//! stream is serialized.

use super::dialect::Dialect;
use super::expr::{BinaryOperator, CastType};

/// Fixed SQL words. Multi-word keywords are a single token so a dialect can
/// never split them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Limit,
    Offset,
    Rows,
    FetchNext,
    RowsOnly,
    And,
    Or,
    Not,
    As,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Exists,
    Between,
    Like,
    Escape,
    IsNull,
    IsNotNull,
    Cast,
    Null,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        use Keyword::*;
        match self {
            Select => "SELECT",
            Distinct => "DISTINCT",
            From => "FROM",
            Where => "WHERE",
            GroupBy => "GROUP BY",
            Having => "HAVING",
            OrderBy => "ORDER BY",
            Asc => "ASC",
            Desc => "DESC",
            NullsFirst => "NULLS FIRST",
            NullsLast => "NULLS LAST",
            Limit => "LIMIT",
            Offset => "OFFSET",
            Rows => "ROWS",
            FetchNext => "FETCH NEXT",
            RowsOnly => "ROWS ONLY",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            As => "AS",
            Case => "CASE",
            When => "WHEN",
            Then => "THEN",
            Else => "ELSE",
            End => "END",
            In => "IN",
            Exists => "EXISTS",
            Between => "BETWEEN",
            Like => "LIKE",
            Escape => "ESCAPE",
            IsNull => "IS NULL",
            IsNotNull => "IS NOT NULL",
            Cast => "CAST",
            Null => "NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Operator(BinaryOperator),
    /// Single-character punctuation: `( ) , . * -`.
    Punct(char),
    Space,
    Newline,
    Indent(usize),

    Ident(String),
    Table {
        schema: Option<String>,
        name: String,
    },
    Integer(i64),
    Float(f64),
    /// Canonical decimal text, already normalized.
    Decimal(String),
    Str(String),
    Bool(bool),
    /// `YYYY-MM-DD`
    Date(String),
    /// `YYYY-MM-DD HH:MM:SS[.f]`
    Timestamp(String),
    /// Always-true or always-false predicate.
    Predicate(bool),
    Type(CastType),
    Function(String),
}

impl Token {
    pub fn serialize(&self, dialect: Dialect) -> String {
        let rules = dialect.rules();
        match self {
            Token::Keyword(k) => k.as_str().to_string(),
            Token::Operator(op) => op.symbol().to_string(),
            Token::Punct(c) => c.to_string(),
            Token::Space => " ".to_string(),
            Token::Newline => "\n".to_string(),
            Token::Indent(depth) => "  ".repeat(*depth),

            Token::Ident(name) => rules.quote_ident(name),
            Token::Table { schema, name } => match schema {
                Some(schema) => format!("{}.{}", rules.quote_ident(schema), rules.quote_ident(name)),
                None => rules.quote_ident(name),
            },
            Token::Integer(n) => n.to_string(),
            // NaN and infinities have no literal form.
            Token::Float(f) if !f.is_finite() => Keyword::Null.as_str().to_string(),
            Token::Float(f) => ryu::Buffer::new().format(*f).to_string(),
            Token::Decimal(text) => text.clone(),
            Token::Str(s) => rules.string_literal(s),
            Token::Bool(b) => rules.bool_literal(*b).to_string(),
            Token::Date(d) => rules.date_literal(d),
            Token::Timestamp(ts) => rules.timestamp_literal(ts),
            Token::Predicate(b) => rules.constant_predicate(*b).to_string(),
            Token::Type(ty) => rules.cast_type(*ty).to_string(),
            Token::Function(name) => {
                let portable = name.to_ascii_uppercase();
                match rules.function_alias(&portable) {
                    Some(native) => native.to_string(),
                    None => portable,
                }
            }
        }
    }
}

/// Tokens in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn keyword(&mut self, keyword: Keyword) -> &mut Self {
        self.push(Token::Keyword(keyword))
    }

    pub fn punct(&mut self, c: char) -> &mut Self {
        self.push(Token::Punct(c))
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }

    pub fn indent(&mut self, depth: usize) -> &mut Self {
        self.push(Token::Indent(depth))
    }

    pub fn append(&mut self, other: TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens);
        self
    }

    /// Write `items` separated by `, `.
    pub fn comma_list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) -> &mut Self {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.punct(',').space();
            }
            each(self, item);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }
}
