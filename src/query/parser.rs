use super::lexer::{CompareOp, Lexer, Token};
use super::parse_datetime_millis;
use crate::error::{StoreError, StoreResult};

/// Which record shape a filter runs against. The target decides how
/// identifiers resolve: table queries expose only the table name and reject
/// everything else; entity queries expose `PartitionKey`/`RowKey` and route
/// all other identifiers to the entity's custom properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    Table,
    Entity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare(Operand, CompareOp, Operand),
    Literal(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    System(SystemField),
    Property(String),
    Value(LitValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemField {
    TableName,
    PartitionKey,
    RowKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    Str(String),
    Num(f64),
    /// Long integers are stored as strings; the literal compares as one.
    Long(String),
    /// Millisecond epoch; `None` when the body failed to parse.
    DateTime(Option<i64>),
    Bool(bool),
}

/// Recursive-descent parser over the token stream:
///
/// ```text
/// or         <- and ("or" and)*
/// and        <- unary ("and" unary)*
/// unary      <- "not" unary | primary
/// primary    <- "(" or ")" | comparison
/// comparison <- operand cmp operand | bool-literal
/// ```
pub struct FilterParser {
    tokens: Vec<Token>,
    position: usize,
    target: QueryTarget,
}

impl FilterParser {
    pub fn new(filter: &str, target: QueryTarget) -> StoreResult<Self> {
        let tokens = Lexer::new(filter).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            target,
        })
    }

    pub fn parse(mut self) -> StoreResult<FilterExpr> {
        if self.tokens.is_empty() {
            return Ok(FilterExpr::Literal(true));
        }
        let expr = self.parse_or()?;
        if self.position < self.tokens.len() {
            return Err(Self::invalid(format!(
                "unexpected token {:?} after expression",
                self.tokens[self.position]
            )));
        }
        Ok(expr)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn invalid(message: impl Into<String>) -> StoreError {
        StoreError::QueryConditionInvalid(message.into())
    }

    fn parse_or(&mut self) -> StoreResult<FilterExpr> {
        let mut left = self.parse_and()?;
        while matches!(self.current(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> StoreResult<FilterExpr> {
        let mut left = self.parse_unary()?;
        while matches!(self.current(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> StoreResult<FilterExpr> {
        if matches!(self.current(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> StoreResult<FilterExpr> {
        if matches!(self.current(), Some(Token::LParen)) {
            self.advance();
            let expr = self.parse_or()?;
            match self.current() {
                Some(Token::RParen) => {
                    self.advance();
                    Ok(expr)
                }
                _ => Err(Self::invalid("expected closing parenthesis")),
            }
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> StoreResult<FilterExpr> {
        let left = self.parse_operand()?;

        if let Some(Token::Compare(op)) = self.current() {
            let op = *op;
            self.advance();
            let right = self.parse_operand()?;
            return Ok(FilterExpr::Compare(left, op, right));
        }

        // A bare boolean literal is the only valid standalone operand.
        match left {
            Operand::Value(LitValue::Bool(b)) => Ok(FilterExpr::Literal(b)),
            _ => Err(Self::invalid("expected comparison operator")),
        }
    }

    fn parse_operand(&mut self) -> StoreResult<Operand> {
        let token = self
            .current()
            .cloned()
            .ok_or_else(|| Self::invalid("unexpected end of filter"))?;
        self.advance();

        match token {
            Token::Identifier(name) => self.resolve_identifier(name),
            Token::String(s) => Ok(Operand::Value(LitValue::Str(s))),
            Token::DateTime(body) => Ok(Operand::Value(LitValue::DateTime(
                parse_datetime_millis(&body),
            ))),
            Token::Typed { prefix, .. } => Err(Self::invalid(format!(
                "comparison against {}-typed literals is not supported",
                prefix
            ))),
            Token::Number(n) => n
                .parse::<f64>()
                .map(|v| Operand::Value(LitValue::Num(v)))
                .map_err(|_| Self::invalid(format!("malformed number '{}'", n))),
            Token::Long(digits) => Ok(Operand::Value(LitValue::Long(digits))),
            Token::Bool(b) => Ok(Operand::Value(LitValue::Bool(b))),
            other => Err(Self::invalid(format!("unexpected token {:?}", other))),
        }
    }

    fn resolve_identifier(&self, name: String) -> StoreResult<Operand> {
        match self.target {
            QueryTarget::Table => {
                if name == "name" {
                    Ok(Operand::System(SystemField::TableName))
                } else {
                    Err(Self::invalid(format!(
                        "custom property '{}' is not supported in table queries",
                        name
                    )))
                }
            }
            QueryTarget::Entity => match name.as_str() {
                "PartitionKey" => Ok(Operand::System(SystemField::PartitionKey)),
                "RowKey" => Ok(Operand::System(SystemField::RowKey)),
                _ => Ok(Operand::Property(name)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(filter: &str, target: QueryTarget) -> StoreResult<FilterExpr> {
        FilterParser::new(filter, target)?.parse()
    }

    #[test]
    fn test_entity_system_and_custom_properties() {
        let expr = parse("PartitionKey eq 'p' and Count eq 42L", QueryTarget::Entity).unwrap();
        match expr {
            FilterExpr::And(left, right) => {
                assert_eq!(
                    *left,
                    FilterExpr::Compare(
                        Operand::System(SystemField::PartitionKey),
                        CompareOp::Eq,
                        Operand::Value(LitValue::Str("p".to_string())),
                    )
                );
                assert_eq!(
                    *right,
                    FilterExpr::Compare(
                        Operand::Property("Count".to_string()),
                        CompareOp::Eq,
                        Operand::Value(LitValue::Long("42".to_string())),
                    )
                );
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_table_mode_rejects_custom_properties() {
        let err = parse("Color eq 'red'", QueryTarget::Table).unwrap_err();
        assert!(matches!(err, StoreError::QueryConditionInvalid(_)));

        assert!(parse("TableName eq 'mytable'", QueryTarget::Table).is_ok());
    }

    #[test]
    fn test_binary_literal_rejected() {
        let err = parse("Data eq binary'00ff'", QueryTarget::Entity).unwrap_err();
        assert!(matches!(err, StoreError::QueryConditionInvalid(_)));

        let err = parse("Data eq X'00'", QueryTarget::Entity).unwrap_err();
        assert!(matches!(err, StoreError::QueryConditionInvalid(_)));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("RowKey eq 'a' 'b'", QueryTarget::Entity).unwrap_err();
        assert!(matches!(err, StoreError::QueryConditionInvalid(_)));
    }

    #[test]
    fn test_bare_operand_must_be_boolean() {
        assert_eq!(
            parse("true", QueryTarget::Entity).unwrap(),
            FilterExpr::Literal(true)
        );
        let err = parse("RowKey", QueryTarget::Entity).unwrap_err();
        assert!(matches!(err, StoreError::QueryConditionInvalid(_)));
    }

    #[test]
    fn test_not_and_parens() {
        let expr = parse("not (RowKey eq 'a')", QueryTarget::Entity).unwrap();
        assert!(matches!(expr, FilterExpr::Not(_)));
    }
}
