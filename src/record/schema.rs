//! Positional token access for reply payloads

use crate::error::ParseError;
use std::str::FromStr;

/// Whitespace-split payload with typed, index-checked accessors
pub(crate) struct Tokens<'a> {
    command: &'static str,
    tokens: Vec<&'a str>,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(command: &'static str, payload: &'a str) -> Self {
        Self {
            command,
            tokens: payload.split_whitespace().collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Fail unless at least `expected` tokens are present
    pub(crate) fn require(&self, expected: usize) -> Result<(), ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::EmptyPayload {
                command: self.command.to_string(),
            });
        }
        if self.len() < expected {
            return Err(ParseError::MissingToken {
                command: self.command.to_string(),
                expected,
                found: self.len(),
            });
        }
        Ok(())
    }

    fn token(&self, index: usize) -> Result<&'a str, ParseError> {
        self.tokens
            .get(index)
            .copied()
            .ok_or_else(|| ParseError::MissingToken {
                command: self.command.to_string(),
                expected: index + 1,
                found: self.tokens.len(),
            })
    }

    fn number<T: FromStr>(
        &self,
        index: usize,
        field: &'static str,
        kind: &'static str,
    ) -> Result<T, ParseError> {
        let token = self.token(index)?;
        token.parse().map_err(|_| ParseError::InvalidNumber {
            command: self.command.to_string(),
            field,
            index,
            kind,
            token: token.to_string(),
        })
    }

    pub(crate) fn float(&self, index: usize, field: &'static str) -> Result<f64, ParseError> {
        self.number(index, field, "float")
    }

    pub(crate) fn int(&self, index: usize, field: &'static str) -> Result<i64, ParseError> {
        self.number(index, field, "integer")
    }

    pub(crate) fn text(&self, index: usize) -> Result<String, ParseError> {
        self.token(index).map(str::to_string)
    }

    pub(crate) fn literal(&self, index: usize, expected: &'static str) -> Result<(), ParseError> {
        let token = self.token(index)?;
        if token != expected {
            return Err(ParseError::UnexpectedLiteral {
                command: self.command.to_string(),
                index,
                expected,
                found: token.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let tokens = Tokens::new("QPIGS", "  230.0  50.0\t1 ");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.float(0, "grid").unwrap(), 230.0);
        assert_eq!(tokens.int(2, "x").unwrap(), 1);
    }

    #[test]
    fn leading_zeros_parse() {
        let tokens = Tokens::new("QPIRI", "010 054.0");
        assert_eq!(tokens.int(0, "max").unwrap(), 10);
        assert_eq!(tokens.float(1, "v").unwrap(), 54.0);
    }

    #[test]
    fn empty_payload_is_reported_as_such() {
        let err = Tokens::new("QMOD", "   ").require(1).unwrap_err();
        assert!(matches!(err, ParseError::EmptyPayload { .. }));
    }

    #[test]
    fn int_field_rejects_decimal_token() {
        let err = Tokens::new("QPIGS", "12.5").int(0, "load_va").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                command: "QPIGS".to_string(),
                field: "load_va",
                index: 0,
                kind: "integer",
                token: "12.5".to_string(),
            }
        );
    }

    #[test]
    fn literal_mismatch() {
        let tokens = Tokens::new("QPIRI", "0 x");
        assert!(tokens.literal(1, "-").is_err());
        assert!(Tokens::new("QPIRI", "-").literal(0, "-").is_ok());
    }
}
