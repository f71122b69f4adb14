//! Two-phase locking schedule mini-language.
//!
//! A schedule is a semicolon separated list of operation tokens:
//!
//! ```text
//! R1(X); W2(X); W2(Y); W3(Y); W1(X); C1; C2; C3;
//! ```
//!
//! `R<id>(<item>)` reads, `W<id>(<item>)` writes and `C<id>` commits.
//! The operation letter is case-insensitive; the item name is kept as
//! written.

use crate::error::{CoreError, CoreResult};
use crate::types::{DataItem, TxnId};
use std::fmt;
use std::str::FromStr;

/// An operation issued by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read a data item.
    Read(DataItem),
    /// Write a data item.
    Write(DataItem),
    /// Commit the transaction.
    Commit,
}

impl Operation {
    /// Creates a read of `item`.
    pub fn read(item: impl Into<DataItem>) -> Self {
        Self::Read(item.into())
    }

    /// Creates a write of `item`.
    pub fn write(item: impl Into<DataItem>) -> Self {
        Self::Write(item.into())
    }

    /// Returns the data item this operation touches, if any.
    #[must_use]
    pub fn item(&self) -> Option<&DataItem> {
        match self {
            Self::Read(item) | Self::Write(item) => Some(item),
            Self::Commit => None,
        }
    }

    /// Returns the single-letter code used in schedules and traces.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Read(_) => 'R',
            Self::Write(_) => 'W',
            Self::Commit => 'C',
        }
    }
}

/// One entry of a two-phase locking schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    /// Issuing transaction.
    pub txn: TxnId,
    /// Requested operation.
    pub operation: Operation,
}

impl Request {
    /// Creates a new request.
    #[must_use]
    pub fn new(txn: TxnId, operation: Operation) -> Self {
        Self { txn, operation }
    }

    /// Returns the data item this request touches, if any.
    #[must_use]
    pub fn item(&self) -> Option<&DataItem> {
        self.operation.item()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operation.code(), self.txn)?;
        if let Some(item) = self.item() {
            write!(f, "({item})")?;
        }
        Ok(())
    }
}

impl FromStr for Request {
    type Err = CoreError;

    fn from_str(token: &str) -> CoreResult<Self> {
        let token = token.trim();
        let mut chars = token.chars();
        let code = match chars.next() {
            Some(c) => c.to_ascii_uppercase(),
            None => return Err(CoreError::invalid_operation(token)),
        };
        if !matches!(code, 'R' | 'W' | 'C') {
            return Err(CoreError::invalid_operation(token));
        }

        let rest = chars.as_str();
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(CoreError::malformed_token(token, "missing transaction id"));
        }
        let id: u64 = rest[..digits]
            .parse()
            .map_err(|_| CoreError::malformed_token(token, "transaction id out of range"))?;
        let txn = TxnId::new(id);
        let body = rest[digits..].trim();

        if code == 'C' {
            if !body.is_empty() {
                return Err(CoreError::malformed_token(
                    token,
                    "commit does not take a data item",
                ));
            }
            return Ok(Self::new(txn, Operation::Commit));
        }

        let item = body
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .ok_or_else(|| CoreError::malformed_token(token, "expected `(<item>)`"))?;

        let operation = if code == 'R' {
            Operation::read(item)
        } else {
            Operation::write(item)
        };
        Ok(Self::new(txn, operation))
    }
}

/// Splits raw schedule text into trimmed, non-empty tokens.
#[must_use]
pub fn parse_input(input: &str) -> Vec<&str> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses schedule tokens into typed requests.
///
/// # Errors
///
/// Returns `InvalidOperation` for a token that does not start with
/// `R`, `W` or `C`, and `MalformedToken` for an unparseable body.
pub fn parse_schedule<S: AsRef<str>>(tokens: &[S]) -> CoreResult<Vec<Request>> {
    tokens.iter().map(|t| t.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_input_drops_empty_tokens() {
        let tokens = parse_input(" R1(A) ;W1(A);; C1; ");
        assert_eq!(tokens, vec!["R1(A)", "W1(A)", "C1"]);
    }

    #[test]
    fn parse_schedule_reads_writes_commits() {
        let requests = parse_schedule(&parse_input("R1(A); W1(A); C1")).unwrap();
        assert_eq!(
            requests,
            vec![
                Request::new(TxnId::new(1), Operation::read("A")),
                Request::new(TxnId::new(1), Operation::write("A")),
                Request::new(TxnId::new(1), Operation::Commit),
            ]
        );
    }

    #[test]
    fn operation_letter_is_case_insensitive() {
        let request: Request = "w12(acct)".parse().unwrap();
        assert_eq!(request.txn, TxnId::new(12));
        assert_eq!(request.operation, Operation::write("acct"));
        assert_eq!(request.to_string(), "W12(acct)");
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = "X1(A)".parse::<Request>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        for token in ["R(X)", "Rx(X)", "R1(X", "R1X)", "W1()", "C1(X)"] {
            let err = token.parse::<Request>().unwrap_err();
            assert!(
                matches!(err, CoreError::MalformedToken { .. }),
                "{token} should be malformed"
            );
        }
    }

    #[test]
    fn display_round_trips_commit() {
        let request: Request = "c3".parse().unwrap();
        assert_eq!(request.to_string(), "C3");
        assert!(request.item().is_none());
    }
}
