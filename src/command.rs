use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Signup,
    Deposit,
    Withdrawal,
    Transfer,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Amount is required for {kind:?}")]
    AmountRequired { kind: TransactionKind },
    #[error("Invalid amount `{raw}` for {kind:?}")]
    InvalidAmount { kind: TransactionKind, raw: String },
    #[error("Field `{field}` is required for {kind:?}")]
    FieldRequired {
        kind: TransactionKind,
        field: &'static str,
    },
}

/// Typed request, decoded before anything reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Signup {
        username: String,
        email: String,
        password: String,
    },
    Deposit {
        username: String,
        amount: Decimal,
    },
    Withdraw {
        username: String,
        amount: Decimal,
    },
    Transfer {
        username: String,
        recipient: String,
        amount: Decimal,
    },
}

/// Raw, loosely typed fields of one request.
#[derive(Debug, Default, Clone)]
pub struct RawCommand<'a> {
    pub username: &'a str,
    pub amount: Option<&'a str>,
    pub recipient: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl Command {
    pub fn parse_command(kind: TransactionKind, raw: RawCommand<'_>) -> Result<Self, CommandError> {
        let username = required(kind, "user", Some(raw.username))?;
        match kind {
            TransactionKind::Signup => Ok(Self::Signup {
                username,
                email: required(kind, "email", raw.email)?,
                password: required(kind, "password", raw.password)?,
            }),
            TransactionKind::Deposit => Ok(Self::Deposit {
                username,
                amount: parse_amount(kind, raw.amount)?,
            }),
            TransactionKind::Withdrawal => Ok(Self::Withdraw {
                username,
                amount: parse_amount(kind, raw.amount)?,
            }),
            TransactionKind::Transfer => Ok(Self::Transfer {
                username,
                recipient: required(kind, "recipient", raw.recipient)?,
                amount: parse_amount(kind, raw.amount)?,
            }),
        }
    }
}

/// Accepts plain decimal literals only. `NaN`, infinities and scientific notation never
/// parse into a `Decimal`. Sign checks are left to the ledger.
pub fn parse_amount(kind: TransactionKind, raw: Option<&str>) -> Result<Decimal, CommandError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(CommandError::AmountRequired { kind }),
    };
    Decimal::from_str(raw).map_err(|_| CommandError::InvalidAmount {
        kind,
        raw: raw.to_string(),
    })
}

fn required(
    kind: TransactionKind,
    field: &'static str,
    value: Option<&str>,
) -> Result<String, CommandError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CommandError::FieldRequired { kind, field }),
    }
}
