//! Replays an operation script against a fresh in-memory ledger and prints the outcome.
//! Used by the binary and by the integration tests.

use std::io::{Read, Write};

use crate::{
    command::{Command, CommandError},
    config::LedgerConfig,
    processor::{
        TransactionProcessError, TransactionProcessor, in_memory_processor::InMemoryProcessor,
    },
};
use anyhow::{Context, Result};
use csv_parser::CsvOperationParser;
use csv_printer::{AccountRow, StatementRow, print_accounts, print_statements};
use thiserror::Error;
use tracing::debug;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Process(#[from] TransactionProcessError),
}

impl From<CommandError> for LineError {
    fn from(err: CommandError) -> Self {
        Self::Process(err.into())
    }
}

impl LineError {
    pub fn is_refusal(&self) -> bool {
        match self {
            LineError::Parse(_) => false,
            LineError::Process(err) => err.is_refusal(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Report {
    /// `user,account,balance,records`
    #[default]
    Accounts,
    /// `user,sequence,kind,amount,counterparty` with amounts decrypted
    Statements,
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, LineError) + 'w>,
    pub config: LedgerConfig,
    pub report: Report,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        let processor = InMemoryProcessor::new(&self.config);

        for (line, row) in parser {
            let outcome = row.map_err(LineError::from).and_then(|operation| {
                let command = Command::parse_command(operation.kind, operation.raw())?;
                processor.process_command(command)?;
                Ok(())
            });
            if let Err(err) = outcome {
                debug!(line, error = %err, "operation rejected");
                (self.error_printer)(line, err);
            }
        }

        let users = processor
            .report()
            .context("Failed to build the account report")?;
        match self.report {
            Report::Accounts => print_accounts(
                self.output,
                users.into_iter().map(|user| AccountRow {
                    records: user.statement.len(),
                    account: user.account_number.to_string(),
                    balance: user.balance.normalize(),
                    user: user.username,
                }),
            ),
            Report::Statements => print_statements(
                self.output,
                users.into_iter().flat_map(|user| {
                    let username = user.username;
                    user.statement.into_iter().map(move |line| StatementRow {
                        user: username.clone(),
                        sequence: line.sequence,
                        kind: line.kind,
                        amount: line.amount,
                        counterparty: line.counterparty.map(|number| number.to_string()),
                    })
                }),
            ),
        }
    }
}
