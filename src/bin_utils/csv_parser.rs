use std::io::Read;

use crate::command::{RawCommand, TransactionKind};
use csv::{DeserializeRecordsIntoIter, Trim};
use serde::Deserialize;

/// One row of an operation script: `type,user,amount,recipient,email,password`.
#[derive(Debug, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub user: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Operation {
    pub fn raw(&self) -> RawCommand<'_> {
        RawCommand {
            username: &self.user,
            amount: self.amount.as_deref(),
            recipient: self.recipient.as_deref(),
            email: self.email.as_deref(),
            password: self.password.as_deref(),
        }
    }
}

/// Parses an operation script in CSV format, yielding each row with its line number.
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, Operation>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Operation, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
