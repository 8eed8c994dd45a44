use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::audit::RecordKind;

#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub user: String,
    pub account: String,
    pub balance: Decimal,
    pub records: usize,
}

#[derive(Debug, Serialize)]
pub struct StatementRow {
    pub user: String,
    pub sequence: u64,
    pub kind: RecordKind,
    pub amount: Decimal,
    pub counterparty: Option<String>,
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    print_rows(output, accounts)
}

pub fn print_statements<W>(
    output: &mut W,
    lines: impl Iterator<Item = StatementRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    print_rows(output, lines)
}

fn print_rows<W, T>(output: &mut W, rows: impl Iterator<Item = T>) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize,
{
    let mut writer = Writer::from_writer(output);
    for row in rows {
        if let Err(err) = writer.serialize(row) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn print_statement_rows() {
        let mut output = Vec::new();
        print_statements(
            &mut output,
            [
                StatementRow {
                    user: "alice".to_string(),
                    sequence: 1,
                    kind: RecordKind::Deposit,
                    amount: dec!(10),
                    counterparty: None,
                },
                StatementRow {
                    user: "alice".to_string(),
                    sequence: 3,
                    kind: RecordKind::TransferOut,
                    amount: dec!(2.5),
                    counterparty: Some("1234567890".to_string()),
                },
            ]
            .into_iter(),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,sequence,kind,amount,counterparty\n\
             alice,1,deposit,10,\n\
             alice,3,transfer_out,2.5,1234567890\n"
        );
    }
}
