use std::fs::File;

use anyhow::{Context, Result};
use cipher_ledger::{
    bin_utils::{Report, Service},
    config::LedgerConfig,
    telemetry,
};

fn main() -> Result<()> {
    let config = LedgerConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.log);

    let mut args = std::env::args().skip(1);
    let filename = args
        .next()
        .context("Expected a file name as the first argument")?;
    let report = match args.next().as_deref() {
        None => Report::Accounts,
        Some("--statements") => Report::Statements,
        Some(other) => anyhow::bail!("Unknown argument `{other}`, expected `--statements`"),
    };
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| {
            // refusals such as insufficient funds are not technical errors
            if !err.is_refusal() {
                eprintln!("Error at line {line}: {err}")
            }
        }),
        config,
        report,
    };
    service.run()
}
