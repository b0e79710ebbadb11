//! Rates command - look up an exchange rate and convert an amount.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use console::style;
use rust_decimal::Decimal;

use faktur_core::currency::{ConversionOutcome, CurrencyConverter};
use faktur_core::invoice::rules::{format_amount, normalize_currency, parse_amount};
use faktur_core::{CurrencyCode, FrankfurterRates};

use super::load_config;

/// Arguments for the rates command.
#[derive(Args)]
pub struct RatesArgs {
    /// Source currency (code or symbol)
    from: String,

    /// Target currency (default: the configured local currency)
    #[arg(long)]
    to: Option<String>,

    /// Amount to convert, written the way the source currency writes it
    #[arg(long)]
    amount: Option<String>,
}

pub async fn run(args: RatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let from = normalize_currency(&args.from)
        .with_context(|| format!("Unknown currency: {}", args.from))?;
    let to = match &args.to {
        Some(raw) => normalize_currency(raw).with_context(|| format!("Unknown currency: {}", raw))?,
        None => config.pipeline.local_currency.clone(),
    };

    // Separator styles follow the configured local currency, not the target
    let local = &config.pipeline.local_currency;
    let amount = match &args.amount {
        Some(raw) => parse_amount(raw, &from, local)?,
        None => Decimal::ONE,
    };

    let provider = FrankfurterRates::new(&config.rates)?;
    let converter = CurrencyConverter::new(
        Arc::new(provider),
        to.clone(),
        Duration::from_secs(config.rates.timeout_secs),
    );

    let conversion = converter.convert(amount, &from).await;
    let rate = match &conversion.outcome {
        ConversionOutcome::SameCurrency => Decimal::ONE,
        ConversionOutcome::Converted { rate } => *rate,
        ConversionOutcome::Fallback { reason } => {
            anyhow::bail!("No exchange rate for {} -> {}: {}", from, to, reason);
        }
    };

    println!("1 {} = {} {}", from, rate.normalize(), to);
    if args.amount.is_some() {
        println!("{}", conversion_line(amount, &from, conversion.value, &to, local));
    }

    if matches!(conversion.outcome, ConversionOutcome::SameCurrency) {
        eprintln!("{} Source and target currency are the same", style("ℹ").blue());
    }

    Ok(())
}

/// `"<amount> FROM = <value> TO"`, each side in its own currency's format.
fn conversion_line(
    amount: Decimal,
    from: &CurrencyCode,
    value: Decimal,
    to: &CurrencyCode,
    local: &CurrencyCode,
) -> String {
    format!(
        "{} {} = {} {}",
        format_amount(amount, from, local),
        from,
        format_amount(value, to, local),
        to
    )
}
