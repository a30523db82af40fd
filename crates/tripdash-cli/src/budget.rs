//! `budget` and `destinations` command handlers.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use tripdash_core::{AppConfig, BudgetEstimate, Catalog};

pub(crate) struct BudgetOptions {
    pub total_budget: Decimal,
    pub currency: String,
    pub live: bool,
    pub json: bool,
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    Catalog::load_or_embedded(config.catalog_path.as_deref()).with_context(|| match &config.catalog_path {
        Some(path) => format!("failed to load budget catalog from {}", path.display()),
        None => "embedded budget catalog is invalid".to_string(),
    })
}

/// Estimate `destination` against the budget and print the breakdown.
///
/// With `live`, waits the configured delay and swaps in the verified listing
/// when one exists; a miss keeps the base estimate.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or JSON output fails.
pub(crate) async fn run_budget(
    config: &AppConfig,
    destination: &str,
    opts: &BudgetOptions,
) -> anyhow::Result<()> {
    if opts.total_budget < Decimal::ZERO {
        anyhow::bail!("--budget must not be negative (got {})", opts.total_budget);
    }
    let catalog = load_catalog(config)?;
    let mut estimate = catalog.estimate(destination, opts.total_budget);
    tracing::info!(
        query = destination,
        matched = %estimate.matched,
        total = %estimate.total_expenses,
        "budget estimated"
    );

    if opts.live {
        tokio::time::sleep(Duration::from_millis(config.live_delay_ms)).await;
        if !catalog.apply_verified(&mut estimate, Utc::now()) {
            tracing::warn!(query = destination, "no verified listing, keeping cached estimate");
        }
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        print_estimate(&estimate, &opts.currency);
    }
    Ok(())
}

fn print_estimate(estimate: &BudgetEstimate, currency: &str) {
    let record = &estimate.record;
    println!("{}", record.name);
    println!("{}", record.description);
    if let Some(address) = &record.address {
        println!("Address: {address}");
    }
    if let Some(host) = record.website_host() {
        println!("Website: {host}");
    }
    if let Some(phone) = &record.phone {
        println!("Phone:   {phone}");
    }
    if let Some(hours) = &record.opening_hours {
        println!("Hours:   {hours}");
    }
    if let Some(updated) = &record.last_updated {
        println!("Updated: {updated}");
    }
    println!("Match:   {}", estimate.matched);
    println!();

    for group in &estimate.categories {
        println!(
            "{:<40}{:>14}",
            group.category,
            format!("{} {currency}", format_amount(group.subtotal))
        );
        for item in &group.items {
            let source = item
                .source
                .as_deref()
                .map(|s| format!("  [{s}]"))
                .unwrap_or_default();
            println!(
                "  {:<38}{:>14}{source}",
                item.item,
                format!("{} {currency}", format_amount(item.cost))
            );
        }
    }

    println!();
    println!(
        "{:<40}{:>14}",
        "Total budget:",
        format!("{} {currency}", format_amount(estimate.total_budget))
    );
    println!(
        "{:<40}{:>14}",
        "Total expenses:",
        format!("{} {currency}", format_amount(estimate.total_expenses))
    );
    let label = if estimate.is_over_budget {
        "Over budget:"
    } else {
        "Remaining:"
    };
    println!(
        "{label:<40}{:>14}",
        format!("{} {currency}", format_amount(estimate.remaining_display()))
    );
}

/// List base-table destinations with their estimated totals.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub(crate) fn run_destinations(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    println!("{:<24}{:<36}TOTAL", "KEY", "NAME");
    for entry in catalog.entries() {
        println!(
            "{:<24}{:<36}{} {}",
            entry.key,
            entry.record.name,
            format_amount(entry.record.total_cost()),
            config.currency
        );
    }
    Ok(())
}

/// Amount with comma thousands separators and at most two decimals.
pub(crate) fn format_amount(value: Decimal) -> String {
    let text = value.round_dp(2).normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
