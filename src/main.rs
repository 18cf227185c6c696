use anyhow::{Context, Result};
use clap::Parser;

use delivery_dashboard::config::{Args, OutputFormat};
use delivery_dashboard::data::derive::options_by_column;
use delivery_dashboard::{initialize, DashboardSession, SourceCache};

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cache = SourceCache::new();
    let table = initialize(&cache, &args.data)
        .with_context(|| format!("preparing dashboard from {}", args.data.display()))?;

    if args.options {
        for (column, choices) in options_by_column(&table) {
            println!("{column}: {}", choices.join(", "));
        }
        return Ok(());
    }

    let mut session = DashboardSession::new(table);
    session.apply(&args.selection());
    let report = session.report();

    let rendered = match args.format {
        OutputFormat::Json => report.to_json().context("serializing report")?,
        OutputFormat::Text => report.to_text().context("rendering report")?,
    };
    println!("{rendered}");
    Ok(())
}
