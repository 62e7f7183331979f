use std::{env, path::Path, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use log::{info, warn};

use usagegraph::{pipeline, PipelineSettings};

const SETTINGS_FILE: &str = "usagegraph.json";

fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings = PipelineSettings::load(Path::new(SETTINGS_FILE))?;
    let execution_date = resolve_execution_date()?;

    info!("starting usage cycle for {execution_date}");

    let retry_delay = Duration::from_secs(settings.retry_delay_secs);
    with_retry("collect_app_usage", retry_delay, || {
        pipeline::collect_phase(&settings, execution_date)
    })?;
    // The load phase only starts once collection succeeded for all users.
    with_retry("load_latest", retry_delay, || {
        pipeline::load_phase(&settings)
    })?;

    info!("usage cycle complete");
    Ok(())
}

/// Execution date comes from the triggering cycle (first CLI argument),
/// falling back to today's UTC date.
fn resolve_execution_date() -> Result<NaiveDate> {
    match env::args().nth(1) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid execution date '{raw}', expected YYYY-MM-DD")),
        None => Ok(Utc::now().date_naive()),
    }
}

/// One retry per phase after a fixed delay; the second failure propagates.
fn with_retry<T>(task: &str, delay: Duration, run: impl Fn() -> Result<T>) -> Result<T> {
    match run() {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(
                "{task} failed ({err:#}), retrying in {}s",
                delay.as_secs()
            );
            thread::sleep(delay);
            run().with_context(|| format!("{task} failed after retry"))
        }
    }
}
