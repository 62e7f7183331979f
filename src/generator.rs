use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;

use crate::models::{AppEntry, Device, UsageRecord, UserSnapshot};
use crate::settings::PipelineSettings;
use crate::storage::SnapshotStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Exclusive upper bound for a single app's drawn minutes.
const MINUTES_CEILING: u32 = 180;
/// Rejected draws tolerated before clamping to the remaining budget.
const MAX_DRAW_ATTEMPTS: u32 = 64;

/// Draw a duration uniformly from `[0, 180)` that keeps the running total
/// strictly under the daily cap. `budget_left` is `cap - running_total` and is
/// always at least 1.
fn draw_minutes(rng: &mut impl Rng, budget_left: u32) -> u32 {
    draw_minutes_bounded(rng, budget_left, MAX_DRAW_ATTEMPTS)
}

fn draw_minutes_bounded(rng: &mut impl Rng, budget_left: u32, max_attempts: u32) -> u32 {
    for _ in 0..max_attempts {
        let candidate = rng.gen_range(0..MINUTES_CEILING);
        if candidate < budget_left {
            return candidate;
        }
    }
    // Every draw landed on or above the remaining budget; take the largest
    // value that still keeps the total under the cap.
    budget_left.saturating_sub(1).min(MINUTES_CEILING - 1)
}

/// Build one snapshot for one user: exactly one record per roster entry, in
/// roster order, with the minutes sum strictly under `daily_cap`. The running
/// total lives here and nowhere else, so consecutive users never share state.
pub fn generate_snapshot(
    user_id: &str,
    execution_date: NaiveDate,
    roster: &[AppEntry],
    daily_cap: u32,
    rng: &mut impl Rng,
) -> UserSnapshot {
    let mut running_total = 0u32;
    let mut usages = Vec::with_capacity(roster.len());

    for app in roster {
        let minutes = draw_minutes(rng, daily_cap - running_total);
        running_total += minutes;
        usages.push(UsageRecord {
            app_name: app.name.clone(),
            minutes_used: minutes,
            app_category: app.category.clone(),
        });
    }

    UserSnapshot {
        user_id: user_id.to_string(),
        usages_date: execution_date.format("%Y-%m-%d").to_string(),
        device: Device::default(),
        usages,
    }
}

/// Collect phase: one snapshot per roster user, appended to that user's
/// history file and written over the latest file. Storage failures propagate
/// to the caller untouched.
pub fn collect_usage(
    settings: &PipelineSettings,
    store: &SnapshotStore,
    execution_date: NaiveDate,
    rng: &mut impl Rng,
) -> Result<()> {
    for first_name in &settings.users {
        let user_id = settings.user_id(first_name);
        let snapshot = generate_snapshot(
            &user_id,
            execution_date,
            &settings.apps,
            settings.daily_cap_minutes,
            rng,
        );

        store.append_history(first_name, &snapshot)?;
        store.write_latest(first_name, &snapshot)?;

        log_info!(
            "collected usage for {user_id}: {} apps, {} minutes total",
            snapshot.usages.len(),
            snapshot.total_minutes()
        );
    }

    Ok(())
}
