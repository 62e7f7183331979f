mod usage;

pub use usage::{AppEntry, Device, UsageRecord, UserSnapshot};
