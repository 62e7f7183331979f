use serde::{Deserialize, Serialize};

/// One roster entry: an app name paired with its category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppEntry {
    pub name: String,
    pub category: String,
}

impl AppEntry {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub os: String,
    pub brand: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            os: "ios".into(),
            brand: "apple".into(),
        }
    }
}

/// Field order matches the on-disk JSON layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub app_name: String,
    pub minutes_used: u32,
    pub app_category: String,
}

/// One user's full usage record for one generation cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSnapshot {
    pub user_id: String,
    pub usages_date: String,
    pub device: Device,
    pub usages: Vec<UsageRecord>,
}

impl UserSnapshot {
    pub fn total_minutes(&self) -> u32 {
        self.usages.iter().map(|u| u.minutes_used).sum()
    }
}
