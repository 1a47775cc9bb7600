use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The site-wide notice banner.
///
/// Equality only looks at what the user sees (`content`, `enable`, `read`);
/// `id` and `last_updated_at` are bookkeeping and never make two notices differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub id: Option<i64>,
    pub content: String,
    #[serde(default = "enabled")]
    pub enable: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default = "now")]
    pub last_updated_at: NaiveDateTime,
}

impl Notice {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            enable: true,
            read: false,
            last_updated_at: now(),
        }
    }

    /// Stamp the notice as updated at `at`.
    pub fn touch(&mut self, at: NaiveDateTime) {
        self.last_updated_at = at;
    }
}

impl PartialEq for Notice {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.enable == other.enable && self.read == other.read
    }
}

impl Eq for Notice {}

fn enabled() -> bool {
    true
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn equality_ignores_bookkeeping_fields() {
        let a = Notice::new("maintenance tonight");
        let mut b = Notice::new("maintenance tonight");
        b.id = Some(7);
        b.touch(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(a, b);

        b.read = true;
        assert_ne!(a, b);
    }
}
