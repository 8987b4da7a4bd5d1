use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sources::Provider;
use super::title::{normalize_title, TitleMatcher};

pub const CONSOLE_TAG: &str = "console";
pub const PC_TAG: &str = "pc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    /// Empty when the provider does not distinguish platforms.
    pub platform_tags: BTreeSet<String>,
}

impl CatalogEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            platform_tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(title: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            platform_tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Untagged entries count as available everywhere.
    fn available_on(&self, platform: &str) -> bool {
        self.platform_tags.is_empty()
            || self
                .platform_tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(platform))
    }
}

/// Drop entries whose normalized title was already seen, keeping the first.
/// Platform tags of the dropped duplicates are merged into the survivor; an
/// untagged duplicate leaves the survivor untagged.
pub fn dedup_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out: Vec<CatalogEntry> = Vec::new();

    for entry in entries {
        let key = normalize_title(entry.title.as_str());
        if key.is_empty() {
            continue;
        }

        match seen.get(&key) {
            Some(&idx) => {
                let tags = &mut out[idx].platform_tags;
                if tags.is_empty() || entry.platform_tags.is_empty() {
                    tags.clear();
                } else {
                    tags.extend(entry.platform_tags);
                }
            }
            None => {
                seen.insert(key, out.len());
                out.push(entry);
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFlags {
    pub game_pass_console: bool,
    #[serde(rename = "gamePassPC")]
    pub game_pass_pc: bool,
    pub ps_plus: bool,
    pub geforce_now: bool,
}

impl SubscriptionFlags {
    pub fn any(&self) -> bool {
        self.game_pass_console || self.game_pass_pc || self.ps_plus || self.geforce_now
    }
}

/// The three provider catalogs as of one refresh. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub game_pass: Vec<CatalogEntry>,
    pub ps_plus: Vec<CatalogEntry>,
    pub geforce_now: Vec<CatalogEntry>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn catalog(&self, provider: Provider) -> &[CatalogEntry] {
        match provider {
            Provider::GamePass => &self.game_pass,
            Provider::PsPlus => &self.ps_plus,
            Provider::GeforceNow => &self.geforce_now,
        }
    }

    pub fn compute_flags(&self, title: &str, matcher: &dyn TitleMatcher) -> SubscriptionFlags {
        let mut flags = SubscriptionFlags::default();

        for entry in self.game_pass.iter().filter(|e| matcher.matches(title, &e.title)) {
            flags.game_pass_console |= entry.available_on(CONSOLE_TAG);
            flags.game_pass_pc |= entry.available_on(PC_TAG);
            if flags.game_pass_console && flags.game_pass_pc {
                break;
            }
        }

        flags.ps_plus = self.ps_plus.iter().any(|e| matcher.matches(title, &e.title));
        flags.geforce_now = self.geforce_now.iter().any(|e| matcher.matches(title, &e.title));

        flags
    }
}
