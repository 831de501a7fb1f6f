use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Asset, DealerId, LicenseId, Timestamps, Tracked, UsageId, UserTracking};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "WEB")]
    Web,
    #[serde(rename = "PRT")]
    Print,
}

/// A context an asset is used in, e.g. a website or a printed brochure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub id: UsageId,
    pub title: String,
    pub notes: String,
    pub media: MediaKind,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub user_tracking: UserTracking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub title: Option<String>,
    /// Official license text.
    pub url: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub user_tracking: UserTracking,
}

/// Vendor or distributor an asset was acquired from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dealer {
    pub id: DealerId,
    pub title: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub user_tracking: UserTracking,
}

impl Dealer {
    /// Dealer titles are unique ignoring case.
    pub fn title_conflicts(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }
}

macro_rules! impl_tracked {
    ($ty:ty) => {
        impl Tracked for $ty {
            fn timestamps_mut(&mut self) -> &mut Timestamps {
                &mut self.timestamps
            }

            fn user_tracking_mut(&mut self) -> &mut UserTracking {
                &mut self.user_tracking
            }
        }
    };
}

impl_tracked!(Usage);
impl_tracked!(License);
impl_tracked!(Dealer);

/// Number of assets per usage tag, most used first. Ties are ordered by id.
pub fn usage_counts(assets: &[Asset]) -> Vec<(UsageId, usize)> {
    let mut counts: HashMap<UsageId, usize> = HashMap::new();
    for usage in assets.iter().flat_map(|asset| asset.usage.iter()) {
        *counts.entry(*usage).or_default() += 1;
    }
    let mut counts: Vec<(UsageId, usize)> = counts.into_iter().collect();
    counts.sort_by(|(id_a, count_a), (id_b, count_b)| count_b.cmp(count_a).then(id_a.cmp(id_b)));
    counts
}
