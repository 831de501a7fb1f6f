use eyre::{bail, Result};
use serde::{Deserialize, Serialize};

use super::{AssetId, DealerId, LicenseId, Timestamps, Tracked, UsageId, UserTracking};

/// An uploaded media file and what is known about its rights and origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub title: String,
    /// Storage key of the original file, relative to the media root.
    pub file: String,
    /// File name as sent by the uploader.
    pub filename_orig: String,
    pub description: String,
    pub license: Option<LicenseId>,
    pub dealer: Option<DealerId>,
    /// Set if the asset was paid for.
    pub with_costs: bool,
    /// Credit line required by the license, if any.
    pub copyright_statement: String,
    pub source_url: String,
    pub usage: Vec<UsageId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub user_tracking: UserTracking,
}

impl Asset {
    /// A freshly uploaded asset, titled after the uploaded file.
    pub fn new_upload(file: String, filename_orig: String, created_by: &str) -> Asset {
        Asset {
            id: AssetId::new_random(),
            title: filename_orig.clone(),
            file,
            filename_orig,
            description: String::new(),
            license: None,
            dealer: None,
            with_costs: false,
            copyright_statement: String::new(),
            source_url: String::new(),
            usage: Vec::new(),
            timestamps: Timestamps::now(),
            user_tracking: UserTracking::created_by(created_by),
        }
    }

    pub fn update_metadata(&mut self, update: AssetMetadata, user: &str) -> Result<()> {
        if update.title.trim().is_empty() {
            bail!("asset title must not be empty");
        }
        let AssetMetadata {
            title,
            description,
            license,
            dealer,
            with_costs,
            copyright_statement,
            source_url,
            mut usage,
        } = update;
        usage.sort();
        usage.dedup();
        self.title = title;
        self.description = description;
        self.license = license;
        self.dealer = dealer;
        self.with_costs = with_costs;
        self.copyright_statement = copyright_statement;
        self.source_url = source_url;
        self.usage = usage;
        self.touch(user);
        Ok(())
    }
}

/// The user editable part of an `Asset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub title: String,
    pub description: String,
    pub license: Option<LicenseId>,
    pub dealer: Option<DealerId>,
    pub with_costs: bool,
    pub copyright_statement: String,
    pub source_url: String,
    pub usage: Vec<UsageId>,
}

impl Tracked for Asset {
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn user_tracking_mut(&mut self) -> &mut UserTracking {
        &mut self.user_tracking
    }
}
