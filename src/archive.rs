//! 保存済み成果物の索引 (ロール番号・申立て番号・ステータスで検索)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScraperError;
use crate::output::AGGREGATE_FILE;
use crate::roll_number::RollNumber;
use crate::types::{
    AppealAggregate, AppealDetail, AppealSummary, BatchResult, ListingRecord, PageVariant,
    PropertyInfo,
};

/// ロール番号1件分の保存形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub roll_number: RollNumber,
    pub property_info: PropertyInfo,
    pub appeal_listing: Vec<AppealSummary>,
    pub appeal_details: Vec<AppealDetail>,
}

impl From<&BatchResult> for PropertyRecord {
    fn from(result: &BatchResult) -> Self {
        Self {
            roll_number: result.listing.roll_number.clone(),
            property_info: result.listing.property_info.clone(),
            appeal_listing: result.listing.appeal_info.clone(),
            appeal_details: result.appeals.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    properties: BTreeMap<RollNumber, PropertyRecord>,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: &[BatchResult]) -> Self {
        let mut index = Self::new();
        for result in results {
            index.insert(PropertyRecord::from(result));
        }
        index
    }

    /// 同じロール番号は後から入れたものが優先
    pub fn insert(&mut self, record: PropertyRecord) {
        self.properties.insert(record.roll_number.clone(), record);
    }

    /// 出力ディレクトリから読み込む
    ///
    /// 一覧JSONのないディレクトリや壊れたファイルは警告して読み飛ばす。
    /// 出力ディレクトリ自体がなければ (全件スキップ等) 空の索引。
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ScraperError> {
        let dir = dir.as_ref();
        let mut index = Self::new();
        if !dir.exists() {
            debug!("Output directory {:?} does not exist", dir);
            return Ok(index);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match load_roll_dir(&path) {
                Ok(Some(record)) => index.insert(record),
                Ok(None) => debug!("No listing data in {:?}", path),
                Err(e) => warn!("Skipping {:?}: {}", path, e),
            }
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn property(&self, roll_number: &str) -> Option<&PropertyRecord> {
        self.properties.get(&RollNumber::normalize(roll_number))
    }

    pub fn appeals_for_roll(&self, roll_number: &str) -> &[AppealDetail] {
        self.property(roll_number)
            .map(|record| record.appeal_details.as_slice())
            .unwrap_or_default()
    }

    pub fn appeal(&self, appeal_number: &str) -> Option<(&RollNumber, &AppealDetail)> {
        let wanted = appeal_number.trim();
        self.properties.values().find_map(|record| {
            record
                .appeal_details
                .iter()
                .find(|detail| detail.appeal_number == wanted)
                .map(|detail| (&record.roll_number, detail))
        })
    }

    /// ステータス一致 (大文字小文字を区別しない)
    pub fn appeals_with_status(&self, status: &str) -> Vec<&AppealDetail> {
        let wanted = status.trim().to_lowercase();
        self.details()
            .filter(|detail| {
                detail
                    .status()
                    .is_some_and(|s| s.trim().to_lowercase() == wanted)
            })
            .collect()
    }

    /// ステータスごとの件数 (ステータスなしは "unknown")
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for detail in self.details() {
            let status = detail.status().unwrap_or("unknown").to_string();
            *counts.entry(status).or_insert(0) += 1;
        }
        counts
    }

    /// `{roll_number: {property_info, appeal_listing, appeal_details}}`
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .properties
            .iter()
            .map(|(roll, record)| {
                let value = serde_json::json!({
                    "property_info": record.property_info,
                    "appeal_listing": record.appeal_listing,
                    "appeal_details": record.appeal_details,
                });
                (roll.to_string(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    fn details(&self) -> impl Iterator<Item = &AppealDetail> {
        self.properties
            .values()
            .flat_map(|record| record.appeal_details.iter())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ScraperError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn load_roll_dir(dir: &Path) -> Result<Option<PropertyRecord>, ScraperError> {
    let listing_path = [PageVariant::Appeals, PageVariant::Legacy]
        .iter()
        .map(|variant| dir.join(variant.listing_file_name()))
        .find(|path| path.exists());
    let Some(listing_path) = listing_path else {
        return Ok(None);
    };
    let listing: ListingRecord = read_json(&listing_path)?;

    let aggregate_path = dir.join(AGGREGATE_FILE);
    let appeals = if aggregate_path.exists() {
        read_json::<AppealAggregate>(&aggregate_path)?.appeals
    } else {
        Vec::new()
    };

    Ok(Some(PropertyRecord::from(&BatchResult { listing, appeals })))
}
