//! 抽出レコードの型定義

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roll_number::RollNumber;

/// 一覧ページのレイアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageVariant {
    /// 旧レイアウト (td ラベル)
    Legacy,
    /// タイトルに "Appeals" を含むレイアウト
    Appeals,
}

impl PageVariant {
    pub fn from_title(title: &str) -> Self {
        if title.contains("Appeals") {
            Self::Appeals
        } else {
            Self::Legacy
        }
    }

    /// 一覧JSONのファイル名
    pub fn listing_file_name(self) -> &'static str {
        match self {
            Self::Appeals => "appeals_data.json",
            Self::Legacy => "data.json",
        }
    }

    /// 一覧HTMLスナップショットのファイル名
    pub fn html_file_name(self) -> &'static str {
        match self {
            Self::Appeals => "appeals.html",
            Self::Legacy => "page.html",
        }
    }
}

/// 一覧ページの物件情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

/// 一覧テーブルの1行 (正規化済みヘッダー → セル)
pub type AppealSummary = BTreeMap<String, String>;

/// テーブルの生データ (行 × セル)
pub type RawTable = Vec<Vec<String>>;

/// ロール番号検索1回分の一覧レコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub roll_number: RollNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_timestamp: Option<DateTime<Utc>>,
    pub page_title: String,
    pub variant: PageVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number_displayed: Option<String>,
    pub property_info: PropertyInfo,
    pub appeal_info: Vec<AppealSummary>,
    pub raw_tables: Vec<RawTable>,
}

impl ListingRecord {
    pub fn new(roll_number: RollNumber, page_title: impl Into<String>, variant: PageVariant) -> Self {
        Self {
            roll_number,
            extracted_timestamp: None,
            page_title: page_title.into(),
            variant,
            roll_number_displayed: None,
            property_info: PropertyInfo::default(),
            appeal_info: Vec::new(),
            raw_tables: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_timestamp = Some(at);
        self
    }
}

/// 詳細ページのフィールドグループ
pub type FieldGroup = BTreeMap<String, String>;

/// 不服申立て詳細
///
/// 4グループは常に存在する (空でもよい)。ページ構成が申立て種別で変わるため必須項目はない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealDetail {
    pub appeal_number: String,
    pub property_info: FieldGroup,
    pub appellant_info: FieldGroup,
    pub status_info: FieldGroup,
    pub decision_info: FieldGroup,
}

impl AppealDetail {
    pub fn new(appeal_number: impl Into<String>) -> Self {
        Self {
            appeal_number: appeal_number.into(),
            ..Default::default()
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status_info.get("status").map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.property_info.is_empty()
            && self.appellant_info.is_empty()
            && self.status_info.is_empty()
            && self.decision_info.is_empty()
    }
}

/// `all_appeal_details.json` の形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealAggregate {
    pub roll_number: RollNumber,
    pub appeals: Vec<AppealDetail>,
}

/// ロール番号1件分の結果
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub listing: ListingRecord,
    pub appeals: Vec<AppealDetail>,
}

impl BatchResult {
    pub fn roll_number(&self) -> &RollNumber {
        &self.listing.roll_number
    }
}

/// ロール番号1件の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum RollOutcome {
    Completed(BatchResult),
    /// サイトが検索を拒否 (エラーバナー)
    Skipped,
}

/// バッチ全体の集計
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub appeals_captured: usize,
}

impl BatchSummary {
    pub fn start(total: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total,
            completed: 0,
            skipped: 0,
            failed: 0,
            appeals_captured: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_title() {
        assert_eq!(PageVariant::from_title("E-Services - Appeals"), PageVariant::Appeals);
        assert_eq!(PageVariant::from_title("ARB E-Status"), PageVariant::Legacy);
        assert_eq!(PageVariant::Appeals.listing_file_name(), "appeals_data.json");
        assert_eq!(PageVariant::Legacy.html_file_name(), "page.html");
    }

    #[test]
    fn test_empty_detail_keeps_all_groups() {
        let detail = AppealDetail::new("1234567");
        assert!(detail.is_empty());

        let json: serde_json::Value = serde_json::to_value(&detail).unwrap();
        for group in ["property_info", "appellant_info", "status_info", "decision_info"] {
            assert_eq!(json[group], serde_json::json!({}), "{group}");
        }
    }

    #[test]
    fn test_listing_skips_missing_property_fields() {
        let listing = ListingRecord::new(
            RollNumber::normalize("1234567890123456789"),
            "E-Services - Appeals",
            PageVariant::Appeals,
        );
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["property_info"], serde_json::json!({}));
        assert_eq!(json["variant"], "appeals");
        assert!(json.get("extracted_timestamp").is_none());
    }
}
