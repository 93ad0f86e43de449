//! 一覧ページ (ロール番号検索結果) の抽出

use scraper::Html;
use tracing::{debug, warn};

use super::dom::{self, FieldSpec};
use crate::roll_number::RollNumber;
use crate::types::{AppealSummary, ListingRecord, PageVariant, RawTable};

/// 一覧ページの物件情報フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    RollNumberDisplayed,
    Description,
    Address,
    Municipality,
}

const APPEALS_CELL: &str = "div.col-md-3";
const LEGACY_CELL: &str = "td";

const APPEALS_FIELDS: &[FieldSpec<ListingField>] = &[
    FieldSpec { label: "Roll Number:", group: ListingField::RollNumberDisplayed, key: "roll_number_displayed" },
    FieldSpec { label: "Location & Property Description:", group: ListingField::Description, key: "description" },
    FieldSpec { label: "Municipality:", group: ListingField::Municipality, key: "municipality" },
];

const LEGACY_FIELDS: &[FieldSpec<ListingField>] = &[
    FieldSpec { label: "Property Address:", group: ListingField::Address, key: "address" },
    FieldSpec { label: "Municipality:", group: ListingField::Municipality, key: "municipality" },
];

impl PageVariant {
    fn listing_fields(self) -> (&'static str, &'static [FieldSpec<ListingField>]) {
        match self {
            Self::Appeals => (APPEALS_CELL, APPEALS_FIELDS),
            Self::Legacy => (LEGACY_CELL, LEGACY_FIELDS),
        }
    }

    /// テーブル先頭行がこのレイアウトの一覧ヘッダーか
    fn is_appeal_header(self, header: &[String]) -> bool {
        match self {
            // "AppealNo" / "Appeal Number"
            Self::Appeals => header.first().is_some_and(|first| first.contains("Appeal")),
            Self::Legacy => header.iter().any(|cell| cell == "Appeal Number"),
        }
    }

    fn column_key(self, header: &str) -> String {
        match self {
            Self::Appeals => normalize_header(header),
            Self::Legacy => header.to_string(),
        }
    }
}

/// ヘッダー文字列をキーに正規化 ("No"→"Number"、空白→"_"、小文字化)
///
/// 出力は小文字のみなので再適用しても変化しない。
pub fn normalize_header(header: &str) -> String {
    header.replace("No", "Number").replace(' ', "_").to_lowercase()
}

/// 一覧ページHTMLからレコードを抽出
///
/// ベストエフォート: 見つからない項目は欠落として扱い、エラーにはしない。
pub fn extract_listing(html: &str, roll_number: &RollNumber) -> ListingRecord {
    let doc = Html::parse_document(html);
    let title = dom::page_title(&doc);
    let variant = PageVariant::from_title(&title);
    debug!("Listing page '{}' detected as {:?}", title, variant);

    let mut record = ListingRecord::new(roll_number.clone(), title, variant);

    let (cell, fields) = variant.listing_fields();
    if let Some(cell) = dom::compile(cell) {
        for field in fields {
            match dom::sibling_text(&doc, &cell, field.label) {
                Some(value) => apply_field(&mut record, field.group, value),
                None => debug!("Listing field '{}' not found on page", field.key),
            }
        }
    }

    // 旧レイアウトでも表示ロール番号は div セルに出る
    if variant == PageVariant::Legacy {
        if let Some(cell) = dom::compile(APPEALS_CELL) {
            record.roll_number_displayed = dom::sibling_text(&doc, &cell, "Roll Number:");
        }
    }

    record.raw_tables = dom::extract_tables(&doc);
    record.appeal_info = appeal_rows(variant, record.raw_tables.first());

    if record.appeal_info.is_empty() && !record.raw_tables.is_empty() {
        warn!(
            "No appeal table recognised for roll number {} ({} tables on page)",
            roll_number,
            record.raw_tables.len()
        );
    }

    record
}

fn apply_field(record: &mut ListingRecord, field: ListingField, value: String) {
    let slot = match field {
        ListingField::RollNumberDisplayed => &mut record.roll_number_displayed,
        ListingField::Description => &mut record.property_info.description,
        ListingField::Address => &mut record.property_info.address,
        ListingField::Municipality => &mut record.property_info.municipality,
    };
    *slot = Some(value);
}

/// 先頭テーブルを一覧として行マップに変換
fn appeal_rows(variant: PageVariant, table: Option<&RawTable>) -> Vec<AppealSummary> {
    let Some((header, rows)) = table.and_then(|t| t.split_first()) else {
        return Vec::new();
    };
    if rows.is_empty() || !variant.is_appeal_header(header) {
        return Vec::new();
    }

    let keys: Vec<String> = header.iter().map(|h| variant.column_key(h)).collect();
    rows.iter()
        .map(|row| {
            keys.iter()
                .zip(row)
                .map(|(key, cell)| (key.clone(), cell.clone()))
                .collect()
        })
        .collect()
}
