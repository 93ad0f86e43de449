//! 不服申立て詳細ページの抽出

use scraper::Html;
use tracing::debug;

use super::dom::{self, FieldSpec};
use crate::types::{AppealDetail, FieldGroup};

/// 詳細ページのフィールドグループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailGroup {
    Property,
    Appellant,
    Status,
    Decision,
}

const DETAIL_CELL: &str = "div.col-md-4";

pub const DETAIL_FIELDS: &[FieldSpec<DetailGroup>] = &[
    FieldSpec { label: "Property Roll Number:", group: DetailGroup::Property, key: "roll_number" },
    FieldSpec { label: "Location & Property Description:", group: DetailGroup::Property, key: "description" },
    FieldSpec { label: "Municipality:", group: DetailGroup::Property, key: "municipality" },
    FieldSpec { label: "Property Classification:", group: DetailGroup::Property, key: "classification" },
    FieldSpec { label: "NBHD:", group: DetailGroup::Property, key: "nbhd" },
    FieldSpec { label: "Name1:", group: DetailGroup::Appellant, key: "name1" },
    FieldSpec { label: "Name2:", group: DetailGroup::Appellant, key: "name2" },
    FieldSpec { label: "Name of Representative:", group: DetailGroup::Appellant, key: "representative" },
    FieldSpec { label: "Filing Date:", group: DetailGroup::Appellant, key: "filing_date" },
    FieldSpec { label: "Tax Date:", group: DetailGroup::Appellant, key: "tax_date" },
    FieldSpec { label: "Section:", group: DetailGroup::Appellant, key: "section" },
    FieldSpec { label: "Reason for Appeal:", group: DetailGroup::Appellant, key: "reason_for_appeal" },
    FieldSpec { label: "Status:", group: DetailGroup::Status, key: "status" },
    FieldSpec { label: "Decision Number:", group: DetailGroup::Decision, key: "decision_number" },
    FieldSpec { label: "Decision Mailing Date:", group: DetailGroup::Decision, key: "mailing_date" },
    FieldSpec { label: "Decision(s):", group: DetailGroup::Decision, key: "decisions" },
];

impl AppealDetail {
    fn group_mut(&mut self, group: DetailGroup) -> &mut FieldGroup {
        match group {
            DetailGroup::Property => &mut self.property_info,
            DetailGroup::Appellant => &mut self.appellant_info,
            DetailGroup::Status => &mut self.status_info,
            DetailGroup::Decision => &mut self.decision_info,
        }
    }
}

/// 詳細ページHTMLからレコードを抽出
///
/// 各ラベルは独立に検索し、見つからないものはキーごと省略する。
pub fn extract_detail(html: &str, appeal_number: &str) -> AppealDetail {
    let mut detail = AppealDetail::new(appeal_number);
    let Some(cell) = dom::compile(DETAIL_CELL) else {
        return detail;
    };

    let doc = Html::parse_document(html);
    for field in DETAIL_FIELDS {
        if let Some(value) = dom::sibling_text(&doc, &cell, field.label) {
            detail.group_mut(field.group).insert(field.key.to_string(), value);
        }
    }

    debug!(
        "Appeal {}: {} property, {} appellant, {} status, {} decision fields",
        appeal_number,
        detail.property_info.len(),
        detail.appellant_info.len(),
        detail.status_info.len(),
        detail.decision_info.len()
    );
    detail
}
