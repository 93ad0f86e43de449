//! HTML抽出モジュール
//!
//! ブラウザには触れず、取得済みHTML文字列だけを入力とする純粋関数群。

pub mod detail;
pub mod dom;
pub mod listing;

pub use detail::{extract_detail, DetailGroup, DETAIL_FIELDS};
pub use dom::{appeal_links, error_banner, FieldSpec, APPEAL_LINK_SELECTOR};
pub use listing::{extract_listing, normalize_header, ListingField};
