//! 解析済みDOMに対する汎用クエリ

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::types::RawTable;

pub const TABLE_SELECTOR: &str = "table.table";
pub const APPEAL_LINK_SELECTOR: &str = r#"table.table a[href^="ComplaintDetail.aspx"]"#;
pub const ERROR_BANNER_SELECTOR: &str = "div.alert-danger, .alert-warning";

/// ラベル → 値の対応定義
///
/// `group` はレコード内の格納先、`key` はそのキー名。
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<G> {
    pub label: &'static str,
    pub group: G,
    pub key: &'static str,
}

/// セレクタをコンパイル (失敗はログのみ)
pub fn compile(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Failed to compile selector '{}': {}", selector, e);
            None
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 要素のテキスト (前後の空白を除去)
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// ラベルを含むセルの直後の兄弟セルのテキストを取得
///
/// ラベル照合は大文字小文字を区別せず、空白を畳んだ部分一致。
/// 兄弟要素も `cell` に一致する必要がある (`cell:has-text(label) + cell`)。
pub fn sibling_text(doc: &Html, cell: &Selector, label: &str) -> Option<String> {
    let needle = collapse_whitespace(label).to_lowercase();

    doc.select(cell)
        .filter(|el| {
            collapse_whitespace(&el.text().collect::<String>())
                .to_lowercase()
                .contains(&needle)
        })
        .find_map(|el| next_element_sibling(el).filter(|sibling| cell.matches(sibling)))
        .map(element_text)
}

pub fn page_title(doc: &Html) -> String {
    compile("title")
        .and_then(|selector| doc.select(&selector).next().map(element_text))
        .unwrap_or_default()
}

/// テーブルを行 × セルの文字列に展開
///
/// セルのない行、行のないテーブルは含めない。
pub fn extract_tables(doc: &Html) -> Vec<RawTable> {
    let (Some(tables), Some(rows), Some(cells)) =
        (compile(TABLE_SELECTOR), compile("tr"), compile("td, th"))
    else {
        return Vec::new();
    };

    doc.select(&tables)
        .map(|table| {
            table
                .select(&rows)
                .map(|row| row.select(&cells).map(element_text).collect::<Vec<_>>())
                .filter(|row| !row.is_empty())
                .collect::<RawTable>()
        })
        .filter(|table| !table.is_empty())
        .collect()
}

/// 検索結果のエラー/警告バナーの文言
pub fn error_banner(html: &str) -> Option<String> {
    let selector = compile(ERROR_BANNER_SELECTOR)?;
    let doc = Html::parse_document(html);
    let banner = doc.select(&selector).next()?;
    Some(element_text(banner))
}

/// 一覧テーブル内の詳細リンク (表示テキスト) をDOM順で取得
pub fn appeal_links(html: &str) -> Vec<String> {
    let Some(selector) = compile(APPEAL_LINK_SELECTOR) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    doc.select(&selector).map(element_text).collect()
}
