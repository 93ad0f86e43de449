//! テスト用の疑似 E-Status サイト (ブラウザ・ネットワーク不要)

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::extract::APPEAL_LINK_SELECTOR;
use crate::roll_number::RollNumber;
use crate::session::{ROLL_NUMBER_FIELDS, SUBMIT_BUTTON};
use crate::traits::{PageDriver, PageLauncher};

const SEARCH_FORM: &str = include_str!("../tests/fixtures/search_form.html");
const SEARCH_REJECTED: &str = include_str!("../tests/fixtures/search_rejected.html");
const LEGACY_LISTING: &str = include_str!("../tests/fixtures/legacy_listing.html");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Blank,
    Home,
    Rejected,
    Listing(String),
    Detail(String, usize),
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Appeals(usize),
    Legacy,
}

#[derive(Debug)]
struct SiteState {
    properties: HashMap<String, Layout>,
    fields: HashMap<String, String>,
    screen: Screen,
    history: Vec<Screen>,
    unreachable: bool,
    hide_form: bool,
    fail_back_for: HashSet<usize>,
    fail_click_for: HashSet<usize>,
    break_on_back_failure: bool,
    home_title: Option<String>,
    blank_details: HashSet<usize>,
    fail_close: bool,
    launches: usize,
    goto_calls: usize,
    detail_visits: Vec<usize>,
    closed: bool,
}

impl Default for SiteState {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            fields: HashMap::new(),
            screen: Screen::Blank,
            history: Vec::new(),
            unreachable: false,
            hide_form: false,
            fail_back_for: HashSet::new(),
            fail_click_for: HashSet::new(),
            break_on_back_failure: false,
            home_title: None,
            blank_details: HashSet::new(),
            fail_close: false,
            launches: 0,
            goto_calls: 0,
            detail_visits: Vec::new(),
            closed: false,
        }
    }
}

/// 状態を共有するサイト (テスト側から操作・観測する)
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    /// "Appeals" レイアウトで `appeals` 件の申立てを持つ物件を登録
    pub fn add_property(&self, roll: &RollNumber, appeals: usize) {
        self.state()
            .properties
            .insert(roll.digits().to_string(), Layout::Appeals(appeals));
    }

    pub fn add_legacy_property(&self, roll: &RollNumber) {
        self.state()
            .properties
            .insert(roll.digits().to_string(), Layout::Legacy);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    pub fn hide_search_form(&self, hide: bool) {
        self.state().hide_form = hide;
    }

    /// `index` 番目の詳細ページからの戻りを1回だけ失敗させる
    pub fn fail_back_from(&self, index: usize) {
        self.state().fail_back_for.insert(index);
    }

    pub fn fail_click_on(&self, index: usize) {
        self.state().fail_click_for.insert(index);
    }

    /// 戻り失敗と同時にサイトを到達不能にする (復旧も失敗する)
    pub fn break_on_back_failure(&self) {
        self.state().break_on_back_failure = true;
    }

    /// トップページのタイトルを差し替える (フォームはそのまま)
    pub fn retitle_home(&self, title: &str) {
        self.state().home_title = Some(title.to_string());
    }

    /// `index` 番目の詳細ページをラベルなしで返す
    pub fn blank_detail(&self, index: usize) {
        self.state().blank_details.insert(index);
    }

    pub fn fail_close(&self, fail: bool) {
        self.state().fail_close = fail;
    }

    pub fn launches(&self) -> usize {
        self.state().launches
    }

    pub fn filled(&self, selector: &str) -> Option<String> {
        self.state().fields.get(selector).cloned()
    }

    pub fn filled_digits(&self) -> String {
        let state = self.state();
        ROLL_NUMBER_FIELDS
            .iter()
            .filter_map(|sel| state.fields.get(*sel).cloned())
            .collect()
    }

    pub fn goto_calls(&self) -> usize {
        self.state().goto_calls
    }

    pub fn detail_visits(&self) -> Vec<usize> {
        self.state().detail_visits.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

pub fn appeal_number(digits: &str, index: usize) -> String {
    format!("{}-{:03}", &digits[15..], index + 1)
}

fn listing_html(digits: &str, appeals: usize) -> String {
    let rows: String = (0..appeals)
        .map(|i| {
            let number = appeal_number(digits, i);
            format!(
                r#"<tr><td><a href="ComplaintDetail.aspx?AppealNo={number}">{number}</a></td><td>OWNER {i}</td><td>Open</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><head><title>E-Services - Appeals</title></head><body>
        <div class="row"><div class="col-md-3">Roll Number:</div><div class="col-md-3">{digits}</div></div>
        <div class="row"><div class="col-md-3">Location &amp; Property Description:</div><div class="col-md-3">LOT {digits}</div></div>
        <table class="table"><tr><th>AppealNo</th><th>Appellant</th><th>Status</th></tr>{rows}</table>
        </body></html>"#
    )
}

fn detail_html(digits: &str, index: usize) -> String {
    let status = if index % 2 == 0 { "Scheduled" } else { "Closed" };
    format!(
        r#"<html><head><title>E-Services - Appeal Detail</title></head><body>
        <div class="row"><div class="col-md-4">Property Roll Number:</div><div class="col-md-4">{digits}</div></div>
        <div class="row"><div class="col-md-4">Name1:</div><div class="col-md-4">OWNER {index}</div></div>
        <div class="row"><div class="col-md-4">Status:</div><div class="col-md-4">{status}</div></div>
        </body></html>"#
    )
}

impl SiteState {
    fn navigate(&mut self, next: Screen) {
        let previous = std::mem::replace(&mut self.screen, next);
        if previous != Screen::Blank {
            self.history.push(previous);
        }
    }

    fn has_form(&self) -> bool {
        matches!(self.screen, Screen::Home | Screen::Rejected) && !self.hide_form
    }

    fn html(&self) -> String {
        match &self.screen {
            Screen::Blank => "<html><head><title></title></head><body></body></html>".into(),
            Screen::Home => match &self.home_title {
                Some(title) => SEARCH_FORM.replace(
                    "<title>ARB E-Status</title>",
                    &format!("<title>{}</title>", title),
                ),
                None => SEARCH_FORM.into(),
            },
            Screen::Rejected => SEARCH_REJECTED.into(),
            Screen::Listing(digits) => match self.properties.get(digits) {
                Some(Layout::Appeals(count)) => listing_html(digits, *count),
                _ => LEGACY_LISTING.into(),
            },
            Screen::Detail(_, index) if self.blank_details.contains(index) => {
                "<html><head><title>E-Services - Appeal Detail</title></head><body><p>Details unavailable</p></body></html>".into()
            }
            Screen::Detail(digits, index) => detail_html(digits, *index),
        }
    }

    fn appeal_count(&self) -> usize {
        match &self.screen {
            Screen::Listing(digits) => match self.properties.get(digits) {
                Some(Layout::Appeals(count)) => *count,
                _ => 0,
            },
            _ => 0,
        }
    }
}

pub struct FakePage {
    site: FakeSite,
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        state.goto_calls += 1;
        if state.unreachable {
            return Err(ScraperError::Navigation(format!("{} unreachable", url)));
        }
        state.fields.clear();
        state.navigate(Screen::Home);
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, _timeout: Duration) -> Result<(), ScraperError> {
        let state = self.site.state();
        let is_form_control = ROLL_NUMBER_FIELDS.contains(&selector) || selector == SUBMIT_BUTTON;
        if is_form_control && state.has_form() {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound(selector.to_string()))
        }
    }

    async fn title(&self) -> Result<String, ScraperError> {
        let html = self.site.state().html();
        let doc = scraper::Html::parse_document(&html);
        Ok(crate::extract::dom::page_title(&doc))
    }

    async fn content(&self) -> Result<String, ScraperError> {
        Ok(self.site.state().html())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        if !state.has_form() || !ROLL_NUMBER_FIELDS.contains(&selector) {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        }
        state.fields.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        if selector != SUBMIT_BUTTON || !state.has_form() {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        }
        let digits: String = ROLL_NUMBER_FIELDS
            .iter()
            .filter_map(|sel| state.fields.get(*sel).cloned())
            .collect();
        let next = if state.properties.contains_key(&digits) {
            Screen::Listing(digits)
        } else {
            Screen::Rejected
        };
        state.navigate(next);
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        let Screen::Listing(digits) = state.screen.clone() else {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        };
        if selector != APPEAL_LINK_SELECTOR
            || index >= state.appeal_count()
            || state.fail_click_for.remove(&index)
        {
            return Err(ScraperError::ElementNotFound(format!("{} [{}]", selector, index)));
        }
        state.detail_visits.push(index);
        state.navigate(Screen::Detail(digits, index));
        Ok(())
    }

    async fn go_back(&self) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        if let Screen::Detail(_, index) = state.screen {
            if state.fail_back_for.remove(&index) {
                if state.break_on_back_failure {
                    state.unreachable = true;
                }
                return Err(ScraperError::Navigation("history back failed".into()));
            }
        }
        let previous = state
            .history
            .pop()
            .ok_or_else(|| ScraperError::Navigation("no history".into()))?;
        state.screen = previous;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn close(&self) -> Result<(), ScraperError> {
        let mut state = self.site.state();
        state.closed = true;
        if state.fail_close {
            return Err(ScraperError::Navigation("browser already gone".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    site: FakeSite,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self { site }
    }
}

#[async_trait]
impl PageLauncher for FakeLauncher {
    type Page = FakePage;

    async fn launch(&self, _config: &ScraperConfig) -> Result<FakePage, ScraperError> {
        self.site.state().launches += 1;
        Ok(FakePage {
            site: self.site.clone(),
        })
    }
}

/// テストごとのユニークな出力ディレクトリ
pub fn temp_output_dir(name: &str) -> std::path::PathBuf {
    let unique_id = format!(
        "{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    std::env::temp_dir().join(format!("arb-scraper-{}-{}", name, unique_id))
}
