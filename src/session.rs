//! E-Status サイトのセッション (ページ1枚)

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::extract::{self, APPEAL_LINK_SELECTOR};
use crate::roll_number::RollNumber;
use crate::traits::{PageDriver, PageLauncher};
use crate::types::{AppealDetail, ListingRecord};

/// ロール番号の入力欄 (セグメント順)
pub const ROLL_NUMBER_FIELDS: [&str; 6] = [
    "#MainContent_txtRollNo1",
    "#MainContent_txtRollNo2",
    "#MainContent_txtRollNo3",
    "#MainContent_txtRollNo4",
    "#MainContent_txtRollNo5",
    "#MainContent_txtRollNo6",
];
pub const SUBMIT_BUTTON: &str = "#MainContent_btnSubmit";

/// トップページのタイトルに含まれるはずの文字列
const EXPECTED_TITLE_PARTS: [&str; 3] = ["E-Status", "ARB", "Appeals"];

pub struct SessionDriver<L: PageLauncher> {
    config: ScraperConfig,
    launcher: L,
    page: Option<L::Page>,
}

impl<L: PageLauncher> SessionDriver<L> {
    pub fn new(config: ScraperConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            page: None,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.page.is_some()
    }

    fn get_page(&self) -> Result<&L::Page, ScraperError> {
        self.page.as_ref().ok_or(ScraperError::NotStarted)
    }

    fn base_url(&self) -> Result<&str, ScraperError> {
        self.config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ScraperError::SessionStart("URL が設定されていません".into()))
    }

    /// ページを取得してトップページを開く
    ///
    /// 開始済みなら何もしない。
    pub async fn start(&mut self) -> Result<(), ScraperError> {
        if self.is_started() {
            debug!("Session already started");
            return Ok(());
        }
        let base_url = self.base_url()?.to_string();
        info!("Starting session for {}", base_url);

        let page = self.launcher.launch(&self.config).await.map_err(|e| match e {
            ScraperError::SessionStart(_) => e,
            other => ScraperError::SessionStart(other.to_string()),
        })?;
        self.page = Some(page);

        if let Err(e) = self.navigate_home().await {
            if let Err(close_err) = self.close().await {
                warn!("Failed to close page after start failure: {}", close_err);
            }
            return Err(ScraperError::SessionStart(format!(
                "{} に接続できません: {}",
                base_url, e
            )));
        }

        info!("Session started");
        Ok(())
    }

    /// トップページへ遷移
    ///
    /// タイトルの確認は目安のみで、想定外でも警告に留める。
    pub async fn navigate_home(&self) -> Result<(), ScraperError> {
        let page = self.get_page()?;
        let base_url = self.base_url()?;

        page.goto(base_url).await?;
        page.wait_for_network_idle(self.config.navigation_timeout).await?;

        match page.title().await {
            Ok(title) if EXPECTED_TITLE_PARTS.iter().any(|part| title.contains(part)) => {
                debug!("Home page loaded: {}", title);
            }
            Ok(title) => warn!(
                "Page title '{}' does not contain expected text. The page may not have loaded correctly.",
                title
            ),
            Err(e) => warn!("Failed to read page title: {}", e),
        }
        Ok(())
    }

    /// ロール番号を6つの入力欄に入力
    pub async fn enter_roll_number(&self, roll_number: &RollNumber) -> Result<(), ScraperError> {
        let page = self.get_page()?;

        page.wait_for_visible(ROLL_NUMBER_FIELDS[0], self.config.element_timeout)
            .await
            .map_err(|e| match e {
                ScraperError::ElementNotFound(_) => e,
                other => ScraperError::ElementNotFound(format!(
                    "{}: {}",
                    ROLL_NUMBER_FIELDS[0], other
                )),
            })?;

        for (selector, segment) in ROLL_NUMBER_FIELDS.iter().zip(roll_number.segments()) {
            page.fill(selector, segment).await?;
        }

        info!("Entered roll number: {}", roll_number);
        Ok(())
    }

    /// 検索を送信
    ///
    /// エラーバナーが出た場合やページ操作に失敗した場合は `Ok(false)`。
    pub async fn submit_search(&self) -> Result<bool, ScraperError> {
        let page = self.get_page()?;

        let submitted: Result<String, ScraperError> = async {
            page.wait_for_visible(SUBMIT_BUTTON, self.config.element_timeout)
                .await?;
            page.click(SUBMIT_BUTTON).await?;
            page.wait_for_network_idle(self.config.navigation_timeout)
                .await?;
            page.content().await
        }
        .await;

        match submitted {
            Ok(html) => match extract::error_banner(&html) {
                Some(message) => {
                    warn!("Search rejected by site: {}", message);
                    Ok(false)
                }
                None => {
                    info!("Search submitted");
                    Ok(true)
                }
            },
            Err(e) => {
                warn!("Error submitting search: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn go_back(&self) -> Result<(), ScraperError> {
        let page = self.get_page()?;
        page.go_back().await?;
        page.wait_for_network_idle(self.config.navigation_timeout)
            .await
    }

    pub async fn title(&self) -> Result<String, ScraperError> {
        self.get_page()?.title().await
    }

    pub async fn html(&self) -> Result<String, ScraperError> {
        self.get_page()?.content().await
    }

    /// 現在の一覧ページの詳細リンク (毎回DOMから取り直す)
    pub async fn appeal_links(&self) -> Result<Vec<String>, ScraperError> {
        Ok(extract::appeal_links(&self.html().await?))
    }

    /// `index` 番目の詳細リンクを開く
    pub async fn open_appeal(&self, index: usize) -> Result<(), ScraperError> {
        let page = self.get_page()?;
        page.click_nth(APPEAL_LINK_SELECTOR, index).await?;
        page.wait_for_network_idle(self.config.navigation_timeout)
            .await
    }

    pub async fn extract_listing(&self, roll_number: &RollNumber) -> Result<ListingRecord, ScraperError> {
        Ok(extract::extract_listing(&self.html().await?, roll_number))
    }

    pub async fn extract_detail(&self, appeal_number: &str) -> Result<AppealDetail, ScraperError> {
        Ok(extract::extract_detail(&self.html().await?, appeal_number))
    }

    pub async fn save_html(&self, path: &Path) -> Result<(), ScraperError> {
        let html = self.html().await?;
        std::fs::write(path, html)?;
        info!("HTML content saved to {:?}", path);
        Ok(())
    }

    pub async fn screenshot_bytes(&self) -> Result<Vec<u8>, ScraperError> {
        self.get_page()?.screenshot().await
    }

    pub async fn take_screenshot(&self, path: &Path) -> Result<(), ScraperError> {
        let png = self.screenshot_bytes().await?;
        std::fs::write(path, png)?;
        info!("Screenshot saved to {:?}", path);
        Ok(())
    }

    /// ページを解放 (未開始でも成功)
    pub async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(page) = self.page.take() {
            page.close().await?;
            info!("Session closed");
        }
        Ok(())
    }
}
