//! chromiumoxide による `PageDriver` 実装

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    GetNavigationHistoryParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{PageDriver, PageLauncher};

/// CDPリクエストタイムアウト
const REQUEST_TIMEOUT_SECS: u64 = 60;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// 連続アイドル判定回数
const REQUIRED_IDLE_CHECKS: u32 = 3;
/// 要素表示チェックのインターバル（ミリ秒）
const VISIBLE_CHECK_INTERVAL_MS: u64 = 250;
/// クリック後、遷移が始まるまでの待機（ミリ秒）
const CLICK_SETTLE_MS: u64 = 1000;

/// 遷移系のCDPエラーを分類 (リクエストタイムアウトは `Timeout`)
fn navigation_error(context: &str, err: CdpError) -> ScraperError {
    match err {
        CdpError::Timeout => ScraperError::Timeout(context.to_string()),
        other => ScraperError::Navigation(format!("{}: {}", context, other)),
    }
}

/// JS文字列リテラルとして埋め込む
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Chromeを起動してページを1枚開く
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl PageLauncher for ChromeLauncher {
    type Page = ChromePage;

    async fn launch(&self, config: &ScraperConfig) -> Result<ChromePage, ScraperError> {
        info!("Launching Chrome...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("arb-scraper-{}", unique_id));

        let (width, height) = config.window_size;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(width, height)
            .request_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::SessionStart(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::SessionStart(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::SessionStart(e.to_string()))?;

        info!("Chrome launched");
        Ok(ChromePage {
            page,
            browser: Mutex::new(Some(browser)),
            handler,
        })
    }
}

pub struct ChromePage {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromePage {
    async fn eval_bool(&self, script: &str) -> Result<bool, ScraperError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| navigation_error(url, e))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| navigation_error(url, e))?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScraperError> {
        debug!("Waiting for network to become idle...");
        let start = Instant::now();
        let mut idle_count = 0;

        while start.elapsed() < timeout {
            // readyState と Performance API で判定
            let result = self
                .page
                .evaluate(
                    r#"
                    (() => {
                        if (document.readyState !== 'complete') return false;
                        const now = performance.now();
                        const recent = performance.getEntriesByType('resource').filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });
                        return recent.length === 0;
                    })()
                "#,
                )
                .await;

            match result {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            debug!("Network idle after {:?}", start.elapsed());
                            return Ok(());
                        }
                    } else {
                        idle_count = 0;
                    }
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<(), ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.display !== 'none' && style.visibility !== 'hidden'
                    && rect.width > 0 && rect.height > 0;
            }})()
        "#,
            js_string(selector)
        );

        let start = Instant::now();
        while start.elapsed() < timeout {
            match self.eval_bool(&script).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!("Visibility check error for {}: {}", selector, e),
            }
            sleep(Duration::from_millis(VISIBLE_CHECK_INTERVAL_MS)).await;
        }

        Err(ScraperError::ElementNotFound(format!(
            "{} ({:?}以内に表示されませんでした)",
            selector, timeout
        )))
    }

    async fn title(&self) -> Result<String, ScraperError> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, ScraperError> {
        self.page
            .content()
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.focus();
                el.value = {};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
        "#,
            js_string(selector),
            js_string(value)
        );

        if self.eval_bool(&script).await? {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound(selector.to_string()))
        }
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("{} クリック: {}", selector, e)))?;

        sleep(Duration::from_millis(CLICK_SETTLE_MS)).await;
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const els = document.querySelectorAll({});
                if (els.length <= {index}) return false;
                els[{index}].click();
                return true;
            }})()
        "#,
            js_string(selector),
        );

        if !self.eval_bool(&script).await? {
            return Err(ScraperError::ElementNotFound(format!(
                "{} [{}]",
                selector, index
            )));
        }

        sleep(Duration::from_millis(CLICK_SETTLE_MS)).await;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), ScraperError> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(|e| navigation_error("履歴取得", e))?;

        let current = usize::try_from(history.result.current_index).unwrap_or(0);
        let previous = current
            .checked_sub(1)
            .and_then(|idx| history.result.entries.get(idx))
            .ok_or_else(|| ScraperError::Navigation("戻り先の履歴がありません".into()))?;

        self.page
            .execute(NavigateToHistoryEntryParams::new(previous.id))
            .await
            .map_err(|e| navigation_error("履歴遷移", e))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| navigation_error("戻り後の読み込み", e))?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ScraperError::JavaScript(format!("スクリーンショット: {}", e)))
    }

    async fn close(&self) -> Result<(), ScraperError> {
        info!("Closing Chrome...");
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                debug!("Failed to close browser: {}", e);
            }
        }
        self.handler.abort();
        Ok(())
    }
}
