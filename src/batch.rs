//! ロール番号のバッチ処理
//!
//! 1ロール番号ごとに: トップへ戻る → 入力 → 検索 → 一覧抽出 → 各申立て詳細 → 集約保存。
//! 1件の失敗でバッチ全体は止めない (中断するのはセッション開始系のエラーのみ)。
//!
//! 詳細ページからの戻りに失敗した場合は、トップから再検索して一覧を復元し、
//! リンクを取り直して次のインデックスから再開する。一覧の並び順は保証されないため、
//! 正確なカーソル位置での再開ではない (既知の制約)。

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::ScraperError;
use crate::output::{OutputSink, AGGREGATE_FILE, SCREENSHOT_FILE};
use crate::roll_number::RollNumber;
use crate::session::SessionDriver;
use crate::traits::PageLauncher;
use crate::types::{
    AppealAggregate, AppealDetail, BatchResult, BatchSummary, PageVariant, RollOutcome,
};

/// バッチ実行結果
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<BatchResult>,
}

pub struct BatchRunner<L: PageLauncher> {
    session: SessionDriver<L>,
    sink: OutputSink,
}

impl<L: PageLauncher> BatchRunner<L> {
    pub fn new(session: SessionDriver<L>) -> Self {
        let sink = OutputSink::new(session.config().output_dir.clone());
        Self { session, sink }
    }

    pub fn session(&self) -> &SessionDriver<L> {
        &self.session
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// セッションを閉じて返す
    pub async fn finish(mut self) -> Result<SessionDriver<L>, ScraperError> {
        self.session.close().await?;
        Ok(self.session)
    }

    /// 全ロール番号を順に処理
    ///
    /// セッション未開始なら開始する。開始に失敗した場合のみ `Err`。
    /// 前回の `run` から引き継いだセッションは1件目からトップへ戻る。
    pub async fn run(&mut self, roll_numbers: &[String]) -> Result<BatchReport, ScraperError> {
        let resumed = self.session.is_started();
        if !resumed {
            self.session.start().await?;
        }

        let total = roll_numbers.len();
        let mut summary = BatchSummary::start(total);
        let mut results = Vec::new();

        for (index, raw) in roll_numbers.iter().enumerate() {
            if index > 0 {
                let pause = self.session.config().roll_pause;
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }

            info!("Processing roll number {}/{}: {}", index + 1, total, raw);

            match self.process_roll_number(raw, index > 0 || resumed).await {
                Ok(RollOutcome::Completed(result)) => {
                    summary.completed += 1;
                    summary.appeals_captured += result.appeals.len();
                    results.push(result);
                }
                Ok(RollOutcome::Skipped) => {
                    summary.skipped += 1;
                }
                Err(e) if e.is_setup() => {
                    error!("Aborting batch at roll number {}: {}", raw, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Error processing roll number {}: {}", raw, e);
                    info!("Continuing with next roll number...");
                    summary.failed += 1;
                }
            }
        }

        summary.finish();
        info!(
            "Batch finished: {} completed, {} skipped, {} failed, {} appeals captured",
            summary.completed, summary.skipped, summary.failed, summary.appeals_captured
        );

        Ok(BatchReport { summary, results })
    }

    /// ロール番号1件を処理
    ///
    /// 前のロール番号の状態を持ち越さないよう、2件目以降はトップページから始める。
    pub async fn process_roll_number(
        &self,
        raw: &str,
        renavigate: bool,
    ) -> Result<RollOutcome, ScraperError> {
        let roll = RollNumber::normalize(raw);

        if renavigate {
            self.session.navigate_home().await?;
        }
        self.session.enter_roll_number(&roll).await?;

        if !self.session.submit_search().await? {
            warn!("Failed to process roll number: {} (search rejected)", roll);
            return Ok(RollOutcome::Skipped);
        }

        let dir = self.sink.create_roll_dir(&roll)?;
        let listing = self
            .session
            .extract_listing(&roll)
            .await?
            .with_timestamp(Utc::now());

        let config = self.session.config();
        self.save_page_artifacts(
            config.save_html.then(|| dir.join(listing.variant.html_file_name())),
            config.save_screenshots.then(|| dir.join(SCREENSHOT_FILE)),
        )
        .await;

        self.sink
            .write_json(&dir.join(listing.variant.listing_file_name()), &listing)?;
        info!("Data for roll number {} saved to {:?}", roll, dir);

        let appeals = match listing.variant {
            PageVariant::Appeals => self.capture_appeals(&roll, &dir).await?,
            PageVariant::Legacy => Vec::new(),
        };

        Ok(RollOutcome::Completed(BatchResult { listing, appeals }))
    }

    /// 一覧の全申立て詳細を取得
    async fn capture_appeals(
        &self,
        roll: &RollNumber,
        roll_dir: &Path,
    ) -> Result<Vec<AppealDetail>, ScraperError> {
        let mut links = self.session.appeal_links().await?;
        if links.is_empty() {
            debug!("No appeal links for {}", roll);
            return Ok(Vec::new());
        }

        let total = links.len();
        info!("Found {} appeal links, processing all of them", total);
        self.sink.create_details_dir(roll)?;

        let mut details = Vec::with_capacity(total);
        for index in 0..total {
            let Some(link_text) = links.get(index) else {
                warn!(
                    "Appeal link {}/{} no longer present for {}, abandoning remaining appeals",
                    index + 1,
                    total,
                    roll
                );
                break;
            };
            let appeal_number = if link_text.is_empty() {
                (index + 1).to_string()
            } else {
                link_text.clone()
            };
            info!("Processing appeal {} ({}/{})", appeal_number, index + 1, total);

            if let Err(e) = self.session.open_appeal(index).await {
                // クリックできていなければ一覧のまま
                warn!("Failed to open appeal {}: {}", appeal_number, e);
                self.log_debug_screenshot().await;
            } else {
                match self.capture_detail(roll, &appeal_number).await {
                    Ok(detail) => details.push(detail),
                    Err(e) => {
                        warn!("Error processing appeal detail {}: {}", appeal_number, e);
                        self.log_debug_screenshot().await;
                    }
                }

                if let Err(e) = self.return_to_listing(roll).await {
                    error!(
                        "Could not return to listing for {}: {}, abandoning remaining appeals",
                        roll, e
                    );
                    break;
                }
            }

            // 遷移後は古いリンクを使わない
            links = match self.session.appeal_links().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    error!("Failed to re-read appeal links for {}: {}", roll, e);
                    break;
                }
            };
        }

        let aggregate = AppealAggregate {
            roll_number: roll.clone(),
            appeals: details,
        };
        self.sink
            .write_json(&roll_dir.join(AGGREGATE_FILE), &aggregate)?;

        Ok(aggregate.appeals)
    }

    /// 現在の詳細ページを抽出・保存
    async fn capture_detail(
        &self,
        roll: &RollNumber,
        appeal_number: &str,
    ) -> Result<AppealDetail, ScraperError> {
        let config = self.session.config();
        self.save_page_artifacts(
            config
                .save_html
                .then(|| self.sink.appeal_path(roll, appeal_number, "html")),
            config
                .save_screenshots
                .then(|| self.sink.appeal_path(roll, appeal_number, "png")),
        )
        .await;

        let detail = self.session.extract_detail(appeal_number).await?;

        // 抽出済みの詳細は書き出しに失敗しても集約に含める
        let path = self.sink.appeal_path(roll, appeal_number, "json");
        if let Err(e) = self.sink.write_json(&path, &detail) {
            warn!("Error saving appeal detail {}: {}", appeal_number, e);
        }
        Ok(detail)
    }

    /// 一覧ページへ戻る
    ///
    /// 履歴で戻れなければトップから同じロール番号で再検索する。
    async fn return_to_listing(&self, roll: &RollNumber) -> Result<(), ScraperError> {
        let Err(e) = self.session.go_back().await else {
            return Ok(());
        };
        if !e.is_transient() {
            return Err(e);
        }
        warn!("Error navigating back: {}, re-running search for {}", e, roll);

        self.session.navigate_home().await?;
        self.session.enter_roll_number(roll).await?;
        if self.session.submit_search().await? {
            info!("Listing restored for {}", roll);
            Ok(())
        } else {
            Err(ScraperError::Navigation(format!(
                "{} の再検索が拒否されました",
                roll
            )))
        }
    }

    async fn save_page_artifacts(&self, html: Option<PathBuf>, screenshot: Option<PathBuf>) {
        if let Some(path) = screenshot {
            if let Err(e) = self.session.take_screenshot(&path).await {
                warn!("Error taking screenshot {:?}: {}", path, e);
            }
        }
        if let Some(path) = html {
            if let Err(e) = self.session.save_html(&path).await {
                warn!("Error saving HTML content {:?}: {}", path, e);
            }
        }
    }

    /// デバッグモード時、失敗したページをbase64でログ出力
    async fn log_debug_screenshot(&self) {
        if !self.session.config().debug {
            return;
        }
        if let Ok(png) = self.session.screenshot_bytes().await {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
            debug!("Failure screenshot: data:image/png;base64,{}", encoded);
        }
    }
}
