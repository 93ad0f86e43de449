use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::batch::BatchRunner;
use crate::browser::ChromeLauncher;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::session::SessionDriver;
use crate::traits::PageLauncher;
use crate::types::BatchSummary;

/// バッチスクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub roll_numbers: Vec<String>,
    pub config: ScraperConfig,
}

impl BatchRequest {
    pub fn new(base_url: impl Into<String>, roll_numbers: Vec<String>) -> Self {
        Self {
            roll_numbers,
            config: ScraperConfig::new(base_url),
        }
    }

    pub fn with_config(roll_numbers: Vec<String>, config: ScraperConfig) -> Self {
        Self {
            roll_numbers,
            config,
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// リクエストごとにページを起動し、バッチ完了後に閉じる。
#[derive(Debug, Clone, Default)]
pub struct ScraperService<L = ChromeLauncher> {
    launcher: L,
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L> ScraperService<L> {
    pub fn with_launcher(launcher: L) -> Self {
        Self { launcher }
    }
}

impl<L> Service<BatchRequest> for ScraperService<L>
where
    L: PageLauncher + Clone + 'static,
{
    type Response = BatchSummary;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: BatchRequest) -> Self::Future {
        info!(
            "Batch request received: {} roll numbers",
            req.roll_numbers.len()
        );
        let launcher = self.launcher.clone();

        Box::pin(async move {
            let session = SessionDriver::new(req.config, launcher);
            let mut runner = BatchRunner::new(session);

            let report = runner.run(&req.roll_numbers).await;
            // 失敗時もブラウザは閉じる (バッチのエラーを優先)
            let closed = runner.finish().await;
            let report = report?;
            closed?;

            info!(
                "Batch completed: {}/{} roll numbers, {} appeals",
                report.summary.completed, report.summary.total, report.summary.appeals_captured
            );
            Ok(report.summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll_number::RollNumber;
    use crate::testing::{temp_output_dir, FakeLauncher, FakeSite};
    use std::time::Duration;

    #[test]
    fn test_batch_request_builder() {
        let req = BatchRequest::new("https://estatus.example.org/", vec!["1".into()])
            .with_output_dir("/tmp/arb")
            .with_headless(false);

        assert_eq!(req.roll_numbers, vec!["1".to_string()]);
        assert_eq!(req.config.base_url.as_deref(), Some("https://estatus.example.org/"));
        assert_eq!(req.config.output_dir, PathBuf::from("/tmp/arb"));
        assert!(!req.config.headless);
    }

    #[tokio::test]
    async fn test_service_runs_batch_and_closes_session() {
        let site = FakeSite::default();
        let roll = RollNumber::normalize("1901012345678900000");
        site.add_property(&roll, 2);

        let config = ScraperConfig::new("https://estatus.example.org/")
            .with_output_dir(temp_output_dir("service"))
            .with_roll_pause(Duration::ZERO);
        let output_dir = config.output_dir.clone();

        let mut service = ScraperService::with_launcher(FakeLauncher::new(site.clone()));
        let summary = service
            .call(BatchRequest::with_config(
                vec![roll.to_string(), "0".into()],
                config,
            ))
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.appeals_captured, 2);
        assert!(site.is_closed());

        std::fs::remove_dir_all(&output_dir).ok();
    }

    #[tokio::test]
    async fn test_service_surfaces_close_error_after_clean_batch() {
        let site = FakeSite::default();
        site.fail_close(true);

        let config = ScraperConfig::new("https://estatus.example.org/")
            .with_output_dir(temp_output_dir("service-close"))
            .with_roll_pause(Duration::ZERO);

        let mut service = ScraperService::with_launcher(FakeLauncher::new(site.clone()));
        let err = service
            .call(BatchRequest::with_config(vec!["0".into()], config))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Navigation(_)));
        assert!(site.is_closed());
    }

    #[tokio::test]
    async fn test_service_prefers_batch_error_over_close_error() {
        let site = FakeSite::default();
        site.set_unreachable(true);
        site.fail_close(true);

        let mut service = ScraperService::with_launcher(FakeLauncher::new(site));
        let err = service
            .call(BatchRequest::new("https://estatus.example.org/", vec!["1".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::SessionStart(_)));
    }

    #[tokio::test]
    async fn test_service_reports_setup_error() {
        let mut service = ScraperService::with_launcher(FakeLauncher::new(FakeSite::default()));
        let err = service
            .call(BatchRequest::with_config(vec!["1".into()], ScraperConfig::default()))
            .await
            .unwrap_err();
        assert!(err.is_setup());
    }
}
