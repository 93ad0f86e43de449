//! ARB E-Status スクレイパーライブラリ
//!
//! - ロール番号で物件を検索し、不服申立て一覧を取得
//! - 各申立ての詳細ページを巡回してJSONで保存
//! - 保存済み成果物をロール番号・申立て番号・ステータスで検索
//!
//! # バッチ実行例
//!
//! ```rust,ignore
//! use arb_scraper::{BatchRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = BatchRequest::new(
//!         "https://estatus.example.org/",
//!         vec!["19-01-012-345-67890-0000".to_string()],
//!     )
//!     .with_output_dir("./output")
//!     .with_headless(false);
//!
//!     let summary = service.call(request).await.unwrap();
//!     println!("Appeals captured: {}", summary.appeals_captured);
//! }
//! ```
//!
//! # セッションを直接操作する例
//!
//! ```rust,ignore
//! use arb_scraper::{ChromeLauncher, RollNumber, ScraperConfig, SessionDriver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("https://estatus.example.org/");
//!     let mut session = SessionDriver::new(config, ChromeLauncher);
//!     session.start().await.unwrap();
//!
//!     let roll = RollNumber::normalize("1901012345678900000");
//!     session.enter_roll_number(&roll).await.unwrap();
//!     if session.submit_search().await.unwrap() {
//!         let listing = session.extract_listing(&roll).await.unwrap();
//!         println!("Appeals: {}", listing.appeal_info.len());
//!     }
//!     session.close().await.unwrap();
//! }
//! ```

pub mod archive;
pub mod batch;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod roll_number;
pub mod service;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use archive::{ArchiveIndex, PropertyRecord};
pub use batch::{BatchReport, BatchRunner};
pub use browser::{ChromeLauncher, ChromePage};
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use output::OutputSink;
pub use roll_number::{parse_roll_number_list, read_roll_number_file, RollNumber};
pub use service::{BatchRequest, ScraperService};
pub use session::SessionDriver;
pub use traits::{PageDriver, PageLauncher};

// データモデルもリエクスポート
pub use types::{
    AppealAggregate, AppealDetail, BatchResult, BatchSummary, ListingRecord, PageVariant,
    PropertyInfo, RollOutcome,
};
