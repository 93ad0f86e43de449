use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// ブラウザページ操作の最小インターフェース
///
/// 抽出ロジックはここを通らず、`content()` で得たHTMLだけを扱う。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// URLへ遷移
    async fn goto(&self, url: &str) -> Result<(), ScraperError>;

    /// ネットワークがアイドルになるまで待機 (タイムアウト時は続行)
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScraperError>;

    /// 要素が表示されるまで待機
    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<(), ScraperError>;

    async fn title(&self) -> Result<String, ScraperError>;

    /// 現在のDOMのHTML
    async fn content(&self) -> Result<String, ScraperError>;

    /// 入力欄に値を設定
    async fn fill(&self, selector: &str, value: &str) -> Result<(), ScraperError>;

    async fn click(&self, selector: &str) -> Result<(), ScraperError>;

    /// セレクタに一致する `index` 番目の要素をクリック
    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), ScraperError>;

    /// 履歴を1つ戻る
    async fn go_back(&self) -> Result<(), ScraperError>;

    /// フルページスクリーンショット (PNG)
    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    /// リソース解放
    async fn close(&self) -> Result<(), ScraperError>;
}

/// ページ (ブラウザコンテキスト) の取得
#[async_trait]
pub trait PageLauncher: Send + Sync {
    type Page: PageDriver;

    async fn launch(&self, config: &ScraperConfig) -> Result<Self::Page, ScraperError>;
}
