use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("セッション開始エラー: {0}")]
    SessionStart(String),

    #[error("セッションが開始されていません (start() を先に呼び出してください)")]
    NotStarted,

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScraperError {
    /// バッチ全体を中断すべきエラーか
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::SessionStart(_) | Self::NotStarted)
    }

    /// 再ナビゲーションで回復を試みるべきページ操作エラーか
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Navigation(_) | Self::Timeout(_) | Self::ElementNotFound(_) | Self::JavaScript(_)
        )
    }
}
