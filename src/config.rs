use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// E-Status サイトのトップURL
    pub base_url: Option<String>,
    /// ロール番号ごとの成果物ディレクトリの親
    pub output_dir: PathBuf,
    pub headless: bool,
    pub save_screenshots: bool,
    pub save_html: bool,
    /// 失敗時にスクリーンショットをbase64でログ出力
    pub debug: bool,
    /// 要素の表示待機タイムアウト
    pub element_timeout: Duration,
    /// ネットワークアイドル待機タイムアウト
    pub navigation_timeout: Duration,
    /// ロール番号間の待機
    pub roll_pause: Duration,
    pub window_size: (u32, u32),
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            output_dir: PathBuf::from("./output"),
            headless: true,
            save_screenshots: false,
            save_html: false,
            debug: false,
            element_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            roll_pause: Duration::from_secs(2),
            window_size: (1600, 900),
            chrome_path: None,
        }
    }
}

impl ScraperConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// 環境変数から設定を構築
    ///
    /// `URL` が未設定でもエラーにはしない (`SessionDriver::start` で検出する)。
    pub fn from_env() -> Self {
        let mut config = Self {
            base_url: std::env::var("URL").ok().filter(|url| !url.trim().is_empty()),
            chrome_path: std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok(),
            ..Default::default()
        };

        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(flag) = env_flag("HEADLESS") {
            config.headless = flag;
        }
        if let Some(flag) = env_flag("SAVE_HTML") {
            config.save_html = flag;
        }
        if let Some(flag) = env_flag("SAVE_SCREENSHOTS") {
            config.save_screenshots = flag;
        }

        config
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.save_screenshots = enabled;
        self
    }

    pub fn with_html(mut self, enabled: bool) -> Self {
        self.save_html = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_roll_pause(mut self, pause: Duration) -> Self {
        self.roll_pause = pause;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert!(config.base_url.is_none());
        assert!(config.headless);
        assert!(!config.save_html);
        assert_eq!(config.element_timeout, Duration::from_secs(10));
        assert_eq!(config.roll_pause, Duration::from_secs(2));
        assert_eq!(config.window_size, (1600, 900));
    }

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::new("https://example.org/estatus")
            .with_output_dir("/tmp/arb")
            .with_headless(false)
            .with_html(true)
            .with_screenshots(true)
            .with_roll_pause(Duration::ZERO);

        assert_eq!(config.base_url.as_deref(), Some("https://example.org/estatus"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/arb"));
        assert!(!config.headless);
        assert!(config.save_html);
        assert!(config.save_screenshots);
        assert_eq!(config.roll_pause, Duration::ZERO);
    }
}
