//! 成果物の書き出し (ロール番号ごとのディレクトリ)

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::ScraperError;
use crate::roll_number::RollNumber;

pub const APPEAL_DETAILS_DIR: &str = "appeal_details";
pub const AGGREGATE_FILE: &str = "all_appeal_details.json";
pub const SCREENSHOT_FILE: &str = "screenshot.png";

#[derive(Debug, Clone)]
pub struct OutputSink {
    root: PathBuf,
}

impl OutputSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn roll_dir(&self, roll_number: &RollNumber) -> PathBuf {
        self.root.join(roll_number.dir_key())
    }

    pub fn details_dir(&self, roll_number: &RollNumber) -> PathBuf {
        self.roll_dir(roll_number).join(APPEAL_DETAILS_DIR)
    }

    /// `appeal_details/appeal_<N>.<ext>`
    pub fn appeal_path(&self, roll_number: &RollNumber, appeal_number: &str, ext: &str) -> PathBuf {
        self.details_dir(roll_number)
            .join(format!("appeal_{}.{}", file_safe(appeal_number), ext))
    }

    pub fn create_roll_dir(&self, roll_number: &RollNumber) -> Result<PathBuf, ScraperError> {
        let dir = self.roll_dir(roll_number);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn create_details_dir(&self, roll_number: &RollNumber) -> Result<PathBuf, ScraperError> {
        let dir = self.details_dir(roll_number);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// 整形JSONで書き出す (同じパスは上書き)
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), ScraperError> {
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json)?;
        info!("JSON data saved to {:?}", path);
        Ok(())
    }
}

/// パス区切り等をファイル名で使える文字に置き換え
fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
