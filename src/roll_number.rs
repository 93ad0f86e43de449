//! ロール番号 (19桁、2-2-3-3-5-4 区切り)

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScraperError;

pub const ROLL_NUMBER_DIGITS: usize = 19;

/// 各セグメントの桁数
const SEGMENT_WIDTHS: [usize; 6] = [2, 2, 3, 3, 5, 4];

/// 正規化済みのロール番号 (常に19桁の数字)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RollNumber {
    digits: String,
}

impl RollNumber {
    /// 数字以外を除去し、19桁に切り詰めるか右側をゼロ埋めする
    pub fn normalize(raw: &str) -> Self {
        let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != ROLL_NUMBER_DIGITS {
            warn!(
                "Roll number '{}' has {} digits, expected {}",
                raw,
                digits.len(),
                ROLL_NUMBER_DIGITS
            );
            if digits.len() > ROLL_NUMBER_DIGITS {
                digits.truncate(ROLL_NUMBER_DIGITS);
            } else {
                while digits.len() < ROLL_NUMBER_DIGITS {
                    digits.push('0');
                }
            }
        }

        Self { digits }
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// 入力欄6つに対応するセグメント
    pub fn segments(&self) -> [&str; 6] {
        let mut out = [""; 6];
        let mut start = 0;
        for (slot, width) in out.iter_mut().zip(SEGMENT_WIDTHS) {
            *slot = &self.digits[start..start + width];
            start += width;
        }
        out
    }

    /// 出力ディレクトリ名 (`12_34_567_890_12345_6789`)
    pub fn dir_key(&self) -> String {
        self.segments().join("_")
    }
}

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("-"))
    }
}

impl From<RollNumber> for String {
    fn from(roll: RollNumber) -> Self {
        roll.to_string()
    }
}

impl TryFrom<String> for RollNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.chars().any(|c| c.is_ascii_digit()) {
            Ok(Self::normalize(&value))
        } else {
            Err(format!("roll number without digits: {value:?}"))
        }
    }
}

/// CSV/テキストからロール番号を読み込む
///
/// 各行の先頭カラムを使い、空行と数字を含まない行 (ヘッダー等) は読み飛ばす。
pub fn parse_roll_number_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let first = line.split(',').next()?.trim().trim_matches('"').trim();
            first
                .chars()
                .any(|c| c.is_ascii_digit())
                .then(|| first.to_string())
        })
        .collect()
}

pub fn read_roll_number_file(path: impl AsRef<Path>) -> Result<Vec<String>, ScraperError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_roll_number_list(&text))
}
