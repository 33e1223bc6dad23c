//! 比赛用时编解码
//!
//! 成绩以固定宽度的 `HH:MM:SS` 文本存储和传输，解析后得到可比较的用时值。
//! 固定宽度保证数据库中对文本列做 `MIN()` 与按秒数比较的结果一致。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 用时解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceTimeError {
    #[error("race time must use the HH:MM:SS layout, got {0:?}")]
    InvalidLayout(String),

    #[error("race time contains a non-numeric segment: {0:?}")]
    NonNumeric(String),

    #[error("race time minutes and seconds must be below 60: {0:?}")]
    OutOfRange(String),
}

/// 比赛用时
///
/// 以秒为单位保存，按数值排序；相同用时比较结果为相等
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RaceTime {
    seconds: u32,
}

impl RaceTime {
    /// 解析 `HH:MM:SS` 文本
    pub fn parse(text: &str) -> Result<Self, RaceTimeError> {
        let bytes = text.as_bytes();
        if bytes.len() != 8 || bytes[2] != b':' || bytes[5] != b':' {
            return Err(RaceTimeError::InvalidLayout(text.to_string()));
        }

        let hours = two_digits(&bytes[0..2], text)?;
        let minutes = two_digits(&bytes[3..5], text)?;
        let seconds = two_digits(&bytes[6..8], text)?;

        if minutes >= 60 || seconds >= 60 {
            return Err(RaceTimeError::OutOfRange(text.to_string()));
        }

        Ok(Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        })
    }

    pub fn hours(&self) -> u32 {
        self.seconds / 3600
    }

    pub fn minutes(&self) -> u32 {
        self.seconds % 3600 / 60
    }

    pub fn secs(&self) -> u32 {
        self.seconds % 60
    }
}

fn two_digits(segment: &[u8], text: &str) -> Result<u32, RaceTimeError> {
    match segment {
        [tens, ones] if tens.is_ascii_digit() && ones.is_ascii_digit() => {
            Ok(u32::from(tens - b'0') * 10 + u32::from(ones - b'0'))
        }
        _ => Err(RaceTimeError::NonNumeric(text.to_string())),
    }
}

impl FromStr for RaceTime {
    type Err = RaceTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.secs()
        )
    }
}

impl Serialize for RaceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RaceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let time = RaceTime::parse("02:13:13").unwrap();
        assert_eq!((time.hours(), time.minutes(), time.secs()), (2, 13, 13));
        assert_eq!(time.to_string(), "02:13:13");
    }

    #[test]
    fn test_ordering_is_numeric() {
        let slower = RaceTime::parse("02:13:13").unwrap();
        let faster = RaceTime::parse("01:18:28").unwrap();
        assert!(slower > faster);
        assert_eq!(
            RaceTime::parse("01:18:28").unwrap(),
            RaceTime::parse("01:18:28").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert_eq!(
            RaceTime::parse("0a:13:13"),
            Err(RaceTimeError::NonNumeric("0a:13:13".to_string()))
        );
        assert!(matches!(
            RaceTime::parse("-1:00:00"),
            Err(RaceTimeError::NonNumeric(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_layout() {
        for text in ["abc", "", "2:13:13", "02:13:13.5", "02-13-13", "02:13", "002:13:13"] {
            assert!(
                matches!(RaceTime::parse(text), Err(RaceTimeError::InvalidLayout(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(matches!(
            RaceTime::parse("01:60:00"),
            Err(RaceTimeError::OutOfRange(_))
        ));
        assert!(matches!(
            RaceTime::parse("01:00:75"),
            Err(RaceTimeError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_multibyte_input_is_rejected_without_panic() {
        assert!(RaceTime::parse("0é:13:1").is_err());
        assert!(RaceTime::parse("时间:13:13").is_err());
    }

    #[test]
    fn test_text_order_matches_numeric_order() {
        let mut texts = vec!["10:00:00", "02:00:41", "01:18:28", "01:59:59", "00:59:59"];
        let mut parsed: Vec<RaceTime> = texts.iter().map(|t| t.parse().unwrap()).collect();
        texts.sort();
        parsed.sort();
        let formatted: Vec<String> = parsed.iter().map(ToString::to_string).collect();
        assert_eq!(formatted, texts);
    }

    #[test]
    fn test_serde_uses_text_layout() {
        let time = RaceTime::parse("01:18:28").unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"01:18:28\"");
        let back: RaceTime = serde_json::from_str("\"01:18:28\"").unwrap();
        assert_eq!(back, time);
        assert!(serde_json::from_str::<RaceTime>("\"1:18\"").is_err());
    }
}
