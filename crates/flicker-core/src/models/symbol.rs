//! 심볼 / 액션 종류 식별자.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 인식 가능한 글리프 하나 (예: 카운트다운 숫자 "1".."4").
///
/// 알파벳 자체는 설정 데이터이며 내용은 불투명 문자열로 취급한다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// 템플릿 파일명 접두사로 사용되는 텍스트
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 전이가 유발할 외부 액션의 라벨 (예: "engage", "disengage")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKind(String);

impl ActionKind {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_label() {
        assert_eq!(Symbol::new("4").to_string(), "4");
        assert_eq!(ActionKind::from("engage").to_string(), "engage");
    }

    #[test]
    fn ordering_is_lexical() {
        let mut kinds = vec![ActionKind::from("off"), ActionKind::from("engage")];
        kinds.sort();
        assert_eq!(kinds[0].as_str(), "engage");
    }
}
