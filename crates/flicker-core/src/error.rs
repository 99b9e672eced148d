//! Flicker 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 외부 라이브러리 에러를 `CoreError`로 변환해 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 이미지 디코딩/변환 실패
    #[error("이미지 에러: {0}")]
    Image(String),

    /// 스크린 캡처 실패 (일시적: 해당 틱만 건너뜀)
    #[error("캡처 에러: {0}")]
    Capture(String),

    /// 템플릿 로드 실패
    #[error("템플릿 에러: {0}")]
    Template(String),

    /// 입력(마우스/키보드) 전송 실패
    #[error("입력 에러: {0}")]
    Input(String),

    /// 보정 저장소 읽기/쓰기 실패
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "ActionBinding")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_includes_field() {
        let err = CoreError::validation("classifier.scales", "비어 있음");
        let msg = err.to_string();
        assert!(msg.contains("classifier.scales"));
        assert!(msg.contains("비어 있음"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
