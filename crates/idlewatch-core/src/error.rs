//! IDLEWATCH 핵심 에러 타입.
//!
//! 어댑터 crate는 자체 에러 타입을 두고 포트 경계에서 `CoreError`로 변환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 입력 훅, 메일 전송 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 전역 입력 훅을 사용할 수 없음 (활동 감지 불가 → 시작 실패)
    #[error("입력 훅 사용 불가: {0}")]
    InputHookUnavailable(String),

    /// 메일 전송 실패 (연결, TLS, 인증, 전송)
    #[error("메일 전송 에러: {0}")]
    Mail(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}
