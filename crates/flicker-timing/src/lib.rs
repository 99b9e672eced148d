//! # flicker-timing
//!
//! 분류 결과의 시간축 처리.
//!
//! - [`tracker`]: 마지막 수용 심볼 기반 전이 상태 머신 (순환 시퀀스 모드 포함)
//! - [`action_map`]: 전이 → 액션 종류 규칙
//! - [`calibrator`]: 액션 종류별 지연 샘플 중앙값 + 영속화
//! - [`periodicity`]: 전이 간격 기반 틱 주기 추정
//!
//! 모든 상태는 폴링 루프 단일 작성자 전제이며 내부 동기화를 하지 않는다.

pub mod action_map;
pub mod calibrator;
pub mod periodicity;
pub mod tracker;
