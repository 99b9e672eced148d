//! # flicker-core
//!
//! Flicker 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 심볼, 분류 결과, 전이 이벤트, 지연 추정치, 제어 메시지
//! - [`ports`]: 프레임 소스, 분류기, 액션 싱크, 입력 드라이버, 보정 저장소 (trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 실행 설정 (`RunConfig`)
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
