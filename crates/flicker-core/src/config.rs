//! 실행 설정 구조체.
//!
//! 캡처 영역, 분류기 대역/스케일, 시퀀스 주기, 전이→액션 규칙, 보정/스케줄러 파라미터 등
//! 폴링 루프 생성 시 한 번 주입되는 불변 설정을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::symbol::{ActionKind, Symbol};
use crate::ports::input_driver::MouseButton;

/// 최상위 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 화면 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 분류기 설정
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// 전이 트래커 설정
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// 전이 → 액션 종류 매핑 규칙 (앞선 규칙 우선)
    #[serde(default = "default_transitions")]
    pub transitions: Vec<TransitionRule>,
    /// 지연 보정 설정
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// 액션 스케줄러 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// 액션 종류 → 입력 바인딩
    #[serde(default = "default_actions")]
    pub actions: BTreeMap<ActionKind, ActionBinding>,
    /// 폴링 루프 기본 간격 (밀리초)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 세션 통계 로그 주기 (초)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            classifier: ClassifierConfig::default(),
            tracker: TrackerConfig::default(),
            transitions: default_transitions(),
            calibration: CalibrationConfig::default(),
            scheduler: SchedulerConfig::default(),
            actions: default_actions(),
            poll_interval_ms: default_poll_interval_ms(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl RunConfig {
    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// 통계 로그 주기
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }

    /// 설정 일관성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let c = &self.classifier;
        if c.alphabet.is_empty() {
            return Err(CoreError::validation("classifier.alphabet", "알파벳이 비어 있음"));
        }
        let mut seen = HashSet::new();
        for symbol in &c.alphabet {
            if symbol.as_str().is_empty() {
                return Err(CoreError::validation("classifier.alphabet", "빈 심볼"));
            }
            if !seen.insert(symbol) {
                return Err(CoreError::validation(
                    "classifier.alphabet",
                    format!("중복 심볼: {symbol}"),
                ));
            }
        }
        if c.scales.is_empty() {
            return Err(CoreError::validation("classifier.scales", "스케일 목록이 비어 있음"));
        }
        if c.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(CoreError::validation("classifier.scales", "스케일은 양수여야 함"));
        }
        if c.min_area > c.max_area {
            return Err(CoreError::validation("classifier.min_area", "min_area > max_area"));
        }
        if !(c.min_aspect > 0.0 && c.min_aspect <= c.max_aspect) {
            return Err(CoreError::validation(
                "classifier.min_aspect",
                "0 < min_aspect <= max_aspect 이어야 함",
            ));
        }
        if c.max_candidates == 0 {
            return Err(CoreError::validation("classifier.max_candidates", "0일 수 없음"));
        }
        check_threshold("classifier.accept_threshold", c.accept_threshold)?;
        check_threshold("tracker.accept_threshold", self.tracker.accept_threshold)?;
        c.mask.validate()?;

        if let Some(cycle) = &self.tracker.cycle {
            if cycle.is_empty() {
                return Err(CoreError::validation("tracker.cycle", "주기가 비어 있음"));
            }
            let mut in_cycle = HashSet::new();
            for symbol in cycle {
                if !in_cycle.insert(symbol) {
                    return Err(CoreError::validation(
                        "tracker.cycle",
                        format!("중복 심볼: {symbol}"),
                    ));
                }
                if !seen.contains(symbol) {
                    return Err(CoreError::validation(
                        "tracker.cycle",
                        format!("알파벳에 없는 심볼: {symbol}"),
                    ));
                }
            }
        }

        if self.calibration.capacity == 0 {
            return Err(CoreError::validation("calibration.capacity", "0일 수 없음"));
        }
        let max_sample_ms = self.calibration.max_sample_ms;
        if !max_sample_ms.is_finite() || max_sample_ms <= 0.0 {
            return Err(CoreError::validation(
                "calibration.max_sample_ms",
                "0보다 큰 유한값이어야 함",
            ));
        }
        let default_delay_ms = self.calibration.default_delay_ms;
        if !default_delay_ms.is_finite() || !(0.0..=max_sample_ms).contains(&default_delay_ms) {
            return Err(CoreError::validation(
                "calibration.default_delay_ms",
                format!("0 이상 {max_sample_ms}ms 이하여야 함"),
            ));
        }
        Ok(())
    }
}

fn check_threshold(field: &str, value: f32) -> Result<(), CoreError> {
    if !(-1.0..=1.0).contains(&value) {
        return Err(CoreError::validation(field, "임계값은 [-1, 1] 범위여야 함"));
    }
    Ok(())
}

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_stats_interval_secs() -> u64 {
    60
}

fn default_transitions() -> Vec<TransitionRule> {
    vec![TransitionRule {
        from: None,
        to: Symbol::new("1"),
        action: ActionKind::new("engage"),
    }]
}

fn default_actions() -> BTreeMap<ActionKind, ActionBinding> {
    let mut actions = BTreeMap::new();
    actions.insert(
        ActionKind::new("engage"),
        ActionBinding::Key {
            key: "space".to_string(),
        },
    );
    actions
}

// ============================================================
// 캡처 설정
// ============================================================

/// 캡처 영역 (모니터 좌표, 픽셀)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 화면 캡처 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 모니터 인덱스 (None이면 주 모니터)
    #[serde(default)]
    pub monitor_index: Option<usize>,
    /// 뷰포트 크롭 영역 (None이면 전체 화면)
    #[serde(default)]
    pub region: Option<CaptureRegion>,
}

// ============================================================
// 분류기 설정
// ============================================================

/// 전경 색상 마스크 명세 (게임 에셋마다 다르므로 데이터로 둔다)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MaskSpec {
    /// HSV 범위 (hue: 0-360, sat/val: 0-1). `hue_min > hue_max`면 0도를 감싸는 범위.
    Hsv {
        hue_min: f32,
        hue_max: f32,
        sat_min: f32,
        sat_max: f32,
        val_min: f32,
        val_max: f32,
    },
    /// RGB 채널별 범위 (포함)
    Rgb { min: [u8; 3], max: [u8; 3] },
    /// 밝기 범위 (포함)
    Luma { min: u8, max: u8 },
}

impl MaskSpec {
    fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Hsv {
                hue_min,
                hue_max,
                sat_min,
                sat_max,
                val_min,
                val_max,
            } => {
                let hue_ok = (0.0..=360.0).contains(hue_min) && (0.0..=360.0).contains(hue_max);
                let sat_ok = sat_min <= sat_max && *sat_min >= 0.0 && *sat_max <= 1.0;
                let val_ok = val_min <= val_max && *val_min >= 0.0 && *val_max <= 1.0;
                if !(hue_ok && sat_ok && val_ok) {
                    return Err(CoreError::validation("classifier.mask", "HSV 범위 오류"));
                }
            }
            Self::Rgb { min, max } => {
                if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
                    return Err(CoreError::validation("classifier.mask", "RGB min > max"));
                }
            }
            Self::Luma { min, max } => {
                if min > max {
                    return Err(CoreError::validation("classifier.mask", "Luma min > max"));
                }
            }
        }
        Ok(())
    }
}

impl Default for MaskSpec {
    fn default() -> Self {
        // 노란색 계열 HUD 숫자
        Self::Hsv {
            hue_min: 45.0,
            hue_max: 65.0,
            sat_min: 0.5,
            sat_max: 1.0,
            val_min: 0.5,
            val_max: 1.0,
        }
    }
}

/// 분류기 설정: 후보 필터 대역, 스케일 세트, 수용 임계값
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// 템플릿 이미지 디렉토리 (파일명 접두사 = 심볼)
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    /// 심볼 알파벳 (순서 = 템플릿 평가 순서)
    #[serde(default = "default_alphabet")]
    pub alphabet: Vec<Symbol>,
    /// 전경 마스크
    #[serde(default)]
    pub mask: MaskSpec,
    /// 후보 바운딩 박스 최소 면적 (픽셀)
    #[serde(default = "default_min_area")]
    pub min_area: u32,
    /// 후보 바운딩 박스 최대 면적 (픽셀)
    #[serde(default = "default_max_area")]
    pub max_area: u32,
    /// 높이/너비 비율 하한
    #[serde(default = "default_min_aspect")]
    pub min_aspect: f32,
    /// 높이/너비 비율 상한
    #[serde(default = "default_max_aspect")]
    pub max_aspect: f32,
    /// 평가할 최대 후보 수 (면적 내림차순)
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// 후보 리사이즈 스케일 세트
    #[serde(default = "default_scales")]
    pub scales: Vec<f32>,
    /// 수용 임계값 (정규화 상호상관, -1..1)
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            alphabet: default_alphabet(),
            mask: MaskSpec::default(),
            min_area: default_min_area(),
            max_area: default_max_area(),
            min_aspect: default_min_aspect(),
            max_aspect: default_max_aspect(),
            max_candidates: default_max_candidates(),
            scales: default_scales(),
            accept_threshold: default_accept_threshold(),
        }
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_alphabet() -> Vec<Symbol> {
    ["1", "2", "3", "4"].into_iter().map(Symbol::new).collect()
}

fn default_min_area() -> u32 {
    40
}

fn default_max_area() -> u32 {
    4_000
}

fn default_min_aspect() -> f32 {
    0.8
}

fn default_max_aspect() -> f32 {
    4.0
}

fn default_max_candidates() -> usize {
    8
}

fn default_scales() -> Vec<f32> {
    vec![0.6, 0.8, 1.0, 1.2, 1.4]
}

fn default_accept_threshold() -> f32 {
    0.55
}

// ============================================================
// 트래커 설정
// ============================================================

/// 전이 트래커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// 전이 수용 임계값
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f32,
    /// 순환 순서 (Some이면 엄격 시퀀스 모드)
    #[serde(default)]
    pub cycle: Option<Vec<Symbol>>,
    /// 최초 수용 심볼에 대해 (없음 → X) 이벤트 발행 여부
    #[serde(default = "default_true")]
    pub emit_initial: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            cycle: None,
            emit_initial: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// 전이 → 액션 종류 매핑 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// 이전 심볼 조건 (None이면 아무 상태)
    #[serde(default)]
    pub from: Option<Symbol>,
    /// 새 심볼
    pub to: Symbol,
    /// 발사할 액션 종류
    pub action: ActionKind,
}

// ============================================================
// 보정 설정
// ============================================================

/// 지연 보정 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// 샘플이 없을 때의 기본 지연 (밀리초)
    #[serde(default)]
    pub default_delay_ms: f64,
    /// 종류별 샘플 창 용량
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// 무장(armed) 판정에 필요한 샘플 수
    #[serde(default = "default_arm_after")]
    pub arm_after: usize,
    /// 이 값보다 오래된 검출에 대한 표시는 무효 샘플로 거부 (밀리초)
    #[serde(default = "default_max_sample_ms")]
    pub max_sample_ms: f64,
    /// 보정 파일 경로 (None이면 플랫폼 데이터 디렉토리)
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 0.0,
            capacity: default_capacity(),
            arm_after: default_arm_after(),
            max_sample_ms: default_max_sample_ms(),
            store_path: None,
        }
    }
}

fn default_capacity() -> usize {
    30
}

fn default_arm_after() -> usize {
    5
}

fn default_max_sample_ms() -> f64 {
    2_000.0
}

// ============================================================
// 스케줄러 설정
// ============================================================

/// 액션 스케줄러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 전역 최소 쿨다운 (밀리초)
    #[serde(default = "default_min_cooldown_ms")]
    pub min_cooldown_ms: u64,
    /// 목표 시각 균등 지터 (±밀리초, 0이면 비활성)
    #[serde(default)]
    pub jitter_ms: u64,
    /// 보정이 무장되지 않은 종류도 발사할지 여부 (false면 관찰 전용 보정 모드)
    #[serde(default = "default_true")]
    pub fire_unarmed: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_cooldown_ms: default_min_cooldown_ms(),
            jitter_ms: 0,
            fire_unarmed: true,
        }
    }
}

fn default_min_cooldown_ms() -> u64 {
    300
}

// ============================================================
// 액션 바인딩
// ============================================================

/// 액션 종류에 연결된 실제 입력
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionBinding {
    /// 키 탭 (누름 → 놓음)
    Key { key: String },
    /// 지정 좌표 클릭
    Click {
        #[serde(default)]
        button: MouseButton,
        x: i32,
        y: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_scales_rejected() {
        let mut config = RunConfig::default();
        config.classifier.scales.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classifier.scales"));
    }

    #[test]
    fn cycle_outside_alphabet_rejected() {
        let mut config = RunConfig::default();
        config.tracker.cycle = Some(vec![Symbol::new("1"), Symbol::new("9")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_cycle_symbol_rejected() {
        let mut config = RunConfig::default();
        config.tracker.cycle = Some(vec![Symbol::new("1"), Symbol::new("1")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_area_band_rejected() {
        let mut config = RunConfig::default();
        config.classifier.min_area = 500;
        config.classifier.max_area = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut config = RunConfig::default();
        config.tracker.accept_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn calibration_bounds_rejected() {
        let mut config = RunConfig::default();
        config.calibration.max_sample_ms = 0.0;
        assert!(config.validate().is_err());

        config.calibration.max_sample_ms = f64::INFINITY;
        assert!(config.validate().is_err());

        config.calibration.max_sample_ms = 500.0;
        config.calibration.default_delay_ms = 501.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("calibration.default_delay_ms"));

        config.calibration.default_delay_ms = 500.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "tracker": { "cycle": ["1", "2", "3", "4"] },
            "transitions": [
                { "to": "1", "action": "engage" },
                { "from": "1", "to": "2", "action": "disengage" }
            ],
            "actions": {
                "engage": { "type": "Key", "key": "f1" },
                "disengage": { "type": "Click", "x": 10, "y": 20 }
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.tracker.cycle.as_ref().unwrap().len(), 4);
        assert!(config.tracker.emit_initial);
        assert_eq!(config.transitions[1].from, Some(Symbol::new("1")));
        assert_eq!(
            config.actions[&ActionKind::new("disengage")],
            ActionBinding::Click {
                button: MouseButton::Left,
                x: 10,
                y: 20
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hsv_mask_roundtrip() {
        let spec = MaskSpec::Hsv {
            hue_min: 350.0,
            hue_max: 10.0,
            sat_min: 0.4,
            sat_max: 1.0,
            val_min: 0.3,
            val_max: 1.0,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"type\":\"Hsv\""));
        let back: MaskSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
