//! # flicker
//!
//! 틱 동기 숫자 인식 + 보정 지연 액션 실행기.
//! 설정 로드, 어댑터 생성(DI 와이어링), 제어 표면 시작, 폴링 루프 실행.

use anyhow::{bail, Context, Result};
use clap::Parser;
use flicker_app::console;
use flicker_app::control::ControlChannel;
use flicker_app::lifecycle::LifecycleManager;
use flicker_app::tick_loop::TickLoop;
use flicker_automation::action_sink::InputActionSink;
use flicker_automation::input_driver::create_input_driver;
use flicker_core::config::RunConfig;
use flicker_core::config_manager::ConfigManager;
use flicker_core::ports::frame_source::FrameSource;
use flicker_core::ports::input_driver::InputDriver;
use flicker_storage::json_store::JsonCalibrationStore;
use flicker_timing::action_map::ActionMap;
use flicker_timing::calibrator::DelayCalibrator;
use flicker_vision::capture::ScreenCapture;
use flicker_vision::classifier::DigitClassifier;
use flicker_vision::mask::mask_from_spec;
use flicker_vision::replay::ReplayFrameSource;
use flicker_vision::template_bank::TemplateBank;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `--log-level`이 적용되는 크레이트
const LOG_TARGETS: [&str; 7] = [
    "flicker",
    "flicker_app",
    "flicker_core",
    "flicker_vision",
    "flicker_timing",
    "flicker_storage",
    "flicker_automation",
];

/// 틱 동기 숫자 인식 + 보정 지연 액션 실행기
#[derive(Parser, Debug)]
#[command(name = "flicker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 템플릿 디렉토리 (설정값 덮어쓰기)
    #[arg(long, short = 't')]
    templates: Option<PathBuf>,

    /// 화면 대신 이미지 디렉토리 재생 (드라이런 포함)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// 입력을 실제로 보내지 않음
    #[arg(long)]
    dry_run: bool,

    /// 최소 쿨다운 (밀리초, 설정값 덮어쓰기)
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// 분류/전이 수용 임계값 (설정값 덮어쓰기)
    #[arg(long)]
    threshold: Option<f32>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 기본 설정 JSON 출력 후 종료
    #[arg(long)]
    print_default_config: bool,
}

/// CLI 인자로 설정 덮어쓰기
fn apply_overrides(config: &mut RunConfig, args: &Args) {
    if let Some(dir) = &args.templates {
        config.classifier.templates_dir = dir.clone();
    }
    if let Some(cooldown_ms) = args.cooldown_ms {
        config.scheduler.min_cooldown_ms = cooldown_ms;
    }
    if let Some(threshold) = args.threshold {
        config.classifier.accept_threshold = threshold;
        config.tracker.accept_threshold = threshold;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", serde_json::to_string_pretty(&RunConfig::default())?);
        return Ok(());
    }

    // tracing 초기화
    let log_filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={}", args.log_level))
        .collect::<Vec<_>>()
        .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("flicker v{} 시작", env!("CARGO_PKG_VERSION"));

    // 설정 로드
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    info!("설정 파일: {}", manager.config_path().display());

    let mut config = manager.get();
    apply_overrides(&mut config, &args);
    config.validate().context("설정 검증 실패")?;

    // ── 어댑터 생성 (DI 와이어링) ──

    // 1. 템플릿 + 분류기
    let bank = TemplateBank::load(&config.classifier.templates_dir, &config.classifier.alphabet)
        .context("템플릿 로드 실패")?;
    if bank.is_empty() {
        bail!(
            "사용 가능한 템플릿이 없습니다: {}",
            config.classifier.templates_dir.display()
        );
    }
    let classifier = Arc::new(DigitClassifier::new(
        Arc::new(bank),
        mask_from_spec(&config.classifier.mask),
        &config.classifier,
    ));

    // 2. 프레임 소스
    let source: Box<dyn FrameSource> = match &args.replay {
        Some(dir) => Box::new(ReplayFrameSource::open(dir)?),
        None => Box::new(ScreenCapture::new(&config.capture)),
    };

    // 3. 보정기 (write-through JSON)
    let store_path = match &config.calibration.store_path {
        Some(path) => path.clone(),
        None => ConfigManager::default_calibration_path()?,
    };
    info!("보정 파일: {}", store_path.display());
    let mut calibrator = DelayCalibrator::new(&config.calibration)
        .with_store(Box::new(JsonCalibrationStore::new(store_path)));
    calibrator.load();

    // 4. 입력 드라이버 + 액션 싱크
    let dry_run = args.dry_run || args.replay.is_some();
    let driver: Arc<dyn InputDriver> = Arc::from(create_input_driver(dry_run));
    let sink = Arc::new(InputActionSink::new(driver, config.actions.clone())?);
    let action_map = ActionMap::new(config.transitions.clone());
    for kind in sink.unbound(action_map.kinds()) {
        warn!(kind = %kind, "바인딩 없는 액션 종류: 발사 시 실패로 처리됨");
    }

    // 5. 제어 표면
    let control = ControlChannel::default();
    let lifecycle = LifecycleManager::new(control.clone());
    tokio::spawn(async move {
        lifecycle.wait_for_signal().await;
    });
    if let Err(e) = console::spawn_console(control.clone()) {
        warn!("콘솔 제어 시작 실패: {e}");
    }

    // 6. 폴링 루프
    let tick_loop = TickLoop::new(&config, source, classifier, calibrator, sink, control)?;
    let stats = tick_loop.run().await;

    info!(
        frames = stats.frames,
        fired = stats.scheduler.fired,
        "flicker 종료"
    );
    Ok(())
}
