use crate::api::ApiServer;
use crate::audio::MicCapture;
use crate::config::Config;
use crate::focus::{AudioSessionPolicy, DeviceSession};
use crate::permissions::SystemPermissionGate;
use crate::playback::{PlaybackController, ProcessPlayback};
use crate::session::{SessionCoordinator, SessionStatusHandle};
use crate::transcription::CommandRecognizer;
use crate::{db, global};
use anyhow::Result;
use tracing::info;

/// Sample rate for captured audio memos (recognizer-friendly).
const CAPTURE_SAMPLE_RATE: u32 = 16000;

pub async fn run_service() -> Result<()> {
    info!("Starting koemo service");

    let config = Config::load()?;

    // Fail early if the memo store is unusable.
    db::init_db()?;

    let policy = AudioSessionPolicy::new(Box::new(DeviceSession));
    let engine = CommandRecognizer::new(&config.recognizer)?;
    let gate = SystemPermissionGate::new(config.recognizer.command.clone());

    let (playback, playback_events) =
        PlaybackController::new(Box::new(ProcessPlayback::new(&config.speech)));

    let capture = config
        .behavior
        .capture_audio
        .then(|| MicCapture::new(CAPTURE_SAMPLE_RATE));

    let status = SessionStatusHandle::default();
    let coordinator = SessionCoordinator::new(
        policy,
        Box::new(engine),
        playback,
        playback_events,
        Box::new(gate),
        capture,
        global::recordings_dir()?,
        config.behavior.keep_unsaved_recordings,
        status,
    );

    let api_server = ApiServer::new(coordinator.clone(), &config);

    info!("koemo is ready!");
    info!(
        "Start a recording: curl -X POST http://127.0.0.1:{}/record/start",
        config.api.port
    );

    // Serves until ctrl-c; then the session is torn down so no stream or
    // audio claim outlives the service.
    api_server.start().await?;
    coordinator.shutdown().await;

    Ok(())
}
