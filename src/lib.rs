// Library interface for speed-recorder
// The binary and the integration tests both go through these modules

pub mod config;
pub mod errors;
pub mod exporter;
pub mod recording;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::SpeedRecorderError;
pub use exporter::{ExportOutcome, export, export_at, export_session, session_dir_name, to_csv};
pub use recording::{
    LocationFix, RecordingState, ReplaySampleSource, Sample, SampleSource, SampleStore, Session,
    SessionController,
};
