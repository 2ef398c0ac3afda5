// Error types for speed-recorder

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum SpeedRecorderError {
    // Errors for the recording session
    #[snafu(display("A recording session is already running"))]
    AlreadyRecording,

    // Errors for the sample source
    #[snafu(display("Could not start sample source: {description}"))]
    SourceStartError { description: String },
    #[snafu(display("Could not stop sample source: {description}"))]
    SourceStopError { description: String },

    // Errors for the exporter
    #[snafu(display("Could not create export directory {path}"))]
    ExportDirectoryError { path: String, source: io::Error },
    #[snafu(display("Error writing export file {path}"))]
    ExportWriteError { path: String, source: io::Error },
    #[snafu(display("Could not find a documents directory to export to"))]
    NoDocumentsDir,

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error accessing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Command line errors
    #[snafu(display("Could not read answer from terminal"))]
    PromptError { source: io::Error },

    // Replay input errors
    #[snafu(display("Invalid sample file: {path}"))]
    InvalidSampleFile { path: String },
    #[snafu(display("Error loading sample file"))]
    SampleLoaderError { source: io::Error },
}
