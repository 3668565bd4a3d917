pub mod config;
mod orchestrator;
mod types;

pub use config::PipelineConfig;
pub use orchestrator::{run_pipeline, run_pipeline_reported, summarize_groups};
pub use types::{
    BaselineDiagnostics, GroupDiagnostics, PipelineOutput, PipelineStage, ProgressReporter,
};
