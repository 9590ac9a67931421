pub mod builder;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use config::Settings;
pub use logging::init_logging;
pub use pipeline::{Pipeline, PipelineOutput, RunState};
pub use report::{render_report, SentimentBand, SentimentIndex};

pub mod prelude {
    pub use super::{init_logging, Pipeline, PipelineOutput, SentimentIndex, Settings};
    pub use sa_core::{Error, FinalReport, PipelineError, Result, Stage};
}
