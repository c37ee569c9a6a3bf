mod load;
mod types;

pub use load::{apply_env_overrides, get_wavesmith_data_dir, load_config};
pub use types::{
    AppConfig, FixerConfig, LoggingConfig, MergeConfig, OutputConfig, OutputFormat,
    SchedulerConfig, StateConfig, WorkspaceConfig,
};
