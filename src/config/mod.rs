mod settings;

pub use settings::{BackendConfig, OtelConfig, RetrySettings, Settings};
