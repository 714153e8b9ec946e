use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use photoflow_application::{ManagerConfig, DEFAULT_LANE_NAME};
use photoflow_domain::TrailingGroup;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Catalog database file.
    #[arg(long, global = true, env = "PHOTOFLOW_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "photoflow_application=trace").
    #[arg(long, global = true, env = "PHOTOFLOW_LOG")]
    pub log_level: Option<String>,

    /// Give up on a fetch after this many seconds; 0 waits forever.
    #[arg(long, global = true, env = "PHOTOFLOW_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: Option<u64>,

    /// Leave the last run of look-alike images out of `list`, like the legacy list view.
    #[arg(long, global = true)]
    pub drop_trailing_group: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_path: PathBuf,
    pub log_level: String,
    pub fetch_timeout: Option<Duration>,
    pub trailing_group: TrailingGroup,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog.sqlite3"),
            log_level: "info".to_string(),
            fetch_timeout: None,
            trailing_group: TrailingGroup::Flush,
        }
    }
}

impl AppConfig {
    pub fn from_args(args: &GlobalArgs) -> Self {
        let mut config = Self::default();
        if let Some(catalog) = &args.catalog {
            config.catalog_path = catalog.clone();
        }
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }
        if let Some(secs) = args.fetch_timeout_secs {
            config.fetch_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if args.drop_trailing_group {
            config.trailing_group = TrailingGroup::Drop;
        }
        config
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            lane_name: DEFAULT_LANE_NAME.to_string(),
            fetch_timeout: self.fetch_timeout,
            trailing_group: self.trailing_group,
        }
    }
}
