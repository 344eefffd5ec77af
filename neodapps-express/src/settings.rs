use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{ExpressError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the runner needs to start neo-express. Either path may be unset;
/// dispatching a command then fails with [`ExpressError::ConfigurationMissing`].
#[derive(Clone, Debug)]
pub struct ExpressSettings {
    pub neo_express_location: Option<PathBuf>,
    pub dotnet_root: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for ExpressSettings {
    fn default() -> Self {
        Self {
            neo_express_location: None,
            dotnet_root: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ExpressSettings {
    pub fn new(neo_express_location: impl Into<PathBuf>, dotnet_root: impl Into<PathBuf>) -> Self {
        Self {
            neo_express_location: Some(neo_express_location.into()),
            dotnet_root: Some(dotnet_root.into()),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn executable(&self) -> Result<&Path> {
        non_empty(&self.neo_express_location).ok_or(ExpressError::ConfigurationMissing("neo-express location"))
    }

    pub fn dotnet_root(&self) -> Result<&Path> {
        non_empty(&self.dotnet_root).ok_or(ExpressError::ConfigurationMissing("DOTNET_ROOT"))
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}
