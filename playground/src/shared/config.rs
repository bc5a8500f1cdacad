use crate::shared::RUN_ID_ENV_VAR;
use anyhow::{anyhow, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser, Debug, Default)]
#[clap(group = ArgGroup::new("config"))]
pub struct ConfigOptions {
    /// Override the working directory. Relative engine paths resolve against it.
    #[arg(long, short = 'C', global(true))]
    working_dir: Option<String>,

    /// The run-id names this run's log file. Re-using it overwrites the old log.
    #[arg(long, global(true), env = RUN_ID_ENV_VAR)]
    run_id: Option<String>,
}

impl ConfigOptions {
    pub fn generate_run_id() -> String {
        let id = nanoid::nanoid!(4, &nanoid::alphabet::SAFE);
        let now = chrono::Local::now();
        let current_time = now.format("%Y%m%d");
        format!("{}-{}", current_time, id)
    }

    pub fn get_run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(Self::generate_run_id)
    }

    /// Fixes the run-id for the rest of the process so the log file and the
    /// loaded config agree on it.
    pub fn pin_run_id(&mut self) -> String {
        self.run_id.get_or_insert_with(Self::generate_run_id).clone()
    }

    pub fn load_config(&self) -> Result<FoundConfig> {
        let current_dir = std::env::current_dir();
        let working_dir = match (current_dir, &self.working_dir) {
            (_, Some(dir)) => PathBuf::from(&dir),
            (Ok(cwd), None) => cwd,
            _ => {
                error!(target: "user", "Unable to get a working dir");
                return Err(anyhow!("Unable to get a working dir"));
            }
        };

        let found_config = FoundConfig {
            working_dir,
            bin_path: std::env::var("PATH").unwrap_or_default(),
            run_id: self.get_run_id(),
        };

        debug!("Loaded config {:?}", found_config);

        Ok(found_config)
    }
}

/// Process-level settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct FoundConfig {
    pub working_dir: PathBuf,
    pub bin_path: String,
    pub run_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_is_dated() {
        let run_id = ConfigOptions::generate_run_id();
        let (date, id) = run_id.split_once('-').unwrap();
        assert_eq!(8, date.len());
        assert_eq!(4, id.len());
    }

    #[test]
    fn test_pinned_run_id_is_stable() {
        let mut options = ConfigOptions::default();
        let pinned = options.pin_run_id();
        assert_eq!(pinned, options.get_run_id());
        assert_eq!(pinned, options.load_config().unwrap().run_id);
    }

    #[test]
    fn test_explicit_values_win() {
        let options = ConfigOptions {
            working_dir: Some("/srv/manifests".to_string()),
            run_id: Some("fixed".to_string()),
        };

        let found = options.load_config().unwrap();
        assert_eq!(PathBuf::from("/srv/manifests"), found.working_dir);
        assert_eq!("fixed", found.run_id);
    }
}
