//! Runner configuration: an optional YAML file, overridden by flags.

use {
    crate::{
        cli::CliArgs,
        error::{Result, RunnerError},
    },
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
    },
    tvr_p4rt::{ArbitrationIdentity, P4rtConfig, Target},
    tvr_testvector::loader::discover,
};

/// Every field is optional in the file; missing ones take the defaults of
/// [`P4rtConfig`] and [`tvr_logger::DEFAULT_FILTER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub target: Target,
    pub connect_timeout_ms: u64,
    pub packet_in_timeout_ms: u64,
    pub arbitration_timeout_ms: u64,
    pub channel_buffer_size: usize,
    pub packet_out_identity: ArbitrationIdentity,
    pub test_vectors: Vec<PathBuf>,
    pub test_vector_dirs: Vec<PathBuf>,
    pub log_filter: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let p4rt = P4rtConfig::default();
        Self {
            target: Target::default(),
            connect_timeout_ms: p4rt.connect_timeout_ms,
            packet_in_timeout_ms: p4rt.packet_in_timeout_ms,
            arbitration_timeout_ms: p4rt.arbitration_timeout_ms,
            channel_buffer_size: p4rt.channel_buffer_size,
            packet_out_identity: p4rt.packet_out_identity,
            test_vectors: Vec::new(),
            test_vector_dirs: Vec::new(),
            log_filter: tvr_logger::DEFAULT_FILTER.to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |reason: String| RunnerError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_yaml::from_str(&text).map_err(|e| config_error(e.to_string()))
    }

    /// The config file named by `args`, if any, with the flags applied on
    /// top.
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args);
        Ok(config)
    }

    pub fn apply(&mut self, args: &CliArgs) {
        if let Some(address) = &args.target {
            self.target = Target::new(address.clone());
        }
        if let Some(timeout) = args.packet_timeout_ms {
            self.packet_in_timeout_ms = timeout;
        }
        if let Some(filter) = &args.log_level {
            self.log_filter = filter.clone();
        }
        self.test_vectors.extend(args.files.iter().cloned());
        self.test_vector_dirs.extend(args.tv_dirs.iter().cloned());
    }

    pub fn p4rt_config(&self) -> P4rtConfig {
        P4rtConfig {
            connect_timeout_ms: self.connect_timeout_ms,
            packet_in_timeout_ms: self.packet_in_timeout_ms,
            arbitration_timeout_ms: self.arbitration_timeout_ms,
            channel_buffer_size: self.channel_buffer_size,
            packet_out_identity: self.packet_out_identity,
        }
    }

    /// Explicit files first, in the order given, then the contents of each
    /// test vector directory.
    pub fn test_vector_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.test_vectors.clone();
        for dir in &self.test_vector_dirs {
            files.extend(discover(dir)?);
        }
        if files.is_empty() {
            return Err(RunnerError::Argument(
                "no test vector files given".to_string(),
            ));
        }
        Ok(files)
    }
}
