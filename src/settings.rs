use clap::ValueEnum;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::schema::{DATE, TIME_FROM};
use crate::utils::constants::*;
use crate::utils::paths::{data_dir_in, find_project_root};

/// How unmatched keys are treated by the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinType {
    pub fn keeps_unmatched_left(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Outer)
    }

    pub fn keeps_unmatched_right(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Outer)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        };
        f.write_str(name)
    }
}

/// Process-wide pipeline configuration. Built once at start-up.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding both inputs; resolved from the project root when unset.
    pub data_dir: Option<PathBuf>,

    #[validate(length(min = 1))]
    pub count_file: String,

    #[validate(length(min = 1))]
    pub measurement_file: String,

    #[validate(length(min = 1))]
    pub locality_filter: String,

    #[validate(range(min = 1900, max = 2100))]
    pub target_year: i32,

    #[validate(length(min = 1))]
    pub join_keys: Vec<String>,

    pub join_type: JoinType,

    #[validate(length(min = 1))]
    pub left_suffix: String,

    #[validate(length(min = 1))]
    pub right_suffix: String,

    pub drop_columns: Vec<String>,

    pub street_filter: Vec<String>,

    /// Drop the raw per-class counts once the totals exist.
    pub drop_raw_counts: bool,

    /// Drop the station id from the measurement source.
    pub drop_station_id: bool,

    /// Fail instead of warning when the join comes back empty.
    pub strict_join: bool,

    pub csv_delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            count_file: COUNT_FILE.to_string(),
            measurement_file: MEASUREMENT_FILE.to_string(),
            locality_filter: DEFAULT_LOCALITY.to_string(),
            target_year: DEFAULT_TARGET_YEAR,
            join_keys: vec![DATE.to_string(), TIME_FROM.to_string()],
            join_type: JoinType::Inner,
            left_suffix: DEFAULT_LEFT_SUFFIX.to_string(),
            right_suffix: DEFAULT_RIGHT_SUFFIX.to_string(),
            drop_columns: DEFAULT_POST_MERGE_DROPS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            street_filter: DEFAULT_STREETS.iter().map(|s| s.to_string()).collect(),
            drop_raw_counts: false,
            drop_station_id: false,
            strict_join: false,
            csv_delimiter: ',',
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then an optional TOML file, then `TRAFFIC_MERGE_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: PipelineConfig = builder.add_source(env).build()?.try_deserialize()?;

        config.validated()
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        if !self.csv_delimiter.is_ascii() {
            return Err(ProcessingError::Config(format!(
                "CSV delimiter must be ASCII, got '{}'",
                self.csv_delimiter
            )));
        }
        if self.left_suffix == self.right_suffix {
            return Err(ProcessingError::Config(
                "Join suffixes must differ".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir_in(&find_project_root()?)),
        }
    }

    pub fn count_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(&self.count_file))
    }

    pub fn measurement_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(&self.measurement_file))
    }

    pub fn csv_delimiter_byte(&self) -> u8 {
        u8::try_from(self.csv_delimiter).unwrap_or(b',')
    }
}

/// `TRAFFIC_MERGE_*` variables; list fields take comma-separated values.
fn environment() -> Environment {
    LIST_FIELDS.iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    )
}

const LIST_FIELDS: [&str; 3] = ["join_keys", "drop_columns", "street_filter"];
