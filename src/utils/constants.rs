/// Input file names
pub const COUNT_FILE: &str = "Data_1_neu.csv";
pub const MEASUREMENT_FILE: &str = "Data_2.parquet";

/// Data directory names probed when locating the project root
pub const DATA_DIR_NAMES: &[&str] = &["Data", "data"];
pub const ROOT_SEARCH_DEPTH: usize = 4;

/// Pipeline defaults
pub const DEFAULT_LOCALITY: &str = "Weinfelden";
pub const DEFAULT_TARGET_YEAR: i32 = 2024;
pub const DEFAULT_LEFT_SUFFIX: &str = "_data1";
pub const DEFAULT_RIGHT_SUFFIX: &str = "_data2";
pub const DEFAULT_STREETS: &[&str] = &["K80", "K75", "Gemeindestrasse"];
pub const DEFAULT_POST_MERGE_DROPS: &[&str] = &[
    "jahr_data1",
    "monat_data1",
    "startzeit",
    "endzeit",
    "jahr_data2",
    "monat_data2",
    "tag",
];

/// Cell tokens read as missing values
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "NULL", "null", "None", "<NA>", "#N/A",
];

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "TRAFFIC_MERGE";

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 8192;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
