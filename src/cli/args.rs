use crate::settings::JoinType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "traffic-merge")]
#[command(about = "Merge municipal vehicle counts with station measurements")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalise both sources, merge them and split by street
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_enum, help = "Join type [default: inner]")]
        join_type: Option<JoinType>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Streets to partition by, comma separated"
        )]
        streets: Option<Vec<String>>,

        #[arg(long, help = "Fail when the join comes back empty")]
        strict_join: bool,

        #[arg(long, help = "Write the results as Parquet files")]
        save: bool,

        #[arg(
            short,
            long,
            help = "Output directory, implies --save [default: output/traffic-{YYMMDD}]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Print the join integrity report as JSON")]
        json: bool,
    },

    /// Normalise both sources without merging
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Display information about a Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

/// Options that override where and what the normalisers read.
#[derive(clap::Args, Debug, Default)]
pub struct SourceArgs {
    #[arg(short, long, help = "Directory holding both source files")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, help = "Locality to keep [default: Weinfelden]")]
    pub locality: Option<String>,

    #[arg(short, long, help = "Year to keep [default: 2024]")]
    pub year: Option<i32>,
}
