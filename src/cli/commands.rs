use crate::cli::args::{Cli, Commands, SourceArgs};
use crate::error::Result;
use crate::models::Table;
use crate::processors::{IntegrityChecker, NormalizedSources, PipelineOutput, TrafficPipeline};
use crate::readers::ParquetTableReader;
use crate::settings::PipelineConfig;
use crate::utils::filename::default_output_dir;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::path::Path;

pub fn run(cli: Cli) -> Result<()> {
    let silent = cli.verbose;

    match cli.command {
        Commands::Run {
            source,
            join_type,
            streets,
            strict_join,
            save,
            output_dir,
            compression,
            json,
        } => {
            let mut config = load_config(cli.config.as_deref(), source)?;
            if let Some(join_type) = join_type {
                config.join_type = join_type;
            }
            if let Some(streets) = streets {
                config.street_filter = streets;
            }
            config.strict_join |= strict_join;
            let config = config.validated()?;

            println!("Merging traffic data...");
            println!("Locality: {}, year: {}", config.locality_filter, config.target_year);
            println!("Join: {} on {}", config.join_type, config.join_keys.join(", "));

            let progress = ProgressReporter::new_spinner("Processing data...", silent);
            let output = TrafficPipeline::new(config).run(Some(&progress))?;
            progress.finish_with_message(&format!("Merged {} rows", output.merged.height()));

            print_output(&output);

            if json {
                println!("{}", serde_json::to_string_pretty(&output.report)?);
            }

            if save || output_dir.is_some() {
                let dir = output_dir.unwrap_or_else(default_output_dir);
                let writer = ParquetWriter::new().with_compression(&compression)?;
                std::fs::create_dir_all(&dir)?;

                let mut files = 0;
                for (name, table) in [
                    ("counts", &output.counts),
                    ("measurements", &output.measurements),
                    ("merged", &output.merged),
                ] {
                    if writer.write_table(table, &dir.join(format!("{}.parquet", name)))? {
                        files += 1;
                    }
                }
                files += writer.write_partitions(&output.streets, &dir)?.len();

                println!("\nWrote {} Parquet files to {}", files, dir.display());
            }
        }

        Commands::Validate { source } => {
            let config = load_config(cli.config.as_deref(), source)?.validated()?;

            let progress = ProgressReporter::new_spinner("Validating sources...", silent);
            let NormalizedSources {
                counts,
                measurements,
            } = TrafficPipeline::new(config).normalize_sources(Some(&progress))?;
            progress.finish_with_message("Validation complete");

            println!("Vehicle counts: {} rows, {} columns", counts.height(), counts.width());
            println!(
                "Station measurements: {} rows, {} columns",
                measurements.height(),
                measurements.width()
            );

            if counts.is_empty() || measurements.is_empty() {
                println!("⚠️  At least one source is empty after filtering");
            } else {
                println!("✅ Both sources normalised");
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;

            println!("\nFile Details:");
            println!("{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match ParquetTableReader::new().read_sample(&file, sample) {
                    Ok(table) => print_rows(&table),
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Configuration file and environment first, then command-line overrides.
fn load_config(path: Option<&Path>, source: SourceArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)?;
    if let Some(data_dir) = source.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(locality) = source.locality {
        config.locality_filter = locality;
    }
    if let Some(year) = source.year {
        config.target_year = year;
    }
    Ok(config)
}

fn print_output(output: &PipelineOutput) {
    println!("\nVehicle counts: {} rows", output.counts.height());
    println!("Station measurements: {} rows", output.measurements.height());
    println!(
        "Merged: {} rows, {} columns",
        output.merged.height(),
        output.merged.width()
    );
    for (street, table) in &output.streets {
        println!("  {}: {} rows", street, table.height());
    }

    println!("\n{}", IntegrityChecker::new().generate_summary(&output.report));
}

fn print_rows(table: &Table) {
    println!("{}", table.column_names().join(" | "));
    for row in 0..table.height() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.get(row).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("{}. {}", row + 1, cells.join(" | "));
    }
}
