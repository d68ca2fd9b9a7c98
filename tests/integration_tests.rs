use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;
use traffic_merge::models::{Column, ColumnType, Table, Value};
use traffic_merge::processors::TrafficPipeline;
use traffic_merge::writers::ParquetWriter;
use traffic_merge::{PipelineConfig, ProcessingError};

const COUNT_HEADER: &str = "code,name,gemeinde,adresse,strasse,richtung,jahr,wochentag,reg_bus,mr,pw,pw+,lief,lief+,lief+aufl.,lw,lw+,sattelzug,bus,datum,zeit_von,zeit_bis,spur_code,stunde";

fn count_row(locality: &str, street: &str, date: &str, weekday: &str, from: &str, to: &str) -> String {
    format!(
        "101,Zählstelle Nord,{locality},Hauptstrasse 1,{street},Nord,2024,{weekday},JA,1,10,2,3,1,0,4,1,2,1,{date},{from},{to},1,8"
    )
}

fn timestamp(raw: &str) -> Value {
    Value::Timestamp(NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap())
}

fn measurement_table(rows: &[(&str, &str, f64)]) -> Table {
    Table::from_columns(vec![
        Column::new(
            "messstelle",
            ColumnType::Text,
            rows.iter().map(|r| Value::text(r.0)).collect(),
        ),
        Column::new(
            "messstationid",
            ColumnType::Int,
            rows.iter().map(|_| Value::Int(4711)).collect(),
        ),
        Column::new(
            "indikator",
            ColumnType::Text,
            rows.iter().map(|_| Value::text("NO2")).collect(),
        ),
        Column::new(
            "startzeit",
            ColumnType::Timestamp,
            rows.iter().map(|r| timestamp(r.1)).collect(),
        ),
        Column::new(
            "endzeit",
            ColumnType::Timestamp,
            rows.iter().map(|r| timestamp(r.1)).collect(),
        ),
        Column::new(
            "wert",
            ColumnType::Float,
            rows.iter().map(|r| Value::Float(r.2)).collect(),
        ),
    ])
    .unwrap()
}

fn write_sources(dir: &Path, count_rows: &[String], measurements: &Table) {
    let mut csv = format!("{}\n", COUNT_HEADER);
    for row in count_rows {
        csv.push_str(row);
        csv.push('\n');
    }
    std::fs::write(dir.join("Data_1_neu.csv"), csv).unwrap();
    ParquetWriter::new()
        .write_table(measurements, &dir.join("Data_2.parquet"))
        .unwrap();
}

fn config_for(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: Some(dir.to_path_buf()),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_weinfelden_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_sources(
        temp_dir.path(),
        &[
            count_row("Weinfelden", "K80", "2024-03-01", "Friday", "8:00", "09:00"),
            count_row("Weinfelden", "K75", "2024-03-01", "Friday", "09:00", "10:00"),
            count_row("Amriswil", "K80", "2024-03-01", "Friday", "8:00", "09:00"),
            count_row("Weinfelden", "K80", "2023-03-01", "Wednesday", "8:00", "09:00"),
        ],
        &measurement_table(&[
            ("Weinfelden Zentrum", "2024-03-01 08:00:00", 21.5),
            ("WEINFELDEN Zentrum", "2024-03-01 09:00:00", 18.0),
            ("Frauenfeld", "2024-03-01 08:00:00", 30.0),
            ("Weinfelden Zentrum", "2023-03-01 08:00:00", 12.0),
        ]),
    );

    let output = TrafficPipeline::new(config_for(temp_dir.path()))
        .run(None)
        .unwrap();

    assert_eq!(output.counts.height(), 2);
    assert_eq!(output.measurements.height(), 2);
    assert_eq!(output.merged.height(), 2);

    let merged = &output.merged;
    assert_eq!(merged.get(0, "strasse"), Some(&Value::text("K80")));
    assert_eq!(merged.get(0, "pkw_total"), Some(&Value::Int(12)));
    assert_eq!(merged.get(0, "wochentag"), Some(&Value::text("Freitag")));
    assert_eq!(
        merged.get(0, "datum"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
    );
    assert_eq!(merged.get(0, "zeit_von"), Some(&Value::text("08:00")));
    assert_eq!(merged.get(0, "wert"), Some(&Value::Float(21.5)));

    for dropped in ["jahr_data1", "monat_data1", "startzeit", "endzeit", "jahr_data2", "monat_data2", "tag"] {
        assert!(!merged.has_column(dropped), "{} should be dropped", dropped);
    }

    assert_eq!(output.streets["K80"].height(), 1);
    assert_eq!(output.streets["K75"].height(), 1);
    assert!(output.streets["Gemeindestrasse"].is_empty());
    assert_eq!(
        output.streets["Gemeindestrasse"].column_names(),
        merged.column_names()
    );

    assert_eq!(output.report.shared_keys, 2);
    assert!(!output.report.is_silent_empty_join());
}

#[test]
fn test_empty_sources_give_empty_outputs() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_sources(temp_dir.path(), &[], &measurement_table(&[]));

    let output = TrafficPipeline::new(config_for(temp_dir.path()))
        .run(None)
        .unwrap();

    assert!(output.counts.is_empty());
    assert!(output.measurements.is_empty());
    assert!(output.merged.is_empty());
    assert_eq!(output.streets.len(), 3);
    assert!(output.streets.values().all(Table::is_empty));
}

#[test]
fn test_counts_emptied_by_locality_filter() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_sources(
        temp_dir.path(),
        &[
            count_row("Amriswil", "K80", "2024-03-01", "Friday", "8:00", "09:00"),
            count_row("Frauenfeld", "K75", "2024-03-01", "Friday", "09:00", "10:00"),
        ],
        &measurement_table(&[
            ("Weinfelden Zentrum", "2024-03-01 08:00:00", 21.5),
            ("Weinfelden Zentrum", "2024-03-01 09:00:00", 18.0),
        ]),
    );

    // An empty side is not a misaligned join, so strict mode still succeeds.
    let config = PipelineConfig {
        strict_join: true,
        ..config_for(temp_dir.path())
    };
    let output = TrafficPipeline::new(config).run(None).unwrap();

    assert!(output.counts.is_empty());
    assert_eq!(output.measurements.height(), 2);
    assert!(output.merged.is_empty());
    assert!(!output.report.is_silent_empty_join());
    assert_eq!(output.streets.len(), 3);
    assert!(output.streets.values().all(Table::is_empty));
}

#[test]
fn test_missing_source_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let result = TrafficPipeline::new(config_for(temp_dir.path())).run(None);

    match result {
        Err(ProcessingError::MissingSource { path }) => {
            assert!(path.is_absolute());
            assert!(path.ends_with("Data_1_neu.csv"));
        }
        other => panic!("expected MissingSource, got {:?}", other.map(|o| o.merged)),
    }
}

#[test]
fn test_strict_join_rejects_unaligned_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_sources(
        temp_dir.path(),
        &[count_row("Weinfelden", "K80", "2024-03-01", "Friday", "8:00", "09:00")],
        &measurement_table(&[("Weinfelden Zentrum", "2024-03-02 08:00:00", 21.5)]),
    );

    let lenient = TrafficPipeline::new(config_for(temp_dir.path()))
        .run(None)
        .unwrap();
    assert!(lenient.merged.is_empty());
    assert!(lenient.report.is_silent_empty_join());

    let strict = PipelineConfig {
        strict_join: true,
        ..config_for(temp_dir.path())
    };
    assert!(matches!(
        TrafficPipeline::new(strict).run(None),
        Err(ProcessingError::EmptyJoin { .. })
    ));
}

#[test]
fn test_outputs_round_trip_through_parquet() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_sources(
        temp_dir.path(),
        &[count_row("Weinfelden", "K80", "2024-03-01", "Friday", "8:00", "09:00")],
        &measurement_table(&[("Weinfelden Zentrum", "2024-03-01 08:00:00", 21.5)]),
    );

    let output = TrafficPipeline::new(config_for(temp_dir.path()))
        .run(None)
        .unwrap();

    let out_dir = temp_dir.path().join("out");
    let writer = ParquetWriter::new();
    let files = writer.write_partitions(&output.streets, &out_dir).unwrap();
    assert_eq!(files.len(), 3);

    let k80 = out_dir.join("street-k80.parquet");
    let file_info = writer.get_file_info(&k80).unwrap();
    assert_eq!(file_info.total_rows, 1);
    assert!(file_info.columns.iter().any(|c| c == "pkw_total"));
}
