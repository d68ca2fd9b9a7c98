use chrono::{Duration, NaiveDate, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use traffic_merge::models::{Column, ColumnType, Table, Value};
use traffic_merge::processors::{CountNormalizer, DataMerger};
use traffic_merge::readers::CsvTableReader;

const COUNT_HEADER: &str = "code,name,gemeinde,adresse,strasse,richtung,jahr,wochentag,reg_bus,mr,pw,pw+,lief,lief+,lief+aufl.,lw,lw+,sattelzug,bus,datum,zeit_von,zeit_bis,spur_code,stunde";

const STREETS: [&str; 3] = ["K80", "K75", "Gemeindestrasse"];

// Quarter-hourly counts on three streets
fn create_count_csv(days: usize) -> String {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut csv = format!("{}\n", COUNT_HEADER);

    for day in 0..days {
        let date = base_date + Duration::days(day as i64);
        let weekday = date.format("%A");
        for slot in 0..96 {
            let from = NaiveTime::from_hms_opt(0, 0, 0).unwrap() + Duration::minutes(slot * 15);
            let to = from + Duration::minutes(15);
            for street in STREETS {
                csv.push_str(&format!(
                    "101,Zählstelle,Weinfelden,Hauptstrasse 1,{street},Nord,2024,{weekday},Nein,1,{},2,3,1,0,4,1,2,1,{date},{},{},1,{}\n",
                    slot % 40,
                    from.format("%H:%M"),
                    to.format("%H:%M"),
                    slot / 4
                ));
            }
        }
    }

    csv
}

fn create_measurements(days: usize) -> Table {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let starts: Vec<Value> = (0..days as i64 * 96)
        .map(|slot| Value::Timestamp(base + Duration::minutes(slot * 15)))
        .collect();
    let rows = starts.len();

    Table::from_columns(vec![
        Column::new(
            "messstelle",
            ColumnType::Category,
            vec![Value::text("Weinfelden Zentrum"); rows],
        ),
        Column::new(
            "datum",
            ColumnType::Date,
            starts.iter().map(|v| v.as_date().map_or(Value::Null, Value::Date)).collect(),
        ),
        Column::new(
            "zeit_von",
            ColumnType::Time,
            starts.iter().map(|v| v.as_time().map_or(Value::Null, Value::Time)).collect(),
        ),
        Column::new(
            "wert",
            ColumnType::Float,
            (0..rows).map(|i| Value::Float(i as f64 * 0.1)).collect(),
        ),
    ])
    .unwrap()
}

fn benchmark_count_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_normalizer");

    for days in [7, 30] {
        let csv = create_count_csv(days);
        let reader = CsvTableReader::new();
        let normalizer = CountNormalizer::new("bench.csv", "Weinfelden", 2024);

        group.bench_with_input(BenchmarkId::new("normalize", days), &csv, |b, csv| {
            b.iter(|| {
                let raw = reader.parse_str(csv).unwrap();
                let local = normalizer.filter_locality(raw).unwrap().drop_nulls();
                black_box(normalizer.normalize(local).unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_data_merger(c: &mut Criterion) {
    let reader = CsvTableReader::new();
    let normalizer = CountNormalizer::new("bench.csv", "Weinfelden", 2024);
    let raw = reader.parse_str(&create_count_csv(30)).unwrap();
    let counts = normalizer.normalize(raw).unwrap();
    let measurements = create_measurements(30);

    let merger = DataMerger::new().with_streets(&STREETS);

    c.bench_function("data_merger_run", |b| {
        b.iter(|| black_box(merger.run(&counts, &measurements).unwrap()))
    });
}

criterion_group!(benches, benchmark_count_normalizer, benchmark_data_merger);
criterion_main!(benches);
