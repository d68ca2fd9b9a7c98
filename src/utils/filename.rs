use chrono::{Datelike, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default output directory: output/traffic-{YYMMDD}
pub fn default_output_dir() -> PathBuf {
    let now = Local::now();
    let dirname = format!(
        "traffic-{:02}{:02}{:02}",
        now.year() % 100,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(dirname)
}

fn street_slug(street: &str) -> String {
    street
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// One Parquet file per street, in input order, e.g. `street-k80.parquet`.
/// Streets whose slugs collide (`"K 80"` and `"K-80"`) get a numeric suffix:
/// `street-k_80-2.parquet`.
pub fn street_partition_paths<'a, I>(output_dir: &Path, streets: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    streets
        .into_iter()
        .map(|street| {
            let slug = street_slug(street);
            let mut name = format!("street-{}.parquet", slug);
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("street-{}-{}.parquet", slug, n);
                n += 1;
            }
            output_dir.join(name)
        })
        .collect()
}
