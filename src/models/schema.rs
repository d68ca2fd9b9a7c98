//! Fixed schema of both traffic sources: column names, target types for
//! casting, and the static rename dictionaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    /// Non-negative integer (vehicle counts).
    Count,
    Float,
    Bool,
    Text,
    Category,
    Date,
    Time,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "int64",
            ColumnType::Count => "count",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Text => "string",
            ColumnType::Category => "category",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

// Shared join columns
pub const DATE: &str = "datum";
pub const TIME_FROM: &str = "zeit_von";
pub const YEAR: &str = "jahr";
pub const MONTH: &str = "monat";

// Source A (vehicle counts)
pub const CODE: &str = "code";
pub const NAME: &str = "name";
pub const LOCALITY: &str = "gemeinde";
pub const ADDRESS: &str = "adresse";
pub const STREET: &str = "strasse";
pub const DIRECTION: &str = "richtung";
pub const WEEKDAY: &str = "wochentag";
pub const REGIONAL_BUS: &str = "reg_bus";
pub const TIME_TO: &str = "zeit_bis";
pub const LANE_CODE: &str = "spur_code";
pub const HOUR: &str = "stunde";
pub const WEEK: &str = "woche";
pub const IS_WEEKEND: &str = "ist_wochenende";

pub const MOTORCYCLE: &str = "mr";
pub const CAR: &str = "pw";
pub const CAR_WITH_TRAILER: &str = "pw+";
pub const VAN: &str = "lief";
pub const VAN_WITH_TRAILER: &str = "lief+";
pub const VAN_WITH_SEMITRAILER: &str = "lief+aufl.";
pub const TRUCK: &str = "lw";
pub const TRUCK_WITH_TRAILER: &str = "lw+";
pub const ARTICULATED_TRUCK: &str = "sattelzug";
pub const BUS: &str = "bus";

pub const REGIONAL_BUS_LABEL: &str = "Regional Bus";
pub const MOTORCYCLE_LABEL: &str = "Motorrad";
pub const CAR_LABEL: &str = "Personenwagen";
pub const CAR_WITH_TRAILER_LABEL: &str = "Personenwagen mit anhänger";
pub const VAN_LABEL: &str = "Lieferwagen";
pub const VAN_WITH_TRAILER_LABEL: &str = "Lieferwagen mit anhänger";
pub const VAN_WITH_SEMITRAILER_LABEL: &str = "Lieferwagen mit auflieger";
pub const TRUCK_LABEL: &str = "Lastwagen";
pub const TRUCK_WITH_TRAILER_LABEL: &str = "Lastwagen mit anhänger";

pub const CAR_TOTAL: &str = "pkw_total";
pub const VAN_TOTAL: &str = "lieferwagen_total";
pub const TRUCK_TOTAL: &str = "lkw_total";
pub const MOTORIZED_TOTAL: &str = "motorisiert_total";

// Source B (measurement stations)
pub const STATION_NAME: &str = "messstelle";
pub const STATION_ID: &str = "messstationid";
pub const INDICATOR: &str = "indikator";
pub const START_TIME: &str = "startzeit";
pub const END_TIME: &str = "endzeit";
pub const DAY: &str = "tag";

/// Type casts applied to Source A right after loading.
pub const COUNT_SOURCE_CASTS: &[(&str, ColumnType)] = &[
    (CODE, ColumnType::Int),
    (NAME, ColumnType::Text),
    (LOCALITY, ColumnType::Category),
    (ADDRESS, ColumnType::Text),
    (STREET, ColumnType::Text),
    (DIRECTION, ColumnType::Text),
    (YEAR, ColumnType::Int),
    (WEEKDAY, ColumnType::Category),
    (MOTORCYCLE, ColumnType::Count),
    (CAR, ColumnType::Count),
    (CAR_WITH_TRAILER, ColumnType::Count),
    (VAN, ColumnType::Count),
    (VAN_WITH_TRAILER, ColumnType::Count),
    (VAN_WITH_SEMITRAILER, ColumnType::Count),
    (TRUCK, ColumnType::Count),
    (TRUCK_WITH_TRAILER, ColumnType::Count),
    (ARTICULATED_TRUCK, ColumnType::Count),
    (BUS, ColumnType::Count),
];

/// Type casts applied to Source B right after loading.
pub const MEASUREMENT_SOURCE_CASTS: &[(&str, ColumnType)] = &[
    (STATION_NAME, ColumnType::Category),
    (STATION_ID, ColumnType::Text),
    (INDICATOR, ColumnType::Category),
];

/// Abbreviated Source A headers and their descriptive names.
pub const VEHICLE_COLUMN_RENAMES: &[(&str, &str)] = &[
    (REGIONAL_BUS, REGIONAL_BUS_LABEL),
    (MOTORCYCLE, MOTORCYCLE_LABEL),
    (CAR, CAR_LABEL),
    (CAR_WITH_TRAILER, CAR_WITH_TRAILER_LABEL),
    (VAN, VAN_LABEL),
    (VAN_WITH_TRAILER, VAN_WITH_TRAILER_LABEL),
    (VAN_WITH_SEMITRAILER, VAN_WITH_SEMITRAILER_LABEL),
    (TRUCK, TRUCK_LABEL),
    (TRUCK_WITH_TRAILER, TRUCK_WITH_TRAILER_LABEL),
];

/// Yes/no tokens of the regional bus flag.
pub const BINARY_TOKENS: &[(&str, i64)] = &[("JA", 1), ("Nein", 0)];

/// Derived totals and the (renamed) columns that feed them.
pub const VEHICLE_AGGREGATES: &[(&str, &[&str])] = &[
    (CAR_TOTAL, &[CAR_LABEL, CAR_WITH_TRAILER_LABEL]),
    (
        VAN_TOTAL,
        &[VAN_LABEL, VAN_WITH_TRAILER_LABEL, VAN_WITH_SEMITRAILER_LABEL],
    ),
    (
        TRUCK_TOTAL,
        &[TRUCK_LABEL, TRUCK_WITH_TRAILER_LABEL, ARTICULATED_TRUCK],
    ),
    (
        MOTORIZED_TOTAL,
        &[MOTORCYCLE_LABEL, BUS, CAR_TOTAL, VAN_TOTAL, TRUCK_TOTAL],
    ),
];

/// Source A columns with no further use after normalisation.
pub const COUNT_REDUNDANT_COLUMNS: &[&str] = &[LOCALITY, DIRECTION, LANE_CODE, HOUR];

/// Raw per-class counts that the totals supersede.
pub const RAW_COUNT_COLUMNS: &[&str] = &[
    CAR_LABEL,
    CAR_WITH_TRAILER_LABEL,
    VAN_LABEL,
    VAN_WITH_TRAILER_LABEL,
    VAN_WITH_SEMITRAILER_LABEL,
    TRUCK_LABEL,
    TRUCK_WITH_TRAILER_LABEL,
    ARTICULATED_TRUCK,
];
