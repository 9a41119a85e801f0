//! Accident store schema and loaders
//!
//! The three tables follow the relational layout of the accident database:
//!
//! ```text
//! REGION(RegionCode PK, RegionName)
//! ACCIDENT(AccidentID PK, OccurYearMonth, ..., RegionCode FK -> REGION)
//! DRIVER(DriverID PK, AccidentID FK -> ACCIDENT, Role, ...)
//! ```
//!
//! `OccurYearMonth` is stored as a `YYYYMM` string so it sorts
//! chronologically as text.

use super::{DuckDBReader, Reader};
use crate::registry::{ColumnRegistry, Table};
use crate::{Result, SafedriveError};
use duckdb::params;
use std::path::Path;
use tracing::{info, warn};

const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS REGION (
    RegionCode VARCHAR PRIMARY KEY,
    RegionName VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS ACCIDENT (
    AccidentID INTEGER PRIMARY KEY,
    OccurYearMonth VARCHAR NOT NULL,
    DayNight VARCHAR,
    RegionCode VARCHAR REFERENCES REGION(RegionCode),
    Description VARCHAR,
    DeathCount INTEGER DEFAULT 0,
    SevereInjuryCount INTEGER DEFAULT 0,
    MinorInjuryCount INTEGER DEFAULT 0,
    ReportedInjuryCount INTEGER DEFAULT 0,
    AccidentType VARCHAR,
    LawViolationYn VARCHAR,
    RoadSurfaceState VARCHAR,
    WeatherState VARCHAR,
    RoadForm VARCHAR
);
CREATE TABLE IF NOT EXISTS DRIVER (
    DriverID INTEGER PRIMARY KEY,
    AccidentID INTEGER REFERENCES ACCIDENT(AccidentID),
    Role VARCHAR,
    VehicleType VARCHAR,
    Gender VARCHAR,
    AgeGroup VARCHAR,
    InjuryLevel VARCHAR
);
";

/// Tables in foreign-key order: parents before children
const LOAD_ORDER: [Table; 3] = [Table::Region, Table::Accident, Table::Driver];

const SAMPLE_ACCIDENTS: i32 = 400;

const REGIONS: [&str; 25] = [
    "서울 종로구", "서울 중구", "서울 용산구", "서울 성동구", "서울 광진구",
    "서울 동대문구", "서울 중랑구", "서울 성북구", "서울 강북구", "서울 도봉구",
    "서울 노원구", "서울 은평구", "서울 서대문구", "서울 마포구", "서울 양천구",
    "서울 강서구", "서울 구로구", "서울 금천구", "서울 영등포구", "서울 동작구",
    "서울 관악구", "서울 서초구", "서울 강남구", "서울 송파구", "서울 강동구",
];
const DAY_NIGHT: [&str; 2] = ["주간", "야간"];
const ACCIDENT_TYPES: [&str; 3] = ["차대차", "차대사람", "차량단독"];
const COLLISIONS: [&str; 4] = ["측면충돌", "추돌", "정면충돌", "기타"];
const ROAD_SURFACES: [&str; 4] = ["건조", "젖음/습기", "서리/결빙", "적설"];
const WEATHER: [&str; 5] = ["맑음", "흐림", "비", "눈", "안개"];
const ROAD_FORMS: [&str; 5] = [
    "교차로 - 교차로안",
    "교차로 - 교차로부근",
    "단일로 - 기타",
    "단일로 - 터널",
    "기타 - 기타",
];
const VEHICLES: [&str; 5] = ["승용", "화물", "승합", "이륜", "자전거"];
const GENDERS: [&str; 7] = ["M", "M", "F", "M", "F", "M", "O"];
const AGE_GROUPS: [&str; 6] = ["20대", "30대", "40대", "50대", "60대", "70대 이상"];
const INJURY_LEVELS: [&str; 4] = ["상해없음", "경상", "중상", "사망"];

/// Create ACCIDENT, DRIVER and REGION if they do not exist
pub fn create_schema(reader: &DuckDBReader) -> Result<()> {
    reader.execute_batch(SCHEMA_DDL)?;
    info!("Accident schema ready");
    Ok(())
}

fn pick<T: Copy>(values: &[T], i: i32) -> T {
    values[i.unsigned_abs() as usize % values.len()]
}

/// Seed a deterministic sample data set
///
/// 25 regions with uneven accident counts spread over 24 months
/// (2023-01 to 2024-12). Every accident has an at-fault driver; three in four
/// also have a victim driver.
pub fn load_sample_data(reader: &DuckDBReader) -> Result<()> {
    let conn = reader.connection();
    let fail = |what: &str, e: duckdb::Error| {
        SafedriveError::ReaderError(format!("Failed to load sample {}: {}", what, e))
    };

    in_transaction(reader, || {
        let mut region = conn
            .prepare("INSERT INTO REGION VALUES (?, ?)")
            .map_err(|e| fail("regions", e))?;
        for (i, name) in REGIONS.iter().enumerate() {
            region
                .execute(params![format!("R{:03}", i + 1), name])
                .map_err(|e| fail("regions", e))?;
        }

        let mut accident = conn
            .prepare("INSERT INTO ACCIDENT VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .map_err(|e| fail("accidents", e))?;
        let mut driver = conn
            .prepare("INSERT INTO DRIVER VALUES (?, ?, ?, ?, ?, ?, ?)")
            .map_err(|e| fail("drivers", e))?;

        let mut driver_id = 0;
        for i in 0..SAMPLE_ACCIDENTS {
            let id = i + 1;
            let month_index = (i * 7) % 24;
            let year_month = format!("{}{:02}", 2023 + month_index / 12, month_index % 12 + 1);
            // Skewed so a handful of districts dominate
            let region_index = if i % 3 == 0 { i % 7 } else { i % 25 };
            let accident_type = pick(&ACCIDENT_TYPES, i);

            accident
                .execute(params![
                    id,
                    year_month,
                    pick(&DAY_NIGHT, i / 3),
                    format!("R{:03}", region_index + 1),
                    format!("{} - {}", accident_type, pick(&COLLISIONS, i / 5)),
                    i32::from(i % 23 == 0),
                    (i * 3) % 4 / 2,
                    (i * 5) % 4,
                    i32::from(i % 6 == 1),
                    accident_type,
                    "Y",
                    pick(&ROAD_SURFACES, i / 7),
                    pick(&WEATHER, i / 11),
                    pick(&ROAD_FORMS, i / 2),
                ])
                .map_err(|e| fail("accidents", e))?;

            driver_id += 1;
            driver
                .execute(params![
                    driver_id,
                    id,
                    "가해",
                    pick(&VEHICLES, i),
                    pick(&GENDERS, i),
                    pick(&AGE_GROUPS, i / 2),
                    pick(&INJURY_LEVELS, i / 9),
                ])
                .map_err(|e| fail("drivers", e))?;

            if i % 4 != 0 {
                driver_id += 1;
                driver
                    .execute(params![
                        driver_id,
                        id,
                        "피해",
                        pick(&VEHICLES, i + 2),
                        pick(&GENDERS, i + 3),
                        pick(&AGE_GROUPS, i + 1),
                        pick(&INJURY_LEVELS, i + 1),
                    ])
                    .map_err(|e| fail("drivers", e))?;
            }
        }
        Ok(())
    })?;

    info!(accidents = SAMPLE_ACCIDENTS, "Loaded sample accident data");
    Ok(())
}

/// Run `body` inside one transaction, rolling back if it fails
///
/// The caller always gets the body's own error; a failed ROLLBACK is only
/// logged.
fn in_transaction<T>(reader: &DuckDBReader, body: impl FnOnce() -> Result<T>) -> Result<T> {
    reader.execute_batch("BEGIN TRANSACTION")?;
    match body() {
        Ok(value) => {
            reader.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = reader.execute_batch("ROLLBACK") {
                warn!("Rollback after failed load also failed: {}", rollback);
            }
            Err(e)
        }
    }
}

/// Append `<TABLE>.csv` files to the matching tables by column name
///
/// File stems are matched case-insensitively against ACCIDENT, DRIVER and
/// REGION. Files are loaded parents-first regardless of argument order, all
/// in one transaction. Returns the number of rows inserted.
pub fn load_data_files<P: AsRef<Path>>(reader: &DuckDBReader, files: &[P]) -> Result<usize> {
    let mut by_table = Vec::with_capacity(files.len());
    for file in files {
        let path = file.as_ref();
        if !path.exists() {
            return Err(SafedriveError::ReaderError(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if extension != "csv" {
            return Err(SafedriveError::ReaderError(format!(
                "Unsupported file format: {}. Expected <TABLE>.csv",
                path.display()
            )));
        }

        let table: Table = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_uppercase()
            .parse()?;
        by_table.push((table, path));
    }
    by_table.sort_by_key(|(table, _)| LOAD_ORDER.iter().position(|t| t == table));

    let conn = reader.connection();
    in_transaction(reader, || {
        let mut total = 0;
        for (table, path) in &by_table {
            info!("Loading {} into table '{}'", path.display(), table);
            let escaped = path.to_string_lossy().replace('\'', "''");
            let sql = format!(
                "INSERT INTO {} BY NAME SELECT * FROM read_csv_auto('{}')",
                table, escaped
            );
            total += conn.execute(&sql, params![]).map_err(|e| {
                SafedriveError::ReaderError(format!("Failed to load CSV {}: {}", path.display(), e))
            })?;
        }
        Ok(total)
    })
}

/// Open a store and seed it as requested
///
/// The schema is created whenever anything is loaded, so an empty file
/// database still answers queries.
pub fn open_store<P: AsRef<Path>>(
    uri: &str,
    load_sample: bool,
    files: &[P],
) -> Result<DuckDBReader> {
    let reader = DuckDBReader::from_connection_string(uri)?;

    if load_sample || !files.is_empty() {
        create_schema(&reader)?;
    }
    if load_sample {
        info!("Loading sample data (REGION, ACCIDENT, DRIVER tables)");
        load_sample_data(&reader)?;
    }
    if !files.is_empty() {
        info!("Loading {} data file(s)", files.len());
        let rows = load_data_files(&reader, files)?;
        info!(rows, "Data files loaded");
    }

    Ok(reader)
}

/// Check every registered physical column exists in the store
pub fn verify_registry<R: Reader + ?Sized>(reader: &R, registry: &ColumnRegistry) -> Result<()> {
    for (table, columns) in registry.physical_columns() {
        let names: Vec<String> = columns.iter().map(|c| c.column.clone()).collect();
        let sql = format!("SELECT {} FROM {} LIMIT 0", names.join(", "), table);
        reader.validate_columns(&sql, &names).map_err(|e| {
            SafedriveError::ConfigError(format!("Registry does not match table {}: {}", table, e))
        })?;
    }
    Ok(())
}
