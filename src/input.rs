use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use crate::{
    bodies::{
        common::EARTH_RADIUS_KM,
        sim_object::{CatalogRecord, ObjectClass, ReferenceSatellite},
    },
    error::{CatalogError, StoreError},
    store::{RecordStore, SortKey},
    threat::ThreatLevel,
};

/// Maximum number of catalog rows taken from one import.
pub const IMPORT_LIMIT: usize = 100;
/// Rows written per `bulk_create` call during import.
pub const IMPORT_BATCH_SIZE: usize = 20;

const SCREEN_INCLINATION: f64 = 51.6;
const SCREEN_DEFAULT_SEMIMAJOR_AXIS: f64 = 6871.0;

/// Values gathered at invocation time which drive a session.
#[derive(Debug, Clone)]
pub struct RuntimeParameters {
    pub tick_period: Duration,
    pub refresh_period: Duration,
    pub write_period: f64, // seconds of session time between output writes
    pub catalog_limit: usize,
    pub catalog_order: SortKey,
    pub active_threat_count: usize,
}

impl Default for RuntimeParameters {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            refresh_period: Duration::from_secs(30),
            write_period: 1.0,
            catalog_limit: IMPORT_LIMIT,
            catalog_order: SortKey::most_severe_first(),
            active_threat_count: 5,
        }
    }
}

pub mod cli {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::store::SortKey;

    /// Checks if value passed in to program argument is a positive number.
    ///
    ///# Argument
    ///* 'strng' - The value passed by the user
    ///
    fn positive_validator(strng: &str) -> Result<f64, String> {
        match strng.parse::<f64>() {
            Ok(value) if value > 0.0 => Ok(value),
            Ok(_) => Err(String::from("Input must be greater than zero")),
            Err(_) => Err(String::from("Input is non-numeric")),
        }
    }

    /// Defines the argument structure for the nova tracker.
    #[derive(Parser, Debug)]
    #[command(
        name = "Near-earth Orbital Visualization & Analysis (NOVA)",
        version,
        about = "Propagates a catalog of orbital objects and assesses collision threats against a reference satellite."
    )]
    pub struct Args {
        /// CSV catalog of orbital elements (Space-Track style header).
        #[arg(value_name = "CATALOG_CSV")]
        pub catalog: PathBuf,

        /// Output directory, a timestamped sub-directory is created inside it.
        #[arg(short, long, value_name = "DIR_NAME")]
        pub out: Option<PathBuf>,

        /// Session length in seconds, runs until interrupted when omitted.
        #[arg(short, long, value_name = "SECONDS", value_parser = positive_validator)]
        pub duration: Option<f64>,

        /// Period of the position and threat tick in milliseconds.
        #[arg(long, value_name = "MILLIS", default_value_t = 1000)]
        pub tick_ms: u64,

        /// Period of the catalog refresh in seconds.
        #[arg(long, value_name = "SECONDS", default_value_t = 30)]
        pub refresh_s: u64,

        /// Session seconds between output writes.
        #[arg(short = 'w', long, value_name = "SECONDS", default_value_t = 1.0, value_parser = positive_validator)]
        pub write_period: f64,

        /// Maximum number of catalog objects tracked.
        #[arg(short, long, default_value_t = super::IMPORT_LIMIT)]
        pub limit: usize,

        /// Catalog refresh ordering, `field` or `-field` for descending.
        #[arg(long, value_name = "KEY", default_value = "threat_level")]
        pub catalog_order: SortKey,

        /// Seed for the threat draws, entropy when omitted.
        #[arg(short, long)]
        pub seed: Option<u64>,

        /// JSON file describing the reference satellite.
        #[arg(short, long, value_name = "FILE")]
        pub reference: Option<PathBuf>,

        /// Deploy an interceptor against every new critical threat.
        #[arg(long)]
        pub auto_intercept: bool,
    }

    pub fn check_cli() -> Args {
        Args::parse()
    }
}

pub fn gather_runtime_parameters(args: &cli::Args) -> RuntimeParameters {
    RuntimeParameters {
        tick_period: Duration::from_millis(args.tick_ms.max(1)),
        refresh_period: Duration::from_secs(args.refresh_s.max(1)),
        write_period: args.write_period,
        catalog_limit: args.limit,
        catalog_order: args.catalog_order,
        ..Default::default()
    }
}

/// One row of a Space-Track style element export. Empty or unparseable numeric cells
/// are read as absent.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CatalogRow {
    #[serde(rename = "OBJECT_NAME", default)]
    pub object_name: Option<String>,
    #[serde(rename = "OBJECT_ID", default)]
    pub object_id: Option<String>,
    #[serde(rename = "NORAD_CAT_ID", default)]
    pub norad_cat_id: Option<String>,
    #[serde(rename = "OBJECT_TYPE", default)]
    pub object_type: Option<String>,
    #[serde(rename = "EPOCH", default)]
    pub epoch: Option<String>,
    #[serde(rename = "MEAN_MOTION", default, deserialize_with = "csv::invalid_option")]
    pub mean_motion: Option<f64>,
    #[serde(rename = "ECCENTRICITY", default, deserialize_with = "csv::invalid_option")]
    pub eccentricity: Option<f64>,
    #[serde(rename = "INCLINATION", default, deserialize_with = "csv::invalid_option")]
    pub inclination: Option<f64>,
    #[serde(rename = "RA_OF_ASC_NODE", default, deserialize_with = "csv::invalid_option")]
    pub ra_of_asc_node: Option<f64>,
    #[serde(rename = "ARG_OF_PERICENTER", default, deserialize_with = "csv::invalid_option")]
    pub arg_of_pericenter: Option<f64>,
    #[serde(rename = "MEAN_ANOMALY", default, deserialize_with = "csv::invalid_option")]
    pub mean_anomaly: Option<f64>,
    #[serde(rename = "SEMIMAJOR_AXIS", default, deserialize_with = "csv::invalid_option")]
    pub semimajor_axis: Option<f64>,
    #[serde(rename = "PERIOD", default, deserialize_with = "csv::invalid_option")]
    pub period: Option<f64>,
    #[serde(rename = "APOAPSIS", default, deserialize_with = "csv::invalid_option")]
    pub apoapsis: Option<f64>,
    #[serde(rename = "PERIAPSIS", default, deserialize_with = "csv::invalid_option")]
    pub periapsis: Option<f64>,
    #[serde(rename = "SIZE", default, deserialize_with = "csv::invalid_option")]
    pub size: Option<f64>,
}

/// Map a free-form catalog object type onto an object class.
pub fn classify_object_type(raw: Option<&str>) -> ObjectClass {
    let raw = match raw.map(|r| r.trim().to_lowercase()) {
        Some(r) if !r.is_empty() => r,
        _ => return ObjectClass::Unknown,
    };

    if raw.contains("deb") {
        ObjectClass::Debris
    } else if raw.contains("r/b") || raw.contains("rocket") {
        ObjectClass::RocketBody
    } else if raw == "unknown" || raw == "tba" {
        ObjectClass::Unknown
    } else {
        ObjectClass::Satellite
    }
}

/// Physical size estimate in meters for objects without a catalog size.
pub fn estimate_size<R: Rng + ?Sized>(class: ObjectClass, rng: &mut R) -> f64 {
    match class {
        ObjectClass::Satellite => rng.gen_range(5.0..15.0),
        ObjectClass::RocketBody => rng.gen_range(3.0..11.0),
        ObjectClass::Debris => rng.gen_range(0.1..2.1),
        ObjectClass::Unknown => 1.0,
    }
}

/// Coarse import-time screening from altitude and inclination proximity to the
/// reference orbit. Only used to order the catalog, the live level comes from the tick.
pub fn prescreen<R: Rng + ?Sized>(
    semimajor_axis: Option<f64>,
    inclination: Option<f64>,
    reference_altitude: f64,
    rng: &mut R,
) -> ThreatLevel {
    let altitude = semimajor_axis.unwrap_or(SCREEN_DEFAULT_SEMIMAJOR_AXIS) - EARTH_RADIUS_KM;
    let alt_diff = (altitude - reference_altitude).abs();
    let incl_diff = (inclination.unwrap_or(0.0) - SCREEN_INCLINATION).abs();

    if alt_diff < 50.0 && incl_diff < 10.0 {
        let probability = rng.gen_range(0.0..0.15);
        if probability > 0.10 {
            ThreatLevel::Critical
        } else if probability > 0.05 {
            ThreatLevel::High
        } else {
            ThreatLevel::Medium
        }
    } else if alt_diff < 100.0 {
        ThreatLevel::Low
    } else {
        ThreatLevel::None
    }
}

impl CatalogRow {
    pub fn into_record<R: Rng + ?Sized>(self, reference_altitude: f64, rng: &mut R) -> CatalogRecord {
        let object_type = classify_object_type(self.object_type.as_deref());
        let name = match self.object_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => format!("Object-{}", self.norad_cat_id.as_deref().unwrap_or("unknown")),
        };
        let size = Some(
            self.size
                .unwrap_or_else(|| estimate_size(object_type, &mut *rng)),
        );
        let threat_level = prescreen(self.semimajor_axis, self.inclination, reference_altitude, rng);

        CatalogRecord {
            id: String::new(),
            created_date: None,
            name,
            norad_cat_id: self.norad_cat_id,
            object_type,
            mean_motion: self.mean_motion,
            eccentricity: self.eccentricity,
            inclination: self.inclination,
            ra_of_asc_node: self.ra_of_asc_node,
            arg_of_pericenter: self.arg_of_pericenter,
            mean_anomaly: self.mean_anomaly,
            epoch: self.epoch,
            semimajor_axis: self.semimajor_axis,
            period: self.period,
            apoapsis: self.apoapsis,
            periapsis: self.periapsis,
            size,
            threat_level,
        }
    }
}

/// Read catalog rows from any CSV source with a header line.
pub fn read_catalog<R: io::Read>(reader: R) -> Result<Vec<CatalogRow>, CatalogError> {
    // Short rows are accepted, missing trailing cells read as absent.
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }

    Ok(rows)
}

pub fn read_catalog_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogRow>, CatalogError> {
    let file = File::open(path)?;
    read_catalog(BufReader::new(file))
}

/// Convert and store up to `IMPORT_LIMIT` rows, in batches of `IMPORT_BATCH_SIZE`.
///
/// ### Arguments
/// * 'store' - Catalog record store receiving the rows.
/// * 'rows' - Parsed catalog rows in file order.
/// * 'reference_altitude' - Reference satellite altitude used by the pre-screen.
/// * 'rng' - Random source for size estimates and the pre-screen.
///
/// ### Return
///     Number of records created.
///
pub async fn import_catalog<R: Rng + ?Sized>(
    store: &dyn RecordStore<CatalogRecord>,
    rows: Vec<CatalogRow>,
    reference_altitude: f64,
    rng: &mut R,
) -> Result<usize, StoreError> {
    let records: Vec<CatalogRecord> = rows
        .into_iter()
        .take(IMPORT_LIMIT)
        .map(|row| row.into_record(reference_altitude, &mut *rng))
        .collect();

    let mut imported = 0;
    for batch in records.chunks(IMPORT_BATCH_SIZE) {
        imported += store.bulk_create(batch.to_vec()).await?.len();
        info!(imported, total = records.len(), "catalog batch stored");
    }

    Ok(imported)
}

/// Load the reference satellite description, defaults when no file is given.
pub fn read_reference_satellite(path: Option<&PathBuf>) -> Result<ReferenceSatellite, CatalogError> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => Ok(ReferenceSatellite::default()),
    }
}
