use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::common::MINUTES_PER_DAY;
use crate::{
    output,
    propagate::{self, PropagatedState},
    store::Record,
    threat::{ThreatAssessment, ThreatLevel},
};

#[derive(Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectClass {
    Satellite,
    Debris,
    RocketBody,
    #[default]
    Unknown,
}

/// Classical element set as ingested from the catalog. Never mutated after ingestion.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OrbitalElements {
    pub mean_motion: Option<f64>, // rev/day
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,       // deg
    pub ra_of_asc_node: Option<f64>,    // deg
    pub arg_of_pericenter: Option<f64>, // deg
    pub mean_anomaly: Option<f64>,      // deg
    pub semimajor_axis: Option<f64>,    // km
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DerivedElements {
    pub semimajor_axis: Option<f64>, // km
    pub period: Option<f64>,         // min
    pub apoapsis: Option<f64>,       // km
    pub periapsis: Option<f64>,      // km
}

/// Persisted catalog row, the form exchanged with the record store.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    pub name: String,
    pub norad_cat_id: Option<String>,
    pub object_type: ObjectClass,
    pub mean_motion: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub ra_of_asc_node: Option<f64>,
    pub arg_of_pericenter: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub epoch: Option<String>,
    pub semimajor_axis: Option<f64>,
    pub period: Option<f64>,
    pub apoapsis: Option<f64>,
    pub periapsis: Option<f64>,
    pub size: Option<f64>,
    /// Coarse screening level assigned at import, used only for catalog ordering.
    #[serde(default)]
    pub threat_level: ThreatLevel,
}

impl Record for CatalogRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, created_date: DateTime<Utc>) {
        self.id = id;
        self.created_date = Some(created_date);
    }

    fn severity(&self) -> Option<ThreatLevel> {
        Some(self.threat_level)
    }
}

/// A tracked object: identity and elements fixed at ingestion, `state` and `threat`
/// replaced on every tick.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrbitalObject {
    pub id: String,
    pub catalog_id: Option<String>,
    pub name: String,
    pub class: ObjectClass,
    pub epoch: Option<String>,
    pub size: f64, // m
    elements: OrbitalElements,
    derived: DerivedElements,
    pub state: PropagatedState,
    pub threat: ThreatAssessment,
}

impl OrbitalObject {
    pub fn from_record(record: &CatalogRecord) -> Self {
        let period = record.period.or_else(|| {
            record
                .mean_motion
                .filter(|n| *n > 0.0)
                .map(|n| MINUTES_PER_DAY / n)
        });

        OrbitalObject {
            id: record.id.clone(),
            catalog_id: record.norad_cat_id.clone(),
            name: record.name.clone(),
            class: record.object_type,
            epoch: record.epoch.clone(),
            size: record.size.unwrap_or(1.0),
            elements: OrbitalElements {
                mean_motion: record.mean_motion,
                eccentricity: record.eccentricity,
                inclination: record.inclination,
                ra_of_asc_node: record.ra_of_asc_node,
                arg_of_pericenter: record.arg_of_pericenter,
                mean_anomaly: record.mean_anomaly,
                semimajor_axis: record.semimajor_axis,
            },
            derived: DerivedElements {
                semimajor_axis: record.semimajor_axis,
                period,
                apoapsis: record.apoapsis,
                periapsis: record.periapsis,
            },
            state: propagate::FALLBACK_STATE,
            threat: ThreatAssessment::default(),
        }
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    pub fn is_threat(&self) -> bool {
        self.threat.level != ThreatLevel::None
    }

    pub fn to_output_form(&self, sim_time: f64) -> output::ObjectStateOut {
        output::ObjectStateOut {
            sim_time,
            id: self.id.clone(),
            name: self.name.clone(),
            class: self.class.to_string(),
            lat: self.state.latitude,
            long: self.state.longitude,
            altitude: self.state.altitude,
            velocity: self.state.velocity,
            threat_level: self.threat.level.to_string(),
            collision_probability: self.threat.collision_probability,
            time_to_impact: self.threat.time_to_impact,
            period: self.derived.period,
        }
    }
}

/// The protected satellite every catalog object is assessed against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReferenceSatellite {
    pub name: String,
    pub altitude: f64, // km
    pub velocity: f64, // km/s
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for ReferenceSatellite {
    fn default() -> Self {
        Self {
            name: "NOVA-SAT-01".to_string(),
            altitude: 550.0,
            velocity: 7.5,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}
