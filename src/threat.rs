use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    bodies::sim_object::{OrbitalObject, ReferenceSatellite},
    propagate::PropagatedState,
};

/// Threat tiers in severity order, most severe first. `None` sorts last and is never
/// part of a ranked list.
#[derive(
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreatLevel {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreatAssessment {
    pub level: ThreatLevel,
    pub collision_probability: f64,
    /// Hours, present iff `level` is not `None`.
    pub time_to_impact: Option<f64>,
}

/// Distance tier: exclusive upper bound on the reference distance, followed by the
/// probability band and time-to-impact band (hours) drawn from when inside it.
struct Tier {
    level: ThreatLevel,
    max_distance: f64,
    probability: (f64, f64),
    time_to_impact: (f64, f64),
}

const TIERS: [Tier; 4] = [
    Tier {
        level: ThreatLevel::Critical,
        max_distance: 50.0,
        probability: (0.10, 0.15),
        time_to_impact: (2.0, 6.0),
    },
    Tier {
        level: ThreatLevel::High,
        max_distance: 100.0,
        probability: (0.05, 0.10),
        time_to_impact: (6.0, 12.0),
    },
    Tier {
        level: ThreatLevel::Medium,
        max_distance: 200.0,
        probability: (0.02, 0.05),
        time_to_impact: (12.0, 24.0),
    },
    Tier {
        level: ThreatLevel::Low,
        max_distance: 300.0,
        probability: (0.01, 0.02),
        time_to_impact: (24.0, 48.0),
    },
];

/// Zone distance between an object and the reference satellite. Mixes kilometers of
/// altitude with degrees of latitude and longitude; the tier thresholds are tuned
/// against exactly this metric.
pub fn reference_distance(state: &PropagatedState, reference: &ReferenceSatellite) -> f64 {
    let alt_diff = state.altitude - reference.altitude;
    let lat_diff = state.latitude - reference.latitude;
    let long_diff = state.longitude - reference.longitude;

    (alt_diff.powi(2) + lat_diff.powi(2) + long_diff.powi(2)).sqrt()
}

/// Threat level for a reference distance. NaN distances classify as `None`.
pub fn classify(distance: f64) -> ThreatLevel {
    TIERS
        .iter()
        .find(|tier| in_range!(0.0, tier.max_distance, distance))
        .map_or(ThreatLevel::None, |tier| tier.level)
}

/// Assess an object's threat to the reference satellite. Probability and time-to-impact
/// are drawn afresh from the tier's bands on every call.
///
/// ### Arguments
/// * 'state' - Propagated state of the object.
/// * 'reference' - The protected satellite.
/// * 'rng' - Random source for the probability and time-to-impact draws.
///
pub fn assess<R: Rng + ?Sized>(
    state: &PropagatedState,
    reference: &ReferenceSatellite,
    rng: &mut R,
) -> ThreatAssessment {
    let level = classify(reference_distance(state, reference));

    match TIERS.iter().find(|tier| tier.level == level) {
        Some(tier) => ThreatAssessment {
            level: tier.level,
            collision_probability: rng.gen_range(tier.probability.0..tier.probability.1),
            time_to_impact: Some(rng.gen_range(tier.time_to_impact.0..tier.time_to_impact.1)),
        },
        None => ThreatAssessment::default(),
    }
}

/// Objects with an active threat, most severe first, at most `count` of them. Objects of
/// equal severity keep their catalog order.
pub fn rank_threats(objects: &[OrbitalObject], count: usize) -> Vec<OrbitalObject> {
    let mut threats: Vec<&OrbitalObject> = objects.iter().filter(|o| o.is_threat()).collect();
    // sort_by_key is stable
    threats.sort_by_key(|o| o.threat.level);

    threats.into_iter().take(count).cloned().collect()
}
