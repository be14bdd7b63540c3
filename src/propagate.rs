//! Two-body circular approximation of an object's position from its classical elements.
//!
//! The orbit radius is taken as the semimajor axis and the true anomaly as the mean
//! anomaly, so eccentricity does not enter the position. Kepler's equation is not solved.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{
    bodies::{
        common::{
            earth_centered_to_geodetic, perifocal_to_earth_centered, SECONDS_PER_DAY,
        },
        sim_object::OrbitalElements,
    },
    error::PropagationError,
    types::Array3d,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PropagatedState {
    pub latitude: f64,  // deg
    pub longitude: f64, // deg
    pub altitude: f64,  // km
    pub velocity: f64,  // km/s
}

/// State reported for catalog rows that cannot be propagated.
pub const FALLBACK_STATE: PropagatedState = PropagatedState {
    latitude: 0.0,
    longitude: 0.0,
    altitude: 500.0,
    velocity: 7.5,
};

/// Advance the mean anomaly linearly with mean motion and wrap it into [0, 360).
///
/// ### Arguments
/// * 'mean_anomaly' - Mean anomaly at the reference epoch in degrees.
/// * 'mean_motion' - Mean motion in revolutions per day.
/// * 'elapsed_s' - Seconds since the reference epoch.
///
pub fn advance_mean_anomaly(mean_anomaly: f64, mean_motion: f64, elapsed_s: f64) -> f64 {
    let angular_rate = mean_motion * 360.0 / SECONDS_PER_DAY; // deg/s
    (mean_anomaly + angular_rate * elapsed_s).rem_euclid(360.0)
}

/// Compute the instantaneous geodetic position and orbital speed of an object.
///
/// ### Arguments
/// * 'elements' - Element set of the object.
/// * 'elapsed_s' - Seconds since the session reference epoch.
///
/// ### Return
///     The propagated state, or the reason it could not be computed.
///
pub fn try_propagate(
    elements: &OrbitalElements,
    elapsed_s: f64,
) -> Result<PropagatedState, PropagationError> {
    let mean_motion = elements
        .mean_motion
        .filter(|n| *n != 0.0)
        .ok_or(PropagationError::IncompleteElements("mean_motion"))?;
    let semimajor_axis = elements
        .semimajor_axis
        .filter(|a| *a != 0.0)
        .ok_or(PropagationError::IncompleteElements("semimajor_axis"))?;

    let anomaly = advance_mean_anomaly(elements.mean_anomaly.unwrap_or(0.0), mean_motion, elapsed_s);

    let in_plane = Array3d {
        x: semimajor_axis * cos_deg!(anomaly),
        y: semimajor_axis * sin_deg!(anomaly),
        z: 0.0,
    };
    let coords = perifocal_to_earth_centered(
        &in_plane,
        elements.ra_of_asc_node.unwrap_or(0.0),
        elements.inclination.unwrap_or(0.0),
        elements.arg_of_pericenter.unwrap_or(0.0),
    );
    if !coords.is_finite() {
        return Err(PropagationError::NonFiniteState);
    }

    let llh = earth_centered_to_geodetic(&coords);
    let state = PropagatedState {
        latitude: llh.lat,
        longitude: llh.long,
        altitude: llh.alt,
        velocity: mean_motion * 2.0 * PI * semimajor_axis / SECONDS_PER_DAY,
    };

    if state.latitude.is_finite() && state.longitude.is_finite() && state.velocity.is_finite() {
        Ok(state)
    } else {
        Err(PropagationError::NonFiniteState)
    }
}

/// Same as [`try_propagate`] but degrades to [`FALLBACK_STATE`] on any failure.
pub fn propagate(elements: &OrbitalElements, elapsed_s: f64) -> PropagatedState {
    match try_propagate(elements, elapsed_s) {
        Ok(state) => state,
        Err(err) => {
            tracing::debug!(error = %err, "using fallback state");
            FALLBACK_STATE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn iss_like() -> OrbitalElements {
        OrbitalElements {
            mean_motion: Some(15.5),
            eccentricity: Some(0.0005),
            inclination: Some(51.6),
            ra_of_asc_node: Some(0.0),
            arg_of_pericenter: Some(0.0),
            mean_anomaly: Some(0.0),
            semimajor_axis: Some(6921.0),
        }
    }

    #[test]
    fn test_circular_orbit_at_epoch() {
        let state = propagate(&iss_like(), 0.0);

        assert_abs_diff_eq!(state.altitude, 550.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.latitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.longitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.velocity, 7.8012, epsilon = 1e-3);
    }

    #[test]
    fn test_quarter_orbit_reaches_max_latitude() {
        let elements = iss_like();
        // A quarter revolution at 15.5 rev/day.
        let quarter_s = SECONDS_PER_DAY / 15.5 / 4.0;
        let state = propagate(&elements, quarter_s);

        assert_abs_diff_eq!(state.latitude, 51.6, epsilon = 1e-6);
        assert_abs_diff_eq!(state.altitude, 550.0, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_elements_fall_back() {
        let mut elements = iss_like();
        elements.mean_motion = Some(0.0);
        assert_eq!(
            try_propagate(&elements, 10.0),
            Err(PropagationError::IncompleteElements("mean_motion"))
        );
        assert_eq!(propagate(&elements, 10.0), FALLBACK_STATE);

        let mut elements = iss_like();
        elements.semimajor_axis = None;
        assert_eq!(
            try_propagate(&elements, 10.0),
            Err(PropagationError::IncompleteElements("semimajor_axis"))
        );
        assert_eq!(propagate(&elements, 10.0), FALLBACK_STATE);
    }

    #[test]
    fn test_non_finite_input_falls_back() {
        let mut elements = iss_like();
        elements.inclination = Some(f64::NAN);

        assert_eq!(
            try_propagate(&elements, 0.0),
            Err(PropagationError::NonFiniteState)
        );
        assert_eq!(propagate(&elements, 0.0), FALLBACK_STATE);
    }

    #[test]
    fn test_mean_anomaly_wraps() {
        assert_abs_diff_eq!(advance_mean_anomaly(350.0, 1.0, 8640.0), 26.0, epsilon = 1e-9);
        assert_abs_diff_eq!(advance_mean_anomaly(-30.0, 0.0, 0.0), 330.0, epsilon = 1e-9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_propagate_is_deterministic(
            mean_motion in 0.5f64..17.0,
            inclination in 0.0f64..180.0,
            raan in 0.0f64..360.0,
            arg_pericenter in 0.0f64..360.0,
            mean_anomaly in 0.0f64..360.0,
            semimajor_axis in 6500.0f64..45000.0,
            elapsed_s in 0.0f64..1.0e6,
        ) {
            let elements = OrbitalElements {
                mean_motion: Some(mean_motion),
                eccentricity: Some(0.0),
                inclination: Some(inclination),
                ra_of_asc_node: Some(raan),
                arg_of_pericenter: Some(arg_pericenter),
                mean_anomaly: Some(mean_anomaly),
                semimajor_axis: Some(semimajor_axis),
            };

            let first = propagate(&elements, elapsed_s);
            let second = propagate(&elements, elapsed_s);
            prop_assert_eq!(first, second);

            // Circular approximation keeps altitude constant.
            prop_assert!((first.altitude - (semimajor_axis - 6371.0)).abs() < 1e-6);
            prop_assert!(first.latitude.abs() <= 90.0);
            prop_assert!(first.longitude.abs() <= 180.0);
        }

        #[test]
        fn prop_incomplete_elements_give_fallback(
            mean_anomaly in 0.0f64..360.0,
            semimajor_axis in 6500.0f64..45000.0,
            elapsed_s in 0.0f64..1.0e6,
        ) {
            let no_motion = OrbitalElements {
                mean_motion: Some(0.0),
                mean_anomaly: Some(mean_anomaly),
                semimajor_axis: Some(semimajor_axis),
                ..Default::default()
            };
            prop_assert_eq!(propagate(&no_motion, elapsed_s), FALLBACK_STATE);

            let no_axis = OrbitalElements {
                mean_motion: Some(15.0),
                mean_anomaly: Some(mean_anomaly),
                ..Default::default()
            };
            prop_assert_eq!(propagate(&no_axis, elapsed_s), FALLBACK_STATE);
        }
    }
}
