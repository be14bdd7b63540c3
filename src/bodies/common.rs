use crate::types::{l2_norm, Array3d, LLH};

/// Mean Earth radius used for altitude, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Rotate an in-plane (perifocal) position into the Earth-centered frame by applying
/// argument of pericenter, inclination and right ascension of the ascending node.
///
/// ### Arguments
/// * 'perifocal' - Position in the perifocal frame, the orbital plane being z = 0.
/// * 'raan' - Right ascension of the ascending node in degrees.
/// * 'inclination' - Inclination in degrees.
/// * 'arg_pericenter' - Argument of pericenter in degrees.
///
/// ### Return
///     The position expressed in the Earth-centered frame.
///
pub fn perifocal_to_earth_centered(
    perifocal: &Array3d,
    raan: f64,
    inclination: f64,
    arg_pericenter: f64,
) -> Array3d {
    let (sin_o, cos_o) = (sin_deg!(raan), cos_deg!(raan));
    let (sin_i, cos_i) = (sin_deg!(inclination), cos_deg!(inclination));
    let (sin_w, cos_w) = (sin_deg!(arg_pericenter), cos_deg!(arg_pericenter));

    // Columns of Rz(raan) * Rx(inclination) * Rz(arg_pericenter), the perifocal axes
    let p_axis = Array3d {
        x: cos_o * cos_w - sin_o * cos_i * sin_w,
        y: sin_o * cos_w + cos_o * cos_i * sin_w,
        z: sin_i * sin_w,
    };
    let q_axis = Array3d {
        x: -cos_o * sin_w - sin_o * cos_i * cos_w,
        y: -sin_o * sin_w + cos_o * cos_i * cos_w,
        z: sin_i * cos_w,
    };
    let w_axis = Array3d {
        x: sin_o * sin_i,
        y: -cos_o * sin_i,
        z: cos_i,
    };

    p_axis * perifocal.x + q_axis * perifocal.y + w_axis * perifocal.z
}

/// Spherical geodetic coordinates of an Earth-centered position. No Earth rotation is
/// applied, longitude is measured in the same frame as the position.
///
/// ### Arguments
/// * 'coords' - Earth-centered position in kilometers.
///
/// ### Return
///     LLH with latitude and longitude in degrees and altitude above the mean radius in km.
///
pub fn earth_centered_to_geodetic(coords: &Array3d) -> LLH {
    let r = l2_norm(coords);

    LLH {
        lat: asin_deg!((coords.z / r).clamp(-1.0, 1.0)),
        long: atan2_deg!(coords.y, coords.x),
        alt: r - EARTH_RADIUS_KM,
    }
}
