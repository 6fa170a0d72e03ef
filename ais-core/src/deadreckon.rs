//! Dead reckoning: project a position from a fix, speed and course over time.
//!
//! Two projection modes:
//! - Flat earth: short offsets (< 100 km). Degrees of latitude are ~111 km;
//!   degrees of longitude shrink with cos(latitude).
//! - Great circle: the direct solution on a sphere of radius 6371 km.
//!
//! Key constants:
//! - 1 knot = 1.852 km/h
//! - KM_PER_DEGREE = 111.0
//! - EARTH_RADIUS_KM = 6371.0

/// Mean Earth radius used by the great-circle projection.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree for the flat-earth projection.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Kilometres per nautical mile.
pub const KM_PER_NM: f64 = 1.852;

/// Offsets shorter than this use the flat-earth projection.
pub const FLAT_EARTH_LIMIT_KM: f64 = 100.0;

/// Distance covered at `speed_kts` over `elapsed_secs`, in kilometres.
pub fn distance_km(speed_kts: f64, elapsed_secs: f64) -> f64 {
    speed_kts * KM_PER_NM / 3600.0 * elapsed_secs
}

/// Project a new `(lat, lon)` from a known fix.
///
/// `course_deg` is true course, 0 = north, clockwise. `elapsed_secs` must be
/// positive; callers check this before projecting.
pub fn estimate(lat: f64, lon: f64, speed_kts: f64, course_deg: f64, elapsed_secs: f64) -> (f64, f64) {
    estimate_with_limit(
        lat,
        lon,
        speed_kts,
        course_deg,
        elapsed_secs,
        FLAT_EARTH_LIMIT_KM,
    )
}

/// Same as [`estimate`], with a configurable flat-earth cutoff.
///
/// A flat-earth result past either pole is replaced by the great-circle one.
pub fn estimate_with_limit(
    lat: f64,
    lon: f64,
    speed_kts: f64,
    course_deg: f64,
    elapsed_secs: f64,
    flat_earth_limit_km: f64,
) -> (f64, f64) {
    let distance = distance_km(speed_kts, elapsed_secs);
    let flat = (distance < flat_earth_limit_km)
        .then(|| flat_earth(lat, lon, distance, course_deg))
        // The flat projection has no notion of the pole
        .filter(|(new_lat, _)| new_lat.abs() <= 90.0);
    let (new_lat, new_lon) =
        flat.unwrap_or_else(|| great_circle(lat, lon, distance, course_deg));
    (new_lat, wrap_longitude(new_lon))
}

/// Flat-earth offset of `distance_km` along `course_deg`.
pub fn flat_earth(lat: f64, lon: f64, distance_km: f64, course_deg: f64) -> (f64, f64) {
    let course = course_deg.to_radians();
    let dlat = distance_km * course.cos() / KM_PER_DEGREE;
    let dlon = distance_km * course.sin() / (KM_PER_DEGREE * lat.to_radians().cos());
    (lat + dlat, lon + dlon)
}

/// Great-circle destination `distance_km` away along initial bearing `course_deg`.
pub fn great_circle(lat: f64, lon: f64, distance_km: f64, course_deg: f64) -> (f64, f64) {
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let bearing = course_deg.to_radians();
    let angular = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Normalize longitude into (-180, 180].
pub fn wrap_longitude(lon: f64) -> f64 {
    if lon > -180.0 && lon <= 180.0 {
        return lon;
    }
    let wrapped = 180.0 - (180.0 - lon).rem_euclid(360.0);
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
