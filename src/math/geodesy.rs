use std::f64::consts::PI;

/// Convert wind components from grid-relative to earth-relative.
///
/// `rotation_angle` (radians) is counterclockwise from the grid axes to the
/// earth axes.
pub fn grid_to_earth_wind(u_grid: f64, v_grid: f64, rotation_angle: f64) -> (f64, f64) {
    let cos_rot = rotation_angle.cos();
    let sin_rot = rotation_angle.sin();

    let u_earth = u_grid * cos_rot - v_grid * sin_rot;
    let v_earth = u_grid * sin_rot + v_grid * cos_rot;

    (u_earth, v_earth)
}

/// Calculate distance between two geographic points (Haversine formula)
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, earth_radius: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();

    let a =
        (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.min(1.0).sqrt().asin();

    earth_radius * c
}

/// Initial bearing from point 1 to point 2, degrees clockwise from north in
/// (-180, 180].
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlon_rad = (lon2 - lon1).to_radians();

    let y = dlon_rad.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlon_rad.cos();

    let b = y.atan2(x).to_degrees();
    if b <= -180.0 {
        b + 360.0
    } else {
        b
    }
}

/// `angle` shifted by a multiple of 360 into [reference - 180, reference + 180).
pub fn degrees_nearest_mod(angle: f64, reference: f64) -> f64 {
    angle - 360.0 * ((angle - reference + 180.0) / 360.0).floor()
}

/// Point on the sphere of radius `radius` as cartesian coordinates.
pub fn lonlat_to_xyz(lon: f64, lat: f64, radius: f64) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [
        radius * lat.cos() * lon.cos(),
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
    ]
}

/// Great circle distance matching a chord of length `chord`.
pub fn chord_to_arc(chord: f64, radius: f64) -> f64 {
    2.0 * radius * (chord / (2.0 * radius)).min(1.0).asin()
}

fn xyz_to_lonlat(xyz: [f64; 3]) -> (f64, f64) {
    let lat = xyz[2].clamp(-1.0, 1.0).asin().to_degrees();
    let lon = xyz[1].atan2(xyz[0]).to_degrees();
    (lon, lat)
}

fn rotate_z(xyz: [f64; 3], angle: f64) -> [f64; 3] {
    let (s, c) = angle.sin_cos();
    [c * xyz[0] - s * xyz[1], s * xyz[0] + c * xyz[1], xyz[2]]
}

fn rotate_y(xyz: [f64; 3], angle: f64) -> [f64; 3] {
    let (s, c) = angle.sin_cos();
    [c * xyz[0] + s * xyz[2], xyz[1], -s * xyz[0] + c * xyz[2]]
}

/// Geographic (lon, lat) to coordinates in a frame whose north pole lies at
/// geographic `pole` = (lon, lat).
pub fn rotate_to_pole(lon: f64, lat: f64, pole: (f64, f64)) -> (f64, f64) {
    let xyz = lonlat_to_xyz(lon, lat, 1.0);
    let xyz = rotate_z(xyz, -pole.0.to_radians());
    let xyz = rotate_y(xyz, (pole.1 - 90.0).to_radians());
    xyz_to_lonlat(xyz)
}

/// Inverse of [`rotate_to_pole`].
pub fn rotate_from_pole(rlon: f64, rlat: f64, pole: (f64, f64)) -> (f64, f64) {
    let xyz = lonlat_to_xyz(rlon, rlat, 1.0);
    let xyz = rotate_y(xyz, (90.0 - pole.1).to_radians());
    let xyz = rotate_z(xyz, pole.0.to_radians());
    xyz_to_lonlat(xyz)
}

/// Legendre polynomial P_n and its derivative at x.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// Gaussian latitudes (degrees) of a grid with `n` latitudes, north to south.
pub fn gaussian_latitudes(n: usize) -> Vec<f64> {
    (1..=n)
        .map(|k| {
            let mut x = (PI * (k as f64 - 0.25) / (n as f64 + 0.5)).cos();
            for _ in 0..100 {
                let (p, dp) = legendre(n, x);
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    break;
                }
            }
            x.asin().to_degrees()
        })
        .collect()
}

/// 8-point compass label of an azimuth (degrees clockwise from north), with
/// 45° sectors centered on each direction.
pub fn compass_direction(azimuth: f64) -> &'static str {
    let a = degrees_nearest_mod(azimuth, 0.0);
    if a > -22.5 && a <= 22.5 {
        "N"
    } else if a > 22.5 && a <= 67.5 {
        "NE"
    } else if a > 67.5 && a <= 112.5 {
        "E"
    } else if a > 112.5 && a <= 157.5 {
        "SE"
    } else if a > -67.5 && a <= -22.5 {
        "NW"
    } else if a > -112.5 && a <= -67.5 {
        "W"
    } else if a > -157.5 && a <= -112.5 {
        "SW"
    } else {
        "S"
    }
}
