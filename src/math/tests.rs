use super::geodesy::*;
use super::interpolate::*;

#[test]
fn test_lin_interp() {
    assert_eq!(lin_interp(1.0, 3.0, 0.5), 2.0);
}

#[test]
fn test_linear_interpolation() {
    let result = linear_interpolate(0.0, 0.0, 1.0, 10.0, 0.5);
    assert_eq!(result, 5.0);
}

#[test]
fn test_haversine_distance() {
    let dist = haversine_distance(0.0, 0.0, 0.0, 90.0, 6371000.0);
    assert!((dist - 10007557.0).abs() < 1000.0);
}

#[test]
fn test_bearing_cardinal_directions() {
    assert!((bearing(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
    assert!((bearing(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
    assert!((bearing(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < 1e-9);
    assert!((bearing(0.0, 0.0, 0.0, -1.0) + 90.0).abs() < 1e-9);
}

#[test]
fn test_degrees_nearest_mod() {
    assert!((degrees_nearest_mod(170.0, -180.0) + 190.0).abs() < 1e-12);
    assert!((degrees_nearest_mod(-170.0, 0.0) + 170.0).abs() < 1e-12);
    assert!((degrees_nearest_mod(350.0, 0.0) + 10.0).abs() < 1e-12);
}

#[test]
fn test_cubic_lagrange_is_exact_on_cubics() {
    let f = |x: f64| 2.0 * x.powi(3) - x + 1.0;
    let xs = [0.0, 1.0, 2.0, 3.0];
    let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
    let v = spline_interpolate_1d(&xs, &ys, 1.3).unwrap();
    assert!((v - f(1.3)).abs() < 1e-10);
}

#[test]
fn test_duplicate_abscissae_rejected() {
    assert!(spline_interpolate_1d(&[1.0, 1.0], &[0.0, 2.0], 1.0).is_err());
    assert!(lagrange_interpolate(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], 0.5).is_err());
}

#[test]
fn test_bilinear_on_rows() {
    // f(x, y) = x + 10 y on the unit square
    let rows = vec![
        StencilRow { xs: vec![0.0, 1.0], ys: vec![0.0, 0.0], values: vec![0.0, 1.0] },
        StencilRow { xs: vec![0.0, 1.0], ys: vec![1.0, 1.0], values: vec![10.0, 11.0] },
    ];
    let v = spline_interpolate_2d(&rows, 0.25, 0.5).unwrap();
    assert!((v - 5.25).abs() < 1e-12);
}

#[test]
fn test_find_grid_indices_descending() {
    let lats = [60.0, 30.0, 0.0, -30.0];
    let (i0, i1, w) = find_grid_indices(&lats, 15.0).unwrap();
    assert_eq!((i0, i1), (1, 2));
    assert!((w - 0.5).abs() < 1e-12);
    assert_eq!(find_grid_indices(&lats, 80.0).unwrap(), (0, 0, 0.0));
}

#[test]
fn test_gaussian_latitudes_symmetric() {
    let lats = gaussian_latitudes(8);
    assert_eq!(lats.len(), 8);
    assert!(lats[0] > lats[1]);
    for k in 0..4 {
        assert!((lats[k] + lats[7 - k]).abs() < 1e-10);
    }
    // largest root of P8 is 0.96029
    assert!((lats[0] - 0.960_289_856_5_f64.asin().to_degrees()).abs() < 1e-6);
}

#[test]
fn test_pole_rotation_round_trip() {
    let pole = (10.0, 45.0);
    let (rlon, rlat) = rotate_to_pole(20.0, 50.0, pole);
    let (lon, lat) = rotate_from_pole(rlon, rlat, pole);
    assert!((lon - 20.0).abs() < 1e-9);
    assert!((lat - 50.0).abs() < 1e-9);
    // the pole itself maps to the rotated north pole
    let (_, plat) = rotate_to_pole(pole.0, pole.1, pole);
    assert!((plat - 90.0).abs() < 1e-9);
}

#[test]
fn test_compass_direction_sectors() {
    assert_eq!(compass_direction(0.0), "N");
    assert_eq!(compass_direction(45.0), "NE");
    assert_eq!(compass_direction(-100.0), "W");
    assert_eq!(compass_direction(170.0), "S");
    assert_eq!(compass_direction(-170.0), "S");
    assert_eq!(compass_direction(-135.0), "SW");
}
