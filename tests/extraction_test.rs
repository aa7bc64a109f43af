mod common;

use common::{field_from_fn, regll_geometry, ten_by_ten, EPS};
use meteofield::field::{
    make_vector_field, ExternalDistance, Interpolation, LlQuery, LonLatBox, ResampleOptions,
    SubdomainOptions, Weighting,
};
use meteofield::geometry::{HorizontalPosition, UnstructuredGrid, VCoordinate};
use meteofield::{CommonField, FieldError, Geometry, Grid, Structure};
use std::sync::Arc;

fn point_geometry(lon: f64, lat: f64) -> Geometry {
    Geometry::new(
        Structure::Point,
        Grid::Unstructured(UnstructuredGrid::point(lon, lat)),
        VCoordinate::unspecified(),
    )
    .unwrap()
}

fn three_levels() -> meteofield::D3Field {
    let geometry = regll_geometry(0.0, 40.0, 1.0, 10, 10, &[500.0, 700.0, 850.0]);
    field_from_fn("T", geometry, 1, |_, k, j, i| (1000 * k + 100 * j + i) as f64)
}

#[test]
fn test_extract_point_nearest_with_comment() {
    let field = ten_by_ten();
    let point = field
        .extract_subdomain(&point_geometry(3.2, 45.1), &SubdomainOptions::default())
        .unwrap();
    assert_eq!(point.structure(), Structure::Point);
    assert_eq!(point.getdata(None, true).unwrap().shape(), &[1, 1, 1, 1]);
    assert_eq!(point.getdata(None, true).unwrap()[[0, 0, 0, 0]], 503.0);
    let comment = point.comment().unwrap();
    assert!(comment.starts_with("Profile @ "));
    assert!(comment.contains("nearest gridpoint: (3.0000, 45.0000)"), "{}", comment);
    assert_eq!(point.fid(), field.fid());
}

#[test]
fn test_extract_point_linear_is_exact_on_a_plane() {
    let field = ten_by_ten();
    let options = SubdomainOptions::default().interpolation(Interpolation::Linear);
    let point = field.extract_subdomain(&point_geometry(3.2, 45.1), &options).unwrap();
    let value = point.getdata(None, true).unwrap()[[0, 0, 0, 0]];
    assert!((value - 513.2).abs() < 1e-8, "{}", value);
    assert!(point.comment().unwrap().contains("linearly interpolated"));

    let metadata_only = field
        .extract_subdomain(&point_geometry(3.2, 45.1), &options.getdata(false))
        .unwrap();
    assert!(!metadata_only.has_data());
}

#[test]
fn test_extract_out_of_domain() {
    let field = ten_by_ten();
    let result = field.extract_subdomain(&point_geometry(20.0, 45.0), &SubdomainOptions::default());
    assert!(matches!(result, Err(FieldError::OutOfDomain { .. })));
}

#[test]
fn test_external_distance_selects_among_nearest_points() {
    let field = ten_by_ten();
    let orography = field_from_fn("OROG", regll_geometry(0.0, 40.0, 1.0, 10, 10, &[0.0]), 1, |_, _, j, i| {
        if (i, j) == (4, 6) {
            7.0
        } else {
            0.0
        }
    });
    let external = ExternalDistance {
        field: &orography,
        target_value: 7.0,
    };

    let plain = field
        .extract_subdomain(&point_geometry(3.4, 45.4), &SubdomainOptions::default())
        .unwrap();
    assert_eq!(plain.getdata(None, true).unwrap()[[0, 0, 0, 0]], 503.0);

    let options = SubdomainOptions::default().external_distance(external);
    let point = field.extract_subdomain(&point_geometry(3.4, 45.4), &options).unwrap();
    assert_eq!(point.getdata(None, true).unwrap()[[0, 0, 0, 0]], 604.0);
    assert!(point.comment().unwrap().contains("(4.0000, 46.0000)"), "{}", point.comment().unwrap());

    let looked_up = field
        .getvalue_ll(&LlQuery::point(3.4, 45.4).external_distance(external))
        .unwrap();
    assert_eq!(looked_up.values.as_scalar(), Some(604.0));

    // outside the 4 nearest points, the target value is not reachable
    let far = field
        .getvalue_ll(&LlQuery::point(1.4, 41.4).external_distance(external))
        .unwrap();
    assert_eq!(far.values.as_scalar(), Some(101.0));

    let small = field_from_fn("OROG", regll_geometry(0.0, 40.0, 1.0, 5, 5, &[0.0]), 1, |_, _, _, _| 0.0);
    let mismatched = ExternalDistance {
        field: &small,
        target_value: 0.0,
    };
    assert!(field
        .getvalue_ll(&LlQuery::point(3.4, 45.4).external_distance(mismatched))
        .is_err());
}

#[test]
fn test_extract_profile_and_vertical_rules() {
    let field = three_levels();
    let profile = field
        .extract_subdomain(&point_geometry(2.0, 41.0), &SubdomainOptions::default())
        .unwrap();
    assert_eq!(profile.structure(), Structure::V1D);
    let column: Vec<f64> = profile.getdata(None, false).unwrap().iter().copied().collect();
    assert_eq!(column, vec![102.0, 1102.0, 2102.0]);

    let mut one_level = point_geometry(2.0, 41.0);
    one_level.vcoordinate = VCoordinate::new(100, vec![700.0]);
    let level = field.extract_subdomain(&one_level, &SubdomainOptions::default()).unwrap();
    assert_eq!(level.structure(), Structure::Point);
    assert_eq!(level.getdata(None, true).unwrap()[[0, 0, 0, 0]], 1102.0);

    let mut missing_level = point_geometry(2.0, 41.0);
    missing_level.vcoordinate = VCoordinate::new(100, vec![600.0]);
    assert!(field.extract_subdomain(&missing_level, &SubdomainOptions::default()).is_err());

    let mut other_kind = point_geometry(2.0, 41.0);
    other_kind.vcoordinate = VCoordinate::new(105, Vec::new());
    assert!(field.extract_subdomain(&other_kind, &SubdomainOptions::default()).is_err());

    let staggered = point_geometry(2.0, 41.0).with_position(HorizontalPosition::LowerLeft);
    assert!(field.extract_subdomain(&staggered, &SubdomainOptions::default()).is_err());
}

#[test]
fn test_zoom_across_global_seam() {
    let geometry = regll_geometry(0.0, 0.0, 30.0, 12, 3, &[850.0]);
    let field = field_from_fn("Z", geometry, 1, |_, _, j, i| (100 * j + i) as f64);
    let zoomed = field
        .extract_zoom(&LonLatBox::new(-40.0, 40.0, 0.0, 30.0), false)
        .unwrap();
    let dims = zoomed.geometry().dimensions();
    assert_eq!((dims.x, dims.y), (3, 2));
    match &zoomed.geometry().grid {
        Grid::RegularLonLat(g) => assert!((g.input_lon + 30.0).abs() < EPS),
        other => panic!("unexpected grid {:?}", other),
    }
    let data = zoomed.data4d(None).unwrap();
    assert_eq!(data.slice(ndarray::s![0, 0, 0, ..]).to_vec(), vec![11.0, 0.0, 1.0]);
    assert_eq!(data.slice(ndarray::s![0, 0, 1, ..]).to_vec(), vec![111.0, 100.0, 101.0]);
}

#[test]
fn test_zoom_on_unstructured_points() {
    let lons = vec![0.0, 1.0, 2.0, 3.0, 4.0];
    let lats = vec![45.0, 46.0, 47.0, 48.0, 49.0];
    let grid = Grid::Unstructured(UnstructuredGrid::new(lons, lats).unwrap());
    let geometry = Geometry::new(Structure::H2D, grid, VCoordinate::new(100, vec![850.0])).unwrap();
    let field = field_from_fn("P", geometry, 1, |_, _, _, i| i as f64 * 10.0);
    let zoomed = field
        .extract_zoom(&LonLatBox::new(0.5, 3.5, 40.0, 50.0), false)
        .unwrap();
    let dims = zoomed.geometry().dimensions();
    assert_eq!((dims.x, dims.y), (3, 1));
    assert_eq!(zoomed.data4d(None).unwrap().iter().copied().collect::<Vec<_>>(), vec![10.0, 20.0, 30.0]);
    assert!(field.extract_zoom(&LonLatBox::new(10.0, 20.0, 0.0, 10.0), false).is_err());
}

#[test]
fn test_resample_nearest_on_shifted_grid() {
    let field = ten_by_ten();
    let target = regll_geometry(2.0, 43.0, 1.0, 3, 2, &[850.0]);
    let resampled = field.resample(&target, &ResampleOptions::default()).unwrap();
    assert!(resampled.stddev.is_none());
    let data = resampled.field.data4d(None).unwrap();
    assert_eq!(data.dim(), (1, 1, 2, 3));
    assert_eq!(data[[0, 0, 0, 0]], 302.0);
    assert_eq!(data[[0, 0, 1, 2]], 404.0);

    let on_regularll = field
        .resample_on_regularll(&LonLatBox::new(2.0, 4.0, 43.0, 44.0), 1.0, &ResampleOptions::default())
        .unwrap();
    assert_eq!(on_regularll.field.data4d(None).unwrap(), data);
}

#[test]
fn test_resample_gauss_with_uncertainty() {
    let geometry = regll_geometry(0.0, 40.0, 1.0, 10, 10, &[850.0]);
    let constant = field_from_fn("C", geometry, 1, |_, _, _, _| 5.0);
    let target = regll_geometry(3.5, 44.5, 1.0, 2, 2, &[850.0]);
    let options = ResampleOptions::default()
        .weighting(Weighting::Gauss { sigma: None })
        .with_uncert(true);
    let resampled = constant.resample(&target, &options).unwrap();
    let values = resampled.field.data4d(None).unwrap();
    assert!(values.iter().all(|v| (v - 5.0).abs() < 1e-9));
    let stddev = resampled.stddev.unwrap();
    assert!(stddev.data4d(None).unwrap().iter().all(|v| v.abs() < 1e-9));
    let counts = resampled.counts.unwrap();
    assert!(counts.data4d(None).unwrap().iter().all(|&c| c >= 4.0));
    assert_eq!(
        counts.fid().generic("resample"),
        Some(&meteofield::FidValue::Text("counts".to_string()))
    );
}

#[test]
fn test_resample_reuses_neighbour_info() {
    let field = ten_by_ten();
    let target = regll_geometry(2.0, 43.0, 1.0, 3, 2, &[850.0]);
    let options = ResampleOptions::default();
    let info = Arc::new(field.neighbour_info(&target, &options).unwrap());
    assert_eq!(info.target_points_number(), 6);
    assert_eq!(info.orphans(), 0);
    let neighbours = info.neighbours_of(0, 0).unwrap();
    assert_eq!(neighbours[0].0, (2, 3));
    assert!(neighbours[0].1 < 1.0);

    let doubled = (&field * 2.0).unwrap();
    let reused = doubled
        .resample(&target, &options.clone().neighbour_info(info.clone()))
        .unwrap();
    assert_eq!(reused.field.data4d(None).unwrap()[[0, 0, 0, 0]], 604.0);

    let other_target = regll_geometry(2.0, 43.0, 1.0, 4, 2, &[850.0]);
    assert!(field
        .resample(&other_target, &options.neighbour_info(info))
        .is_err());
}

#[test]
fn test_vector_resample_shares_neighbours() {
    let u = ten_by_ten();
    let mut v = (&u * -1.0).unwrap();
    v.set_fid(meteofield::Fid::with("memory", "V850"));
    v.set_validity(u.validity().clone()).unwrap();
    let wind = make_vector_field(u, v).unwrap();
    let target = regll_geometry(2.0, 43.0, 1.0, 3, 2, &[850.0]);
    let resampled = wind.resample(&target, &ResampleOptions::default()).unwrap();
    let components = resampled.components();
    assert_eq!(components[0].data4d(None).unwrap()[[0, 0, 1, 1]], 403.0);
    assert_eq!(components[1].data4d(None).unwrap()[[0, 0, 1, 1]], -403.0);
}
