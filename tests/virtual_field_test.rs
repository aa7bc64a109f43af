mod common;

use common::{field_from_fn, regll_geometry};
use meteofield::data_io::WhatOptions;
use meteofield::field::{IjQuery, LevelSelector, LlQuery, LonLatBox};
use meteofield::resource::{InMemoryResource, Resource};
use meteofield::{CommonField, D3Field, Fid, Structure, VirtualField};
use std::sync::Arc;

fn level_field(name: &str, level: f64, nx: usize) -> D3Field {
    let geometry = regll_geometry(0.0, 40.0, 1.0, nx, 4, &[level]);
    field_from_fn(name, geometry, 2, move |t, _, j, i| level + (100 * t + 10 * j + i) as f64)
}

fn fieldset() -> Vec<D3Field> {
    vec![
        level_field("T850", 850.0, 5),
        level_field("T500", 500.0, 5),
        level_field("T700", 700.0, 5),
    ]
}

#[test]
fn test_virtual_field_behaves_like_stacked_field() {
    let vf = VirtualField::from_fieldset(Fid::with("memory", "T"), fieldset()).unwrap();
    assert_eq!(vf.structure(), Structure::D3);
    assert_eq!(vf.validity().len(), 2);
    assert_eq!(vf.getdata(None, true).unwrap().shape(), &[2, 3, 4, 5]);
    assert_eq!(vf.getdata(None, false).unwrap().shape(), &[2, 3, 4, 5]);

    let real = vf.as_real_field().unwrap();
    assert_eq!(real.fid(), &Fid::with("memory", "T"));
    assert_eq!(real.geometry(), vf.geometry());
    let data = real.data4d(None).unwrap();
    assert_eq!(data[[1, 0, 2, 3]], 500.0 + 123.0);
    assert_eq!(data[[0, 2, 0, 0]], 850.0);

    let values = vf
        .getvalue_ij(&IjQuery::new().i(3).j(2).k(1).t(1), true)
        .unwrap();
    assert_eq!(values.as_scalar(), Some(700.0 + 123.0));

    let at = vf
        .getvalue_ll(&LlQuery::point(2.0, 41.0).level(850.0).validity(vf.validity().iter().next().unwrap().clone()))
        .unwrap();
    assert_eq!(at.values.as_scalar(), Some(850.0 + 12.0));

    let zoomed = vf.extract_zoom(&LonLatBox::new(1.0, 2.0, 41.0, 42.0), false).unwrap();
    assert_eq!(zoomed.data4d(None).unwrap().dim(), (2, 3, 2, 2));
    assert_eq!(vf.min(None).unwrap(), 500.0);
    assert_eq!(vf.getlevel(LevelSelector::Index(2)).unwrap().fid(), &Fid::with("memory", "T850"));
}

#[test]
fn test_virtual_field_rejects_inconsistent_constituents() {
    let duplicated = vec![level_field("A", 500.0, 5), level_field("B", 500.0, 5)];
    assert!(VirtualField::from_fieldset(Fid::new(), duplicated).is_err());

    let other_dims = vec![level_field("A", 500.0, 5), level_field("B", 850.0, 6)];
    assert!(VirtualField::from_fieldset(Fid::new(), other_dims).is_err());

    let multi_level = field_from_fn(
        "M",
        regll_geometry(0.0, 40.0, 1.0, 5, 4, &[300.0, 400.0]),
        2,
        |_, _, _, _| 0.0,
    );
    assert!(VirtualField::from_fieldset(Fid::new(), vec![level_field("A", 500.0, 5), multi_level]).is_err());

    let one_step = field_from_fn("C", regll_geometry(0.0, 40.0, 1.0, 5, 4, &[300.0]), 1, |_, _, _, _| 0.0);
    assert!(VirtualField::from_fieldset(Fid::new(), vec![level_field("A", 500.0, 5), one_step]).is_err());

    assert!(VirtualField::from_fieldset(Fid::new(), Vec::new()).is_err());
}

#[test]
fn test_virtual_field_reads_levels_on_demand() {
    let mut resource = InMemoryResource::new("memory");
    for field in fieldset() {
        resource.writefield(&field).unwrap();
    }
    resource.writefield(&level_field("U850", 850.0, 5)).unwrap();
    assert_eq!(resource.len(), 4);
    let resource: Arc<dyn Resource> = Arc::new(resource);

    let vf = VirtualField::from_resource(Fid::with("memory", "T"), resource, &[Fid::with("memory", "T*")]).unwrap();
    assert_eq!(vf.fids().len(), 3);
    assert_eq!(vf.geometry().vcoordinate.scalar_levels(), Some(vec![500.0, 700.0, 850.0]));
    let level = vf.getlevel(LevelSelector::Level(700.0)).unwrap();
    assert!(level.has_data());
    assert_eq!(level.max(None).unwrap(), 700.0 + 134.0);
}

#[test]
fn test_what_describes_virtual_field() {
    let vf = VirtualField::from_fieldset(Fid::with("memory", "T"), fieldset()).unwrap();
    let mut out = Vec::new();
    vf.what(&mut out, &WhatOptions::default()).unwrap();
    let text = String::from_utf8(out).unwrap();
    for section in ["VALIDITY", "HORIZONTAL GEOMETRY", "VERTICAL GEOMETRY", "SPECTRAL GEOMETRY", "FIELD", "STATISTICS"] {
        assert!(text.contains(section), "missing section {}", section);
    }
    assert!(text.contains("Structure: 3D"));
    assert!(text.contains("Dimensions: X=5 Y=4"));
    assert!(text.contains("Levels: 500, 700, 850"));
    assert!(text.contains("Gridpoint field"));

    let mut short = Vec::new();
    let options = WhatOptions {
        vertical_geometry: false,
        stats: false,
        ..WhatOptions::default()
    };
    vf.what(&mut short, &options).unwrap();
    let text = String::from_utf8(short).unwrap();
    assert!(!text.contains("VERTICAL GEOMETRY"));
    assert!(!text.contains("STATISTICS"));
}
