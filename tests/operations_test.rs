mod common;

use common::{academic_field, fourier_geometry, regll_geometry, field_from_fn, hourly_validities, EPS};
use meteofield::field::{make_vector_field, Operand, Operator};
use meteofield::{CommonField, Fid};

fn two_step_field(name: &str, offset: f64) -> meteofield::D3Field {
    let geometry = regll_geometry(0.0, 40.0, 1.0, 4, 3, &[850.0]);
    field_from_fn(name, geometry, 2, move |t, _, j, i| offset + (t * 100 + j * 10 + i) as f64)
}

#[test]
fn test_sum_then_difference_gives_back_operand() {
    let f1 = two_step_field("A", 0.0);
    let f2 = two_step_field("B", 3.5);
    let sum = (&f1 + &f2).unwrap();
    let back = (&sum - &f2).unwrap();
    let expected = f1.data4d(None).unwrap();
    let actual = back.data4d(None).unwrap();
    for (a, b) in expected.iter().zip(actual.iter()) {
        assert!((a - b).abs() < EPS);
    }
    assert_eq!(sum.fid(), &Fid::operation("+"));
    assert_eq!(back.fid(), &Fid::operation("-"));
}

#[test]
fn test_result_has_null_validity_of_same_length() {
    let f1 = two_step_field("A", 0.0);
    let f2 = two_step_field("B", 1.0);
    let product = (&f1 * &f2).unwrap();
    assert_eq!(product.validity().len(), 2);
    assert!(product.validity().iter().all(|v| v.is_null()));
    assert_eq!(product.geometry(), f1.geometry());
    assert_eq!(product.fid(), &Fid::operation("*"));
}

#[test]
fn test_scalar_and_reversed_operations() {
    let field = two_step_field("A", 0.0);
    let halved = (&field / 2.0).unwrap();
    assert_eq!(halved.getdata(None, true).unwrap()[[1, 0, 2, 3]], 123.0 / 2.0);
    let reversed = (1000.0 - &field).unwrap();
    assert_eq!(reversed.getdata(None, true).unwrap()[[0, 0, 1, 1]], 989.0);
    let shifted = (&field + 1.0).unwrap();
    assert_eq!(shifted.min(None).unwrap(), 1.0);
    let scaled = (2.0 * &field).unwrap();
    assert_eq!(scaled.max(None).unwrap(), 246.0);
}

#[test]
fn test_in_place_operation_keeps_identity() {
    let mut field = two_step_field("A", 0.0);
    let other = two_step_field("B", 0.0);
    field.operation(Operator::Add, Operand::Field(&other)).unwrap();
    field.operation(Operator::Mul, Operand::Scalar(0.5)).unwrap();
    assert_eq!(field.fid(), &Fid::with("memory", "A"));
    assert_eq!(field.validity(), &hourly_validities(2));
    assert_eq!(field.getdata(None, true).unwrap()[[1, 0, 1, 2]], 112.0);
}

#[test]
fn test_incompatible_operands() {
    let field = two_step_field("A", 0.0);
    let other_grid = field_from_fn("B", regll_geometry(0.0, 40.0, 1.0, 5, 3, &[850.0]), 2, |_, _, _, _| 1.0);
    assert!((&field + &other_grid).is_err());

    let one_step = field_from_fn("C", regll_geometry(0.0, 40.0, 1.0, 4, 3, &[850.0]), 1, |_, _, _, _| 1.0);
    assert!((&field - &one_step).is_err());

    let gridpoint = academic_field("G", |j, i| (j + i) as f64);
    let mut spectral = academic_field("S", |j, i| (j * i) as f64);
    spectral.gp2sp(fourier_geometry(8, 8)).unwrap();
    assert!((&gridpoint * &spectral).is_err());
}

#[test]
fn test_spectral_operands() {
    let mut a = academic_field("A", |_, i| i as f64);
    let mut b = academic_field("B", |j, _| j as f64);
    a.gp2sp(fourier_geometry(8, 8)).unwrap();
    b.gp2sp(fourier_geometry(8, 8)).unwrap();
    let mut sum = (&a + &b).unwrap();
    assert!(sum.spectral());
    sum.sp2gp().unwrap();
    let data = sum.data4d(None).unwrap();
    assert!((data[[0, 0, 3, 5]] - 8.0).abs() < 1e-9);
}

#[test]
fn test_masked_values_propagate() {
    let geometry = regll_geometry(0.0, 40.0, 1.0, 4, 3, &[850.0]);
    let masked = field_from_fn("M", geometry, 2, |_, _, j, i| if j == 0 && i == 0 { f64::NAN } else { 1.0 });
    let field = two_step_field("A", 0.0);
    let sum = (&field + &masked).unwrap();
    let data = sum.getdata(None, true).unwrap();
    assert!(data[[0, 0, 0, 0]].is_nan());
    assert_eq!(data[[0, 0, 0, 1]], 2.0);
}

#[test]
fn test_vector_operations() {
    let u = two_step_field("U", 0.0);
    let v = two_step_field("V", 10.0);
    let wind = make_vector_field(u.clone(), v.clone()).unwrap();
    let doubled = (&wind + &wind).unwrap();
    assert_eq!(doubled.fid(), &Fid::operation("+"));
    assert_eq!(doubled.components()[1].getdata(None, true).unwrap()[[0, 0, 0, 0]], 20.0);

    let negated = (0.0 - &wind).unwrap();
    assert_eq!(negated.components()[0].max(None).unwrap(), 0.0);

    let lonely = make_vector_field(u.clone(), v).unwrap();
    let other_grid = field_from_fn("W", regll_geometry(0.0, 40.0, 1.0, 5, 3, &[850.0]), 2, |_, _, _, _| 1.0);
    let other = make_vector_field(other_grid.clone(), other_grid).unwrap();
    assert!((&lonely * &other).is_err());
}
