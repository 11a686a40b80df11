use cgfem::element::ReferenceElement;
use cgfem::quadrature::{quadrature, QuadratureError};
use matrixcompare::assert_scalar_eq;

#[test]
fn rules_sum_to_reference_volume() {
    for reference_element in [ReferenceElement::Line, ReferenceElement::Triangle, ReferenceElement::Square] {
        for order in 0..=3 {
            let rule = quadrature::<f64>(reference_element, order).unwrap();
            let volume: f64 = rule.weights().iter().sum();
            assert_scalar_eq!(volume, reference_element.volume::<f64>(), comp = abs, tol = 1e-14);
            assert!(rule
                .points()
                .iter()
                .all(|p| p.len() == reference_element.dim()));
        }
    }
}

#[test]
fn square_rule_of_order_two_integrates_bilinear_products() {
    let rule = quadrature::<f64>(ReferenceElement::Square, 2).unwrap();
    assert_eq!(rule.len(), 4);
    // int_0^1 int_0^1 x^2 y^2 = 1/9
    let estimated = rule.integrate(|p| p[0] * p[0] * p[1] * p[1]);
    assert_scalar_eq!(estimated, 1.0 / 9.0, comp = abs, tol = 1e-14);
}

#[test]
fn triangle_rule_of_order_two_integrates_quadratics() {
    let rule = quadrature::<f64>(ReferenceElement::Triangle, 2).unwrap();
    // int over the unit triangle of x y = 1/24
    let estimated = rule.integrate(|p| p[0] * p[1]);
    assert_scalar_eq!(estimated, 1.0 / 24.0, comp = abs, tol = 1e-14);
}

#[test]
fn unavailable_triangle_rule_is_reported() {
    let err = quadrature::<f64>(ReferenceElement::Triangle, 7).unwrap_err();
    assert!(err.downcast_ref::<QuadratureError>().is_some());
}
