use approx::assert_relative_eq;
use fresnel_pop::{
    aperture::{Aperture, EllipseConfig},
    micrometer, millimeter,
    wavefront::{PropagatorKind, Wavefront},
};
use nalgebra::Point2;

fn apertured_wavefront() -> Wavefront {
    let mut wf = Wavefront::new(millimeter!(10.0), micrometer!(1.0), 128, 4).unwrap();
    let aperture = Aperture::Elliptical(
        EllipseConfig::new(Point2::new(millimeter!(5.0), millimeter!(3.0)))
            .unwrap()
            .with_center(millimeter!(1.0, -0.5))
            .unwrap(),
    );
    wf.aperture(&aperture).unwrap();
    wf.make_stop().unwrap();
    wf
}

fn assert_same_state(a: &Wavefront, b: &Wavefront) {
    assert_relative_eq!(a.z(), b.z(), epsilon = 1e-9 * b.zr());
    assert_relative_eq!(a.wz(), b.wz(), max_relative = 1e-12);
    assert_relative_eq!(a.w0(), b.w0(), max_relative = 1e-12);
    assert_relative_eq!(a.zr(), b.zr(), max_relative = 1e-12);
    assert_relative_eq!(a.dx(), b.dx(), max_relative = 1e-12);
    assert_relative_eq!(a.dy(), b.dy(), max_relative = 1e-12);
    assert_eq!(a.curvature() == 0.0, b.curvature() == 0.0);
    let diff = (a.amplitude() - b.amplitude()).abs().max();
    assert!(diff < 1e-9, "amplitude differs by {diff}");
}

#[test]
fn near_field_round_trip() {
    let start = apertured_wavefront();
    let mut wf = start.clone();
    let dz = 0.5 * wf.zr();
    assert_eq!(wf.propagate(dz).unwrap(), PropagatorKind::InsideToInside);
    assert_eq!(wf.propagate(-dz).unwrap(), PropagatorKind::InsideToInside);
    assert_same_state(&wf, &start);
}

#[test]
fn far_field_round_trip() {
    let start = apertured_wavefront();
    let mut wf = start.clone();
    let dz = 4.0 * wf.zr();
    assert_eq!(wf.propagate(dz).unwrap(), PropagatorKind::InsideToOutside);
    assert_eq!(wf.propagate(-dz).unwrap(), PropagatorKind::OutsideToInside);
    assert_same_state(&wf, &start);
}

#[test]
fn outside_round_trip() {
    let mut start = apertured_wavefront();
    start.propagate(2.0 * start.zr()).unwrap();
    let mut wf = start.clone();
    let dz = 3.0 * wf.zr();
    assert_eq!(wf.propagate(dz).unwrap(), PropagatorKind::OutsideToOutside);
    assert_eq!(wf.propagate(-dz).unwrap(), PropagatorKind::OutsideToOutside);
    assert_same_state(&wf, &start);
    assert_relative_eq!(
        wf.pilot_beam().radius_of_curvature(),
        start.pilot_beam().radius_of_curvature(),
        max_relative = 1e-9
    );
}
