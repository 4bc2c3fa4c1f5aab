use approx::assert_relative_eq;
use fresnel_pop::{
    aperture::{Aperture, ApertureType, Apodize, EllipseConfig, RectangleConfig},
    chain::OpticalChain,
    driver::run,
    meter, micrometer, millimeter,
    refractive_index::GlassCatalog,
    reporter::NoObserver,
    run_parameters::RunParameters,
    surface::{ParaxialLensSurface, StandardSurface, SurfaceDescription, SurfaceKind},
    wavefront::Wavefront,
};
use nalgebra::Point2;

fn circle(radius: f64) -> Aperture {
    Aperture::Elliptical(EllipseConfig::circle(meter!(radius)).unwrap())
}

#[test]
fn stop_normalizes_and_free_space_conserves() {
    let mut wf = Wavefront::new(millimeter!(10.0), micrometer!(1.0), 128, 4).unwrap();
    wf.aperture(&circle(0.005)).unwrap();
    wf.make_stop().unwrap();
    assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-12);
    let zr = wf.zr();
    for dz in [0.3 * zr, 2.0 * zr, 4.0 * zr, -5.0 * zr] {
        wf.propagate(dz).unwrap();
        assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
    }
    wf.lens(10.0).unwrap();
    assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
    wf.propagate(10.0).unwrap();
    assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
}

#[test]
fn apertures_never_add_power() {
    let mut wf = Wavefront::new(millimeter!(10.0), micrometer!(1.0), 128, 4).unwrap();
    wf.make_stop().unwrap();
    let mut obstruction =
        EllipseConfig::new(Point2::new(millimeter!(1.0), millimeter!(1.0))).unwrap();
    obstruction.set_aperture_type(ApertureType::Obstruction);
    let apertures = [
        circle(0.008),
        Aperture::Rectangular(
            RectangleConfig::new(millimeter!(6.0, 3.0))
                .unwrap()
                .with_rotation(30.0)
                .unwrap(),
        ),
        Aperture::Elliptical(obstruction),
    ];
    let mut power = wf.total_power();
    for aperture in &apertures {
        wf.aperture(aperture).unwrap();
        let after = wf.total_power();
        assert!(after <= power);
        assert!(after > 0.0);
        power = after;
    }
}

#[test]
fn power_after_stop_through_a_chain() {
    let params = RunParameters::new(micrometer!(1.0), millimeter!(10.0), 128, 4).unwrap();
    let surfaces = [
        SurfaceDescription::init(millimeter!(10.0)).unwrap(),
        SurfaceDescription::new(
            "stop",
            SurfaceKind::Standard(StandardSurface {
                aperture: circle(0.005),
                thickness: Some(meter!(0.5)),
                ..Default::default()
            }),
        )
        .as_stop()
        .saved(),
        SurfaceDescription::new(
            "lens",
            SurfaceKind::ParaxialLens(ParaxialLensSurface {
                focal_length: meter!(2.0),
                thickness: Some(meter!(1.0)),
                aperture: Aperture::None,
            }),
        )
        .saved(),
        SurfaceDescription::new(
            "field stop",
            SurfaceKind::Standard(StandardSurface {
                aperture: circle(0.002),
                ..Default::default()
            }),
        )
        .saved(),
    ];
    let chain = OpticalChain::build(&surfaces, &params, &GlassCatalog::default()).unwrap();
    let result = run(&params, &chain, &mut NoObserver).unwrap();
    assert_relative_eq!(result.surface(1).unwrap().total_power(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(result.surface(2).unwrap().total_power(), 1.0, epsilon = 1e-9);
    let clipped = result.surface(3).unwrap().total_power();
    assert!(clipped < 1.0);
}
