#![warn(missing_docs)]
//! Reporting collaborators of the propagation driver.
//!
//! The driver does not log on its own behalf: everything it wants to report about the
//! processed surfaces goes through a [`PropagationObserver`] passed to
//! [`run`](crate::driver::run).
use log::{debug, info, trace};

use crate::{chain::ChainElement, output::SurfaceOutput, wavefront::Wavefront};

/// Receives progress information of a propagation run.
///
/// All methods have an empty default implementation.
pub trait PropagationObserver {
    /// Called once before the first surface with the wavelength (m) of the run.
    fn run_started(&mut self, _wavelength: f64, _surfaces: usize) {}
    /// Called before a surface is processed.
    fn surface_started(&mut self, _element: &ChainElement) {}
    /// Called for a surface that is skipped.
    fn surface_ignored(&mut self, _element: &ChainElement) {}
    /// Called after a surface has been processed.
    fn surface_finished(&mut self, _element: &ChainElement, _wavefront: &Wavefront) {}
    /// Called when the field of a surface has been saved.
    fn surface_saved(&mut self, _output: &SurfaceOutput) {}
    /// Called once after the last surface.
    fn run_finished(&mut self, _wavefront: &Wavefront) {}
}

/// Discards all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoObserver;

impl PropagationObserver for NoObserver {}

/// Forwards all reports to the [`log`] facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PropagationObserver for LogObserver {
    fn run_started(&mut self, wavelength: f64, surfaces: usize) {
        info!(
            "start propagation of {surfaces} surfaces at {:.4} um (fresnel_pop {})",
            wavelength * 1.0e6,
            crate::get_version()
        );
    }
    fn surface_started(&mut self, element: &ChainElement) {
        trace!("Surface: {}", element.name());
    }
    fn surface_ignored(&mut self, element: &ChainElement) {
        debug!("surface {} ({}) ignored", element.index(), element.name());
    }
    fn surface_finished(&mut self, element: &ChainElement, wavefront: &Wavefront) {
        debug!(
            "S{:02} {}: F num: {:.2}, distance to focus: {:.6} m, w(z): {:.4e} m",
            element.index(),
            element.name(),
            wavefront.fratio(),
            wavefront.distance_to_focus(),
            wavefront.wz()
        );
    }
    fn surface_saved(&mut self, output: &SurfaceOutput) {
        trace!("save surface {} ({})", output.index(), output.name());
    }
    fn run_finished(&mut self, wavefront: &Wavefront) {
        info!(
            "propagation finished at z = {:.6} m, total power {:.6}",
            wavefront.z(),
            wavefront.total_power()
        );
    }
}

/// Collects the indices of reported surfaces (used in tests).
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub started: Vec<usize>,
    pub ignored: Vec<usize>,
    pub saved: Vec<usize>,
    pub finished: bool,
}

#[cfg(test)]
impl PropagationObserver for RecordingObserver {
    fn surface_started(&mut self, element: &ChainElement) {
        self.started.push(element.index());
    }
    fn surface_ignored(&mut self, element: &ChainElement) {
        self.ignored.push(element.index());
    }
    fn surface_saved(&mut self, output: &SurfaceOutput) {
        self.saved.push(output.index());
    }
    fn run_finished(&mut self, _wavefront: &Wavefront) {
        self.finished = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, utils::test_helper::test_helper::check_logs};
    use log::Level;
    #[test]
    fn log_observer() {
        testing_logger::setup();
        let wf = Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap();
        let mut observer = LogObserver;
        observer.run_finished(&wf);
        check_logs(
            Level::Info,
            vec!["propagation finished at z = 0.000000 m, total power 4096.000000"],
        );
    }
    #[test]
    fn no_observer() {
        let wf = Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap();
        let mut observer = NoObserver;
        observer.run_started(1.0e-6, 3);
        observer.run_finished(&wf);
    }
}
