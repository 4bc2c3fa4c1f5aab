use clap::Parser;
use fresnel_pop::{
    console::{show_intro, Args, PartialArgs},
    document::SystemDocument,
    driver::run,
    error::PopResult,
    output::{save_summaries, RunSummary},
    raytrace::raytrace,
    refractive_index::GlassCatalog,
    reporter::LogObserver,
};
use uom::si::length::meter;

fn print_summary(summary: &RunSummary) {
    println!(
        "\nwavelength {:.4} um, field ({:.3}, {:.3}) deg",
        summary.wavelength * 1.0e6,
        summary.field.0,
        summary.field.1
    );
    for surface in &summary.surfaces {
        println!(
            "S{:02} - {:15} w(z): {:10.4e} m  F#: {:8.2}  focus: {:10.3e} m  power: {:.6}  {}",
            surface.index,
            surface.name,
            surface.wz,
            surface.fratio,
            surface.distance_to_focus,
            surface.total_power,
            surface.propagator.as_deref().unwrap_or("-")
        );
    }
}

fn main() -> PopResult<()> {
    let args = Args::try_from(PartialArgs::parse())?;
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .init();
    show_intro();

    let document = SystemDocument::from_file(&args.file_path)?;
    let catalog = GlassCatalog::default();
    let wavelengths = args
        .wavelength
        .map_or_else(|| (0..document.wavelengths().len()).collect(), |w| vec![w]);
    let mut summaries = Vec::new();
    for wavelength in wavelengths {
        let chain = document.build_chain(wavelength, &catalog)?;
        for field in 0..document.fields().len() {
            let params = document.run_parameters(wavelength, field)?;
            if args.raytrace {
                println!("\nparaxial ray trace, field {:?} deg", params.field_angles());
                for step in raytrace(&params, &chain, 0.0, 0.0) {
                    println!("{step}");
                }
            }
            let result = run(&params, &chain, &mut LogObserver)?;
            let summary = RunSummary::new(
                params.wavelength().get::<meter>(),
                params.field_angles(),
                &result,
            );
            print_summary(&summary);
            summaries.push(summary);
        }
    }
    if let Some(path) = &args.output {
        save_summaries(&summaries, path)?;
        println!("\nsummary written to {}", path.display());
    }
    Ok(())
}
