//! Handling the `fresnel-pop` CLI
//!
//! This module handles the command line parsing as well as basic information (e.g. version
//! information).
use std::path::{Path, PathBuf};

use clap::{builder::Str, ArgAction, Parser};
use log::LevelFilter;

use crate::{
    error::{PopError, PopResult},
    get_version,
};

/// Validated command line arguments of the `fresnel-pop` application.
#[derive(Debug)]
pub struct Args {
    /// file path of the system document
    pub file_path: PathBuf,
    /// print the paraxial chief ray trace before propagating
    pub raytrace: bool,
    /// destination of the YAML summary (not written if `None`)
    pub output: Option<PathBuf>,
    /// propagate only the wavelength with this index
    pub wavelength: Option<usize>,
    /// level of the console logger
    pub log_level: LevelFilter,
}

/// Raw command line arguments.
#[derive(Parser, Debug)]
#[command(author, version = Str::from(get_version()), about, long_about = None)]
pub struct PartialArgs {
    /// YAML file describing the optical system
    file_path: String,

    /// print the paraxial ray trace of each field
    #[arg(short, long)]
    raytrace: bool,

    /// write the per-surface summary as YAML into this file
    #[arg(short, long)]
    output: Option<String>,

    /// index of the single wavelength to propagate (all wavelengths if omitted)
    #[arg(short, long)]
    wavelength: Option<usize>,

    /// increase the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Checks if the passed file path is an existing YAML file.
fn file_path_is_valid(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

const fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl TryFrom<PartialArgs> for Args {
    type Error = PopError;

    fn try_from(part_args: PartialArgs) -> PopResult<Self> {
        let file_path = PathBuf::from(&part_args.file_path);
        if !file_path_is_valid(&file_path) {
            return Err(PopError::File(format!(
                "invalid system file: {} (expected an existing .yaml file)",
                file_path.display()
            )));
        }
        let output = part_args.output.map(PathBuf::from);
        if let Some(parent) = output
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
        {
            if !parent.is_dir() {
                return Err(PopError::File(format!(
                    "output directory {} does not exist",
                    parent.display()
                )));
            }
        }
        Ok(Self {
            file_path,
            raytrace: part_args.raytrace,
            output,
            wavelength: part_args.wavelength,
            log_level: log_level(part_args.verbose),
        })
    }
}

/// Print the program name and version.
pub fn show_intro() {
    println!(
        "{: ^79}\n{: ^79}\n",
        "fresnel-pop - paraxial Fresnel wavefront propagation",
        format!("version {}", get_version())
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn file_path_is_valid_test() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("system.yaml");
        File::create(&yaml).unwrap();
        let txt = dir.path().join("system.txt");
        File::create(&txt).unwrap();
        assert!(file_path_is_valid(&yaml));
        assert!(!file_path_is_valid(&txt));
        assert!(!file_path_is_valid(dir.path()));
        assert!(!file_path_is_valid(&dir.path().join("missing.yaml")));
    }
    #[test]
    fn log_level_test() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(7), LevelFilter::Trace);
    }
    #[test]
    fn parser_test() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("system.yaml");
        File::create(&yaml).unwrap();
        let part_args = PartialArgs::try_parse_from([
            "fresnel-pop",
            yaml.to_str().unwrap(),
            "-r",
            "-vv",
            "--wavelength",
            "1",
        ])
        .unwrap();
        let args = Args::try_from(part_args).unwrap();
        assert_eq!(args.file_path, yaml);
        assert!(args.raytrace);
        assert_eq!(args.wavelength, Some(1));
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert!(args.output.is_none());

        let part_args = PartialArgs::try_parse_from([
            "fresnel-pop",
            yaml.to_str().unwrap(),
            "-o",
            dir.path().join("no_dir/out.yaml").to_str().unwrap(),
        ])
        .unwrap();
        assert!(Args::try_from(part_args).is_err());

        let part_args =
            PartialArgs::try_parse_from(["fresnel-pop", "./no/such/system.yaml"]).unwrap();
        assert!(Args::try_from(part_args).is_err());
        assert!(PartialArgs::try_parse_from(["fresnel-pop"]).is_err());
    }
    #[test]
    fn intro() {
        show_intro();
    }
}
