use clap::{Parser, Subcommand, ValueEnum};
use polycrop::{CropSettings, OverlapRule};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root directory of the generated dataset
    #[arg(long, global = true, default_value = "results", env = "POLYCROP_RESULTS_ROOT")]
    pub results_root: PathBuf,

    /// Side length of each square tile, in source pixels
    #[arg(
        long,
        global = true,
        default_value_t = 500,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "POLYCROP_CROP_SIZE"
    )]
    pub crop_size: u32,

    /// Distance between neighbouring tile origins, in source pixels
    #[arg(
        long,
        global = true,
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "POLYCROP_STRIDE"
    )]
    pub stride: u32,

    /// When a tile touching an annotated region counts as negative
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = NegativeRule::Fraction,
        env = "POLYCROP_NEGATIVE_RULE"
    )]
    pub negative_rule: NegativeRule,

    /// Covered share of the tile needed by the `fraction` rule, in (0, 1]
    #[arg(
        long,
        global = true,
        default_value_t = 0.01,
        value_parser = parse_fraction,
        env = "POLYCROP_MIN_FRACTION"
    )]
    pub min_fraction: f64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the annotation window (default)
    Annotate {
        /// Directory of images; chosen in the setup screen when omitted
        #[arg(long, env = "POLYCROP_IMAGE_DIR")]
        image_dir: Option<PathBuf>,

        #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
        canvas_width: u32,

        #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
        canvas_height: u32,
    },
    /// Crop every image of a directory using its saved annotations
    Crop {
        #[arg(long, env = "POLYCROP_IMAGE_DIR")]
        image_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegativeRule {
    /// Any annotated pixel makes the tile negative
    Any,
    /// At least `--min-fraction` of the tile must be annotated
    Fraction,
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("{s} is not in (0, 1]"))
    }
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn crop_settings(&self) -> CropSettings {
        let rule = match self.negative_rule {
            NegativeRule::Any => OverlapRule::AnyOverlap,
            NegativeRule::Fraction => OverlapRule::MinFraction {
                fraction: self.min_fraction,
            },
        };
        CropSettings {
            crop_size: self.crop_size,
            stride: self.stride,
            rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["polycrop"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.crop_settings(), CropSettings::default());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "polycrop",
            "crop",
            "--image-dir",
            "imgs",
            "--negative-rule",
            "any",
            "--stride",
            "50",
        ])
        .unwrap();
        let settings = args.crop_settings();
        assert_eq!(settings.rule, OverlapRule::AnyOverlap);
        assert_eq!(settings.stride, 50);
        assert!(matches!(args.command, Some(Command::Crop { .. })));
    }

    #[test]
    fn test_min_fraction_range() {
        for bad in ["nan", "inf", "-0.5", "0", "1.5", "abc"] {
            assert!(
                Args::try_parse_from(["polycrop", "--min-fraction", bad]).is_err(),
                "{bad} accepted"
            );
        }
        let args = Args::try_parse_from(["polycrop", "--min-fraction", "1"]).unwrap();
        assert_eq!(args.min_fraction, 1.0);
    }

    #[test]
    fn test_zero_crop_size_rejected() {
        assert!(Args::try_parse_from(["polycrop", "--crop-size", "0"]).is_err());
    }
}
