//! Flat ASCII result files. Floats use the shortest decimal form that reads
//! back to the same value, switching to exponent notation below `1e-4` and
//! from `1e16` upwards (`1e-05`, `1.5e+16`).

use crate::domain::{UndulatorError, UndulatorResult};
use crate::modules::grid::{MeshBounds, StokesGrid};
use crate::modules::trajectory::ParticleTrajectory;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const INTENSITY_TITLE: &str =
    "#C-aligned Intensity (inner loop is vs photon energy, outer loop vs vertical position)";
pub const TRAJECTORY_HEADER: &str =
    "#ct [m], X [m], BetaX [rad], Y [m], BetaY [rad], Z [m], BetaZ [m]";

const HEADER_DESCRIPTIONS: [&str; 9] = [
    "Initial Photon Energy [eV]",
    "Final Photon Energy [eV]",
    "Number of points vs Photon Energy",
    "Initial Horizontal Position [m]",
    "Final Horizontal Position [m]",
    "Number of points vs Horizontal Position",
    "Initial Vertical Position [m]",
    "Final Vertical Position [m]",
    "Number of points vs Vertical Position",
];

const SCIENTIFIC_BELOW_EXPONENT: i32 = -4;
const SCIENTIFIC_FROM_EXPONENT: i32 = 16;

pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_owned();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `-1.2345e2`.
    let shortest = format!("{value:e}");
    let (mantissa, exponent) = shortest.split_once('e').unwrap_or((shortest.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    if !(SCIENTIFIC_BELOW_EXPONENT..SCIENTIFIC_FROM_EXPONENT).contains(&exponent) {
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exponent_sign}{:02}", exponent.abs());
    }

    let digits: String = mantissa.chars().filter(|ch| *ch != '.').collect();
    let integer_digits = exponent + 1;
    let body = if integer_digits <= 0 {
        format!("0.{}{digits}", "0".repeat(integer_digits.unsigned_abs() as usize))
    } else {
        let split = integer_digits as usize;
        if split >= digits.len() {
            format!("{digits}{}.0", "0".repeat(split - digits.len()))
        } else {
            format!("{}.{}", &digits[..split], &digits[split..])
        }
    };
    format!("{sign}{body}")
}

fn header_values(grid: &StokesGrid) -> [String; 9] {
    let mesh = grid.mesh;
    [
        format_float(mesh.e_start),
        format_float(mesh.e_fin),
        grid.energy_points().to_string(),
        format_float(mesh.x_start),
        format_float(mesh.x_fin),
        grid.x_points().to_string(),
        format_float(mesh.y_start),
        format_float(mesh.y_fin),
        grid.y_points().to_string(),
    ]
}

fn create(path: &Path, placeholder: &'static str) -> UndulatorResult<BufWriter<File>> {
    File::create(path).map(BufWriter::new).map_err(|source| {
        UndulatorError::io_system(
            placeholder,
            format!("failed to create '{}': {source}", path.display()),
        )
    })
}

fn write_failure(path: &Path, placeholder: &'static str, source: std::io::Error) -> UndulatorError {
    UndulatorError::io_system(
        placeholder,
        format!("failed to write '{}': {source}", path.display()),
    )
}

/// Writes S0 of `grid` as one value per line, energy fastest and vertical
/// position slowest. Returns the number of data lines.
pub fn write_intensity_file(grid: &StokesGrid, path: &Path) -> UndulatorResult<usize> {
    const PLACEHOLDER: &str = "IO.WRITE_INTENSITY";
    let mut writer = create(path, PLACEHOLDER)?;
    let s0 = grid.s0();
    let result = (|| -> std::io::Result<()> {
        writeln!(writer, "{INTENSITY_TITLE}")?;
        for (value, description) in header_values(grid).iter().zip(HEADER_DESCRIPTIONS) {
            writeln!(writer, "#{value} #{description}")?;
        }
        for value in s0 {
            writeln!(writer, " {}", format_float(f64::from(*value)))?;
        }
        writer.flush()
    })();
    result.map_err(|source| write_failure(path, PLACEHOLDER, source))?;

    info!(path = %path.display(), lines = s0.len(), "wrote intensity file");
    Ok(s0.len())
}

/// Writes one tab-separated row per trajectory sample. Returns the number of rows.
pub fn write_trajectory_file(trajectory: &ParticleTrajectory, path: &Path) -> UndulatorResult<usize> {
    const PLACEHOLDER: &str = "IO.WRITE_TRAJECTORY";
    if !trajectory.columns_consistent() {
        return Err(UndulatorError::input_validation(
            "CONFIG.TRAJECTORY_COLUMNS",
            format!(
                "trajectory columns differ in length (x has {} samples); nothing written to '{}'",
                trajectory.np(),
                path.display()
            ),
        ));
    }
    let mut writer = create(path, PLACEHOLDER)?;
    let np = trajectory.np();
    let result = (|| -> std::io::Result<()> {
        writeln!(writer, "{TRAJECTORY_HEADER}")?;
        for index in 0..np {
            let row = [
                trajectory.ct_at(index),
                trajectory.x[index],
                trajectory.xp[index],
                trajectory.y[index],
                trajectory.yp[index],
                trajectory.z[index],
                trajectory.zp[index],
            ]
            .map(format_float);
            writeln!(writer, "{}", row.join("\t"))?;
        }
        writer.flush()
    })();
    result.map_err(|source| write_failure(path, PLACEHOLDER, source))?;

    info!(path = %path.display(), rows = np, "wrote trajectory file");
    Ok(np)
}

/// Parsed intensity file. `mesh.z_start` is not stored in the file and reads as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityFile {
    pub mesh: MeshBounds,
    pub ne: usize,
    pub nx: usize,
    pub ny: usize,
    pub values: Vec<f64>,
}

impl IntensityFile {
    pub fn point_count(&self) -> usize {
        self.ne * self.nx * self.ny
    }
}

pub fn read_intensity_file(path: &Path) -> UndulatorResult<IntensityFile> {
    const PLACEHOLDER: &str = "IO.READ_INTENSITY";
    let content = fs::read_to_string(path).map_err(|source| {
        UndulatorError::io_system(
            PLACEHOLDER,
            format!("failed to read '{}': {source}", path.display()),
        )
    })?;
    let malformed = |detail: String| {
        UndulatorError::io_system(PLACEHOLDER, format!("'{}': {detail}", path.display()))
    };

    let mut header = Vec::with_capacity(HEADER_DESCRIPTIONS.len());
    let mut values = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        if let Some(comment) = line.strip_prefix('#') {
            // Title and other free-text comments carry no leading number.
            let token = comment.split_whitespace().next().unwrap_or_default();
            if let Ok(value) = token.parse::<f64>() {
                header.push(value);
            }
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|error| {
                malformed(format!("line {line_number}: invalid value '{trimmed}': {error}"))
            })?;
        values.push(value);
    }

    let header: [f64; 9] = header.as_slice().try_into().map_err(|_| {
        malformed(format!(
            "expected 9 header fields, found {}",
            header.len()
        ))
    })?;
    let count = |value: f64, label: &str| -> UndulatorResult<usize> {
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
            Ok(value as usize)
        } else {
            Err(malformed(format!(
                "point count {label} is not a non-negative integer: {value}"
            )))
        }
    };

    let file = IntensityFile {
        mesh: MeshBounds {
            z_start: 0.0,
            e_start: header[0],
            e_fin: header[1],
            x_start: header[3],
            x_fin: header[4],
            y_start: header[6],
            y_fin: header[7],
        },
        ne: count(header[2], "ne")?,
        nx: count(header[5], "nx")?,
        ny: count(header[8], "ny")?,
        values,
    };
    if file.values.len() != file.point_count() {
        return Err(malformed(format!(
            "expected {} values for a {}x{}x{} mesh, found {}",
            file.point_count(),
            file.ne,
            file.nx,
            file.ny,
            file.values.len()
        )));
    }
    Ok(file)
}

/// `<base>/<file_name>`, creating `base` when it does not exist yet.
pub fn prepare_output_path(base: &Path, file_name: &str) -> UndulatorResult<PathBuf> {
    fs::create_dir_all(base).map_err(|source| {
        UndulatorError::io_system(
            "IO.OUTPUT_DIR",
            format!("failed to create output directory '{}': {source}", base.display()),
        )
    })?;
    Ok(base.join(file_name))
}
