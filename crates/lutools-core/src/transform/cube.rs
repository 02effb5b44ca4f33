//! Adobe/Resolve `.cube` 3D LUT reading and writing.
//!
//! ```text
//! # Comment
//! TITLE "Name"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.000000 0.000000 0.000000
//! ...
//! ```
//!
//! Samples are listed red fastest, then green, then blue.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{LutoolsError, LutoolsResult};
use crate::transform::lut::{Lut3D, check_size};

/// Read a 3D LUT from a `.cube` file.
pub fn read_cube(path: &Path) -> LutoolsResult<Lut3D> {
    let file = File::open(path).map_err(|e| LutoolsError::io(path, e))?;
    parse_cube(BufReader::new(file)).map_err(|e| match e {
        LutoolsError::Io { source, .. } => LutoolsError::io(path, source),
        other => other,
    })
}

/// Parse a 3D LUT from `.cube` text.
///
/// `TITLE` and unrecognised keyword lines are ignored. A non-unit domain is
/// folded into the lattice so lookups always use `[0, 1]` input.
pub fn parse_cube<R: BufRead>(reader: R) -> LutoolsResult<Lut3D> {
    let mut size: Option<usize> = None;
    let mut domain_min = [0.0_f32; 3];
    let mut domain_max = [1.0_f32; 3];
    let mut data: Vec<[f32; 3]> = Vec::new();

    // Split on raw bytes: comments and titles may carry legacy encodings,
    // while every token the parser reads is ASCII.
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|e| LutoolsError::io("<cube stream>", e))?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        if starts_numeric(first) {
            data.push(parse_sample(line, index + 1)?);
            continue;
        }

        match first {
            "LUT_3D_SIZE" => size = Some(parse_size(line, tokens.next())?),
            "LUT_1D_SIZE" => {
                return Err(LutoolsError::MalformedHeader(
                    "1D LUTs are not supported".into(),
                ));
            }
            "DOMAIN_MIN" => domain_min = parse_domain(line, tokens)?,
            "DOMAIN_MAX" => domain_max = parse_domain(line, tokens)?,
            _ => {}
        }
    }

    let size = size.ok_or_else(|| LutoolsError::MalformedHeader("missing LUT_3D_SIZE".into()))?;
    for c in 0..3 {
        if domain_max[c] <= domain_min[c] {
            return Err(LutoolsError::MalformedHeader(format!(
                "DOMAIN_MAX {:?} must exceed DOMAIN_MIN {:?}",
                domain_max, domain_min
            )));
        }
    }

    let lut = Lut3D::from_data(size, data)?;
    if domain_min == [0.0; 3] && domain_max == [1.0; 3] {
        Ok(lut)
    } else {
        normalize_domain(&lut, domain_min, domain_max)
    }
}

/// Write a 3D LUT as `.cube` text.
pub fn write_cube<W: Write>(mut writer: W, lut: &Lut3D, title: &str) -> std::io::Result<()> {
    writeln!(writer, "TITLE \"{}\"", title.replace('"', "'"))?;
    writeln!(writer, "LUT_3D_SIZE {}", lut.size())?;
    writeln!(writer, "DOMAIN_MIN 0.0 0.0 0.0")?;
    writeln!(writer, "DOMAIN_MAX 1.0 1.0 1.0")?;
    // Storage order already matches the file order.
    for rgb in lut.data() {
        writeln!(writer, "{:.6} {:.6} {:.6}", rgb[0], rgb[1], rgb[2])?;
    }
    writer.flush()
}

/// Write a 3D LUT to a `.cube` file.
pub fn save_cube(path: &Path, lut: &Lut3D, title: &str) -> LutoolsResult<()> {
    let file = File::create(path).map_err(|e| LutoolsError::io(path, e))?;
    write_cube(BufWriter::new(file), lut, title).map_err(|e| LutoolsError::io(path, e))
}

fn starts_numeric(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

fn parse_sample(line: &str, line_number: usize) -> LutoolsResult<[f32; 3]> {
    let malformed = || LutoolsError::MalformedSample {
        line: line_number,
        text: line.to_string(),
    };

    let mut rgb = [0.0_f32; 3];
    let mut tokens = line.split_whitespace();
    for slot in &mut rgb {
        let value: f32 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(malformed)?;
        if !value.is_finite() {
            return Err(malformed());
        }
        *slot = value;
    }
    if tokens.next().is_some() {
        return Err(malformed());
    }
    Ok(rgb)
}

fn parse_size(line: &str, token: Option<&str>) -> LutoolsResult<usize> {
    let size: usize = token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| LutoolsError::MalformedHeader(format!("invalid LUT size: {line}")))?;
    check_size(size)?;
    Ok(size)
}

fn parse_domain<'a>(line: &str, tokens: impl Iterator<Item = &'a str>) -> LutoolsResult<[f32; 3]> {
    let values: Vec<f32> = tokens
        .map(|t| t.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| LutoolsError::MalformedHeader(format!("invalid domain: {line}")))?;
    match values.as_slice() {
        [r, g, b] if r.is_finite() && g.is_finite() && b.is_finite() => Ok([*r, *g, *b]),
        _ => Err(LutoolsError::MalformedHeader(format!("invalid domain: {line}"))),
    }
}

/// Resample a lattice defined over `[min, max]` onto the unit cube.
///
/// Unit input `u` corresponds to `(u − min) / (max − min)` in the source
/// lattice's normalised coordinates, clamped to its bounds.
fn normalize_domain(lut: &Lut3D, min: [f32; 3], max: [f32; 3]) -> LutoolsResult<Lut3D> {
    Lut3D::from_fn(lut.size(), |u| {
        let mut t = [0.0_f32; 3];
        for c in 0..3 {
            t[c] = ((u[c] - min[c]) / (max[c] - min[c])).clamp(0.0, 1.0);
        }
        lut.apply(t)
    })
}
