//! CSV result tables.
//!
//! Two tables are produced per run:
//!
//! - the full processed table, one row per channel pair with every
//!   intermediate figure, lengths labelled with the image's space unit
//! - the essential table, which keeps the pixel shifts and the 3D
//!   colocalization ratio and splits the file name on `_` into
//!   `Filename-Variable-NNN` columns for easy grouping in a spreadsheet
//!
//! Values are rounded for readability: 2 decimals for positions and
//! distances, 3 for pixel and Nyquist sizes, 1 for ratios. Missing values
//! (no reference point) are written as empty cells. A pair whose metrics
//! could not be computed still gets a row: channel columns filled, every
//! metric cell empty.

use crate::error::ReportError;
use crate::model::{channel_label, ChannelPairMetrics, ImageAlignment, PairFailure};
use log::{info, warn};
use microscope_optics::SpaceUnit;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of every merged output file
pub const REPORT_PREFIX: &str = "Channel_Alignment";

/// Column of the 3D colocalization ratio in the full table
const COLOC_RATIO_3D_COLUMN: usize = 59;
/// Full-table columns copied into the essential table, filename first
const ESSENTIAL_COLUMNS: [usize; 9] = [0, 1, 2, 3, 4, 18, 19, 20, COLOC_RATIO_3D_COLUMN];

/// First free path among `<basename>_<suffix><ext>`,
/// `<basename>_<suffix>-002<ext>`, `-003`, ...
pub fn unique_output_path(dir: &Path, basename: &str, suffix: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{basename}_{suffix}{extension}"));
    if !candidate.exists() {
        return candidate;
    }

    (2u32..)
        .map(|counter| dir.join(format!("{basename}_{suffix}-{counter:03}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

fn rounded(value: f64, decimals: i32) -> String {
    let scale = 10f64.powi(decimals);
    // Adding 0.0 turns -0.0 into 0.0
    format!("{}", (value * scale).round() / scale + 0.0)
}

fn rounded_opt(value: Option<f64>, decimals: i32) -> String {
    value.map(|v| rounded(v, decimals)).unwrap_or_default()
}

/// Header of the full processed table
pub fn full_table_header(unit: SpaceUnit) -> Vec<String> {
    let u = unit.symbol();
    let mut header: Vec<String> = [
        "Filename",
        "Channel 1",
        "Channel 2",
        "Name Channel 1",
        "Name Channel 2",
        "Channel Pair",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let with_unit = |labels: &[&str]| -> Vec<String> {
        labels.iter().map(|label| format!("{label} ({u})")).collect()
    };

    header.extend(with_unit(&[
        "X Channel 1",
        "Y Channel 1",
        "Z Channel 1",
        "X Channel 2",
        "Y Channel 2",
        "Z Channel 2",
        "X Shift",
        "Y Shift",
        "Z Shift",
    ]));
    header.extend(
        ["Pixel Width", "Pixel Height", "Pixel Depth"]
            .iter()
            .map(|label| format!("{label} ({u}/px)")),
    );
    header.extend(
        ["X Shift (pixels)", "Y Shift (pixels)", "Z Shift (pixels)"]
            .iter()
            .map(|s| s.to_string()),
    );
    header.extend(with_unit(&["Distance Lateral", "Distance Axial", "Distance 3D"]));
    header.extend(
        [
            "Objective NA",
            "Objective Immersion",
            "Refractive Index",
            "EM Wavelength Channel 1 (nm)",
            "EM Wavelength Channel 2 (nm)",
            "Conversion Factor",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    header.extend(with_unit(&["EM Wavelength Channel 1", "EM Wavelength Channel 2"]));

    for channel in 1..=2 {
        header.push(format!("Nyquist Pixel Size Lateral Channel {channel} ({u})"));
        header.push(format!("Nyquist Pixel Size Axial Channel {channel} ({u})"));
        header.push(format!("Nyquist Ratio Lateral Channel {channel}"));
        header.push(format!("Nyquist Ratio Axial Channel {channel}"));
    }
    for channel in 1..=2 {
        header.push(format!("Resolution Lateral Theoretical Channel {channel} ({u})"));
        header.push(format!("Resolution Axial Theoretical Channel {channel} ({u})"));
        header.push(format!("Resolution Lateral Practical Channel {channel} ({u})"));
        header.push(format!("Resolution Axial Practical Channel {channel} ({u})"));
    }

    header.extend(with_unit(&[
        "Semi Minor Axis",
        "Semi Major Axis",
        "X Ref",
        "Y Ref",
        "Z Ref",
        "X Ref Shift",
        "Y Ref Shift",
        "Z Ref Shift",
        "Distance 3D Ref",
    ]));
    header.extend(
        [
            "Colocalization Ratio Lateral",
            "Colocalization Ratio Axial",
            "Colocalization Ratio 3D",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    header
}

/// One row of the full processed table
pub fn full_table_record(filename: &str, row: &ChannelPairMetrics) -> Vec<String> {
    let mut record = vec![
        filename.to_string(),
        channel_label(row.channel_1),
        channel_label(row.channel_2),
        row.channel_name_1.clone(),
        row.channel_name_2.clone(),
        row.channel_pair_label(),
    ];

    let p1 = row.position_1;
    let p2 = row.position_2;
    for value in [p1.x, p1.y, p1.z, p2.x, p2.y, p2.z, row.shift.x, row.shift.y, row.shift.z] {
        record.push(rounded(value, 2));
    }
    for value in [row.voxel.width, row.voxel.height, row.voxel.depth] {
        record.push(rounded(value, 3));
    }
    for value in row.shift_pixels.iter() {
        record.push(rounded(*value, 2));
    }
    for value in [
        row.distances.lateral,
        row.distances.axial,
        row.distances.distance_3d,
    ] {
        record.push(rounded(value, 2));
    }

    record.push(rounded(row.numerical_aperture, 2));
    record.push(row.immersion.to_string());
    record.push(rounded(row.refractive_index, 2));
    record.push(rounded(row.emission_wavelength_nm_1, 2));
    record.push(rounded(row.emission_wavelength_nm_2, 2));
    record.push(rounded(row.conversion_factor, 2));
    record.push(rounded(row.emission_wavelength_1, 3));
    record.push(rounded(row.emission_wavelength_2, 3));

    for profile in [&row.profile_1, &row.profile_2] {
        record.push(rounded(profile.nyquist_pixel_size_lateral, 3));
        record.push(rounded(profile.nyquist_pixel_size_axial, 3));
        record.push(rounded(profile.nyquist_ratio_lateral, 1));
        record.push(rounded(profile.nyquist_ratio_axial, 1));
    }
    for profile in [&row.profile_1, &row.profile_2] {
        record.push(rounded(profile.resolution_lateral_theoretical, 2));
        record.push(rounded(profile.resolution_axial_theoretical, 2));
        record.push(rounded(profile.resolution_lateral_practical, 2));
        record.push(rounded(profile.resolution_axial_practical, 2));
    }

    record.push(rounded(row.semi_minor_axis, 2));
    record.push(rounded(row.semi_major_axis, 2));

    let reference = row.reference.as_ref();
    for value in [
        reference.map(|r| r.position.x),
        reference.map(|r| r.position.y),
        reference.map(|r| r.position.z),
        reference.map(|r| r.shift.x),
        reference.map(|r| r.shift.y),
        reference.map(|r| r.shift.z),
        row.reference_distance_3d(),
    ] {
        record.push(rounded_opt(value, 2));
    }

    record.push(rounded(row.colocalization_ratio_lateral, 1));
    record.push(rounded(row.colocalization_ratio_axial, 1));
    record.push(rounded_opt(row.colocalization_ratio_3d, 1));

    record
}

/// Row of the full table for a pair that failed: identity columns only
pub fn failed_pair_record(filename: &str, failure: &PairFailure) -> Vec<String> {
    let mut record = vec![
        filename.to_string(),
        channel_label(failure.channel_1),
        channel_label(failure.channel_2),
        failure.channel_name_1.clone(),
        failure.channel_name_2.clone(),
        format!("{} x {}", failure.channel_name_1, failure.channel_name_2),
    ];
    record.resize(COLOC_RATIO_3D_COLUMN + 1, String::new());
    record
}

/// Full-table records of one image, computed and failed pairs together in
/// `(channel_1, channel_2)` order.
fn image_records(alignment: &ImageAlignment) -> Vec<Vec<String>> {
    let mut keyed: Vec<((u32, u32), Vec<String>)> = alignment
        .rows
        .iter()
        .map(|row| {
            let key = (row.channel_1, row.channel_2);
            (key, full_table_record(&alignment.filename, row))
        })
        .chain(alignment.failures.iter().map(|failure| {
            let key = (failure.channel_1, failure.channel_2);
            (key, failed_pair_record(&alignment.filename, failure))
        }))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, record)| record).collect()
}

/// Space unit used for the header of a merged table.
///
/// Images are expected to share one unit. When they don't, the first
/// image's unit labels the columns and a warning is logged.
fn header_unit(alignments: &[ImageAlignment]) -> SpaceUnit {
    let unit = alignments
        .first()
        .map(ImageAlignment::space_unit)
        .unwrap_or_default();
    if alignments.iter().any(|a| a.space_unit() != unit) {
        warn!("Images use different space units, columns are labelled in {unit}");
    }
    unit
}

/// Write the full processed table for any number of images
pub fn write_full_table<W: io::Write>(
    writer: W,
    alignments: &[ImageAlignment],
) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(full_table_header(header_unit(alignments)))?;
    for alignment in alignments {
        for record in image_records(alignment) {
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Split a file name on `_`, dropping the extension of the last part.
///
/// `"Beads_63x_Slide-2.czi"` gives `["Beads", "63x", "Slide-2"]`.
pub fn filename_variables(filename: &str) -> Vec<String> {
    let mut parts: Vec<String> = filename.split('_').map(str::to_string).collect();
    if let Some(last) = parts.last_mut() {
        if let Some((stem, _)) = last.rsplit_once('.') {
            *last = stem.to_string();
        }
    }
    parts
}

/// Write the essential table for any number of images
pub fn write_essential_table<W: io::Write>(
    writer: W,
    alignments: &[ImageAlignment],
) -> Result<(), ReportError> {
    let header = full_table_header(header_unit(alignments));

    let rows: Vec<(Vec<String>, Vec<String>)> = alignments
        .iter()
        .flat_map(|alignment| {
            let variables = filename_variables(&alignment.filename);
            image_records(alignment).into_iter().map(move |record| {
                let selected = ESSENTIAL_COLUMNS.iter().map(|&i| record[i].clone()).collect();
                (selected, variables.clone())
            })
        })
        .collect();

    let nb_variables = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

    let mut wtr = csv::Writer::from_writer(writer);
    let mut out_header = vec![header[ESSENTIAL_COLUMNS[0]].clone()];
    out_header.extend((1..=nb_variables).map(|i| format!("Filename-Variable-{i:03}")));
    out_header.extend(ESSENTIAL_COLUMNS[1..].iter().map(|&i| header[i].clone()));
    wtr.write_record(&out_header)?;

    for (selected, mut variables) in rows {
        variables.resize(nb_variables, String::new());
        let mut record = vec![selected[0].clone()];
        record.extend(variables);
        record.extend(selected[1..].iter().cloned());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes result tables into one output directory without overwriting
/// earlier runs.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full table for a single image, named after the image
    pub fn write_image(&self, alignment: &ImageAlignment) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = unique_output_path(
            &self.output_dir,
            &alignment.image_name,
            "Channel-Alignment_All-Data-Processed",
            ".csv",
        );
        write_full_table(std::fs::File::create(&path)?, std::slice::from_ref(alignment))?;
        info!("Saved {}", path.display());
        Ok(path)
    }

    /// Merged full and essential tables. Returns both paths.
    pub fn write_merged(
        &self,
        alignments: &[ImageAlignment],
    ) -> Result<(PathBuf, PathBuf), ReportError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let full_path = unique_output_path(
            &self.output_dir,
            &format!("{REPORT_PREFIX}_All-Data_Processed"),
            "Merged",
            ".csv",
        );
        write_full_table(std::fs::File::create(&full_path)?, alignments)?;
        info!("Saved {}", full_path.display());

        let essential_path = unique_output_path(
            &self.output_dir,
            &format!("{REPORT_PREFIX}_Essential-Data"),
            "Merged",
            ".csv",
        );
        write_essential_table(std::fs::File::create(&essential_path)?, alignments)?;
        info!("Saved {}", essential_path.display());

        Ok((full_path, essential_path))
    }
}
