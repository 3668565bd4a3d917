use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::correct::CorrectedMeasurement;
use crate::error::Result;
use crate::measurement::Measurement;

/// Input row as written by the forced-photometry pipeline. Unknown columns
/// are ignored.
#[derive(Debug, Deserialize)]
struct InputRow {
    obsmjd: f64,
    ampl: f64,
    #[serde(rename = "ampl.err")]
    ampl_err: f64,
    magzp: f64,
    fieldid: u32,
    ccdid: u32,
    qid: u32,
    filterid: u32,
    #[serde(default = "default_pass")]
    pass: u8,
}

fn default_pass() -> u8 {
    1
}

#[derive(Debug, Serialize)]
struct OutputRow {
    obsmjd: f64,
    ampl: f64,
    #[serde(rename = "ampl.err")]
    ampl_err: f64,
    magzp: f64,
    fieldid: u32,
    ccdid: u32,
    qid: u32,
    filterid: u32,
    pass: u8,
    fcqfid: u64,
    ampl_corr: Option<f64>,
    ampl_err_corr: Option<f64>,
    baseline: Option<f64>,
    baseline_err_mult: Option<f64>,
    n_baseline: usize,
    in_transient_window: u8,
    baseline_side: String,
    magpsf: Option<f64>,
    sigmapsf: Option<f64>,
}

impl From<&CorrectedMeasurement> for OutputRow {
    fn from(row: &CorrectedMeasurement) -> Self {
        let m = &row.measurement;
        let mag = row.magnitude();
        Self {
            obsmjd: m.mjd,
            ampl: m.flux,
            ampl_err: m.flux_err,
            magzp: m.zeropoint,
            fieldid: m.field_id,
            ccdid: m.chip_id,
            qid: m.quadrant_id,
            filterid: m.filter_id,
            pass: m.pass as u8,
            fcqfid: row.group.fcqfid(),
            ampl_corr: row.corrected_flux,
            ampl_err_corr: row.corrected_flux_err,
            baseline: row.baseline,
            baseline_err_mult: row.baseline_err_mult,
            n_baseline: row.baseline_samples,
            in_transient_window: row.in_transient_window as u8,
            baseline_side: row.side.to_string(),
            magpsf: mag.map(|(m, _)| m),
            sigmapsf: mag.map(|(_, e)| e),
        }
    }
}

/// Read a measurement table from CSV. Lines starting with `#` are skipped.
///
/// Rows are numbered in file order; values are not validated here.
pub fn read_measurements<R: Read>(reader: R) -> Result<Vec<Measurement>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<InputRow>()
        .enumerate()
        .map(|(row, record)| -> Result<Measurement> {
            let r = record?;
            Ok(Measurement {
                row,
                mjd: r.obsmjd,
                flux: r.ampl,
                flux_err: r.ampl_err,
                zeropoint: r.magzp,
                field_id: r.fieldid,
                chip_id: r.ccdid,
                quadrant_id: r.qid,
                filter_id: r.filterid,
                pass: r.pass == 1,
            })
        })
        .collect()
}

pub fn read_measurements_path(path: &Path) -> Result<Vec<Measurement>> {
    let file = std::fs::File::open(path)?;
    read_measurements(std::io::BufReader::new(file))
}

/// Write corrected rows as CSV, including derived magnitudes.
pub fn write_corrected<W: Write>(writer: W, rows: &[CorrectedMeasurement]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(OutputRow::from(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_corrected_path(path: &Path, rows: &[CorrectedMeasurement]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_corrected(std::io::BufWriter::new(file), rows)
}
