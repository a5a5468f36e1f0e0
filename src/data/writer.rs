use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::loader::extension;
use super::model::Trace;

// ---------------------------------------------------------------------------
// Staged output
// ---------------------------------------------------------------------------

/// A fully written trace file that is not yet visible under its final name.
///
/// Dropping a staged file deletes it, so a trace whose outputs are not all
/// committed leaves nothing behind.
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically move the file into place.
    pub fn commit(self) -> Result<PathBuf> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| Error::io(&target, e.error))?;
        Ok(target)
    }
}

/// Write `trace` next to `target`. The format follows the target's extension.
pub fn stage_trace(trace: &Trace, target: &Path, missing_token: &str) -> Result<StagedFile> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".gaze-split-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    match extension(target).as_str() {
        "csv" => write_csv(trace, temp.as_file_mut(), missing_token)
            .map_err(|e| Error::csv(target, e))?,
        "parquet" | "pq" => write_parquet(trace, temp.as_file_mut(), target)?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    }

    Ok(StagedFile {
        temp,
        target: target.to_path_buf(),
    })
}

/// Write several traces so that either all of them appear or none does.
pub fn write_all(outputs: &[(&Trace, PathBuf)], missing_token: &str) -> Result<Vec<PathBuf>> {
    let staged = outputs
        .iter()
        .map(|(trace, target)| stage_trace(trace, target, missing_token))
        .collect::<Result<Vec<_>>>()?;
    staged.into_iter().map(StagedFile::commit).collect()
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn write_csv<W: Write>(trace: &Trace, out: W, missing_token: &str) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(&trace.columns)?;
    for s in &trace.samples {
        wtr.write_record([
            s.n.to_string(),
            format_coordinate(s.x, missing_token),
            format_coordinate(s.y, missing_token),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Shortest representation that reads back to the same `f64` (`1.0`, `-0.0312`).
pub fn format_coordinate(v: Option<f64>, missing_token: &str) -> String {
    match v {
        Some(v) => format!("{v:?}"),
        None => missing_token.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn write_parquet<W: Write + Send>(trace: &Trace, out: W, target: &Path) -> Result<()> {
    let [n_name, x_name, y_name] = &trace.columns;
    let schema = Arc::new(Schema::new(vec![
        Field::new(n_name, DataType::Int64, false),
        Field::new(x_name, DataType::Float64, true),
        Field::new(y_name, DataType::Float64, true),
    ]));

    let n = Int64Array::from_iter_values(trace.samples.iter().map(|s| s.n));
    let x: Float64Array = trace.samples.iter().map(|s| s.x).collect();
    let y: Float64Array = trace.samples.iter().map(|s| s.y).collect();

    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(n), Arc::new(x), Arc::new(y)])
        .map_err(|e| Error::parquet(target, e))?;

    let mut writer = ArrowWriter::try_new(out, schema, None).map_err(|e| Error::parquet(target, e))?;
    writer.write(&batch).map_err(|e| Error::parquet(target, e))?;
    writer.close().map_err(|e| Error::parquet(target, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_trace;
    use crate::data::model::Sample;

    fn sample_trace() -> Trace {
        Trace::new(
            "written",
            vec![
                Sample::new(10, 1.0, -0.0312),
                Sample::missing(11),
                Sample::new(12, 23.3, 11.7),
            ],
        )
    }

    #[test]
    fn csv_uses_missing_token_and_keeps_header() {
        let mut trace = sample_trace();
        trace.columns[0] = "sample".to_string();
        let mut buf = Vec::new();
        write_csv(&trace, &mut buf, "NaN").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "sample,x,y\n10,1.0,-0.0312\n11,NaN,NaN\n12,23.3,11.7\n"
        );
    }

    #[test]
    fn csv_and_parquet_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let trace = sample_trace();
        for name in ["written.csv", "written.parquet"] {
            let target = dir.path().join(name);
            let path = stage_trace(&trace, &target, "NaN").unwrap().commit().unwrap();
            assert_eq!(path, target);
            let back = load_trace(&target, "NaN").unwrap();
            assert_eq!(back.samples, trace.samples);
            assert_eq!(back.columns, trace.columns);
        }
    }

    #[test]
    fn uncommitted_files_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dropped.csv");
        let staged = stage_trace(&sample_trace(), &target, "NaN").unwrap();
        assert_eq!(staged.target(), target.as_path());
        drop(staged);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_all_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let trace = sample_trace();
        let outputs = vec![
            (&trace, dir.path().join("ok.csv")),
            (&trace, dir.path().join("bad.txt")),
        ];
        assert!(write_all(&outputs, "NaN").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
