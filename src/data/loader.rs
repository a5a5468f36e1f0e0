use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Error, Result};

use super::model::{Sample, Trace};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one gaze trace from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, then `n, x, y[, ...]`; extra columns are ignored
/// * `.parquet` – first three columns are `n`, `x`, `y`; nulls are missing
///
/// `missing_token` is the literal that marks a missing coordinate in CSV.
pub fn load_trace(path: &Path, missing_token: &str) -> Result<Trace> {
    match extension(path).as_str() {
        "csv" => load_csv(path, missing_token),
        "parquet" | "pq" => load_parquet(path),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Lower-cased extension, empty when there is none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// File stem used as the trace identifier.
pub fn trace_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout, as exported by GazeBase:
///
/// ```text
/// n,x,y,val,...
/// 0,-0.512,1.093,0,...
/// 1,NaN,NaN,4,...
/// ```
///
/// Columns are taken by position, not by name.
fn load_csv(path: &Path, missing_token: &str) -> Result<Trace> {
    let id = trace_id(path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::csv(path, e))?;

    let headers = reader.headers().map_err(|e| Error::csv(path, e))?.clone();
    if headers.len() < 3 {
        return Err(structural(&id, 0, format!(
            "expected at least 3 columns, header has {}",
            headers.len()
        )));
    }

    let mut samples: Vec<Sample> = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::csv(path, e))?;
        let row = i + 1;

        if record.len() < 3 {
            return Err(structural(&id, row, format!(
                "expected at least 3 fields, found {}",
                record.len()
            )));
        }

        let n = parse_index(&record[0]).ok_or_else(|| {
            structural(&id, row, format!("sample index '{}' is not an integer", &record[0]))
        })?;
        let x = parse_coordinate(&record[1], missing_token)
            .map_err(|tok| structural(&id, row, format!("x value '{tok}' is not a number")))?;
        let y = parse_coordinate(&record[2], missing_token)
            .map_err(|tok| structural(&id, row, format!("y value '{tok}' is not a number")))?;

        push_increasing(&mut samples, Sample { n, x, y }, &id, row)?;
    }

    let mut trace = Trace::new(id, samples);
    for (slot, name) in trace.columns.iter_mut().zip(headers.iter()) {
        *slot = name.trim().to_string();
    }
    Ok(trace)
}

/// Integer index; integral floats such as `12.0` are accepted.
fn parse_index(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

/// `Ok(None)` for the missing token, an empty field or a NaN literal.
fn parse_coordinate<'a>(s: &'a str, missing_token: &str) -> std::result::Result<Option<f64>, &'a str> {
    let s = s.trim();
    if s.is_empty() || s == missing_token {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(s),
    }
}

fn push_increasing(samples: &mut Vec<Sample>, sample: Sample, id: &str, row: usize) -> Result<()> {
    if let Some(prev) = samples.last() {
        if sample.n <= prev.n {
            return Err(structural(id, row, format!(
                "sample index {} does not increase (previous {})",
                sample.n, prev.n
            )));
        }
    }
    samples.push(sample);
    Ok(())
}

fn structural(id: &str, row: usize, reason: String) -> Error {
    Error::Structural {
        trace: id.to_string(),
        row,
        reason,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet trace.
///
/// Expected schema (by position):
/// - index: Int64 / Int32, or integral Float64
/// - x, y: Float64 / Float32, nullable
///
/// Rows are counted across record batches, from 1, for error reporting.
fn load_parquet(path: &Path) -> Result<Trace> {
    let id = trace_id(path);
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::parquet(path, e))?;

    let fields = builder.schema().fields().clone();
    if fields.len() < 3 {
        return Err(structural(&id, 0, format!(
            "expected at least 3 columns, schema has {}",
            fields.len()
        )));
    }

    let reader = builder.build().map_err(|e| Error::parquet(path, e))?;
    let mut samples: Vec<Sample> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| Error::parquet(path, e))?;
        let n_col = batch.column(0);
        let x_col = batch.column(1);
        let y_col = batch.column(2);

        for i in 0..batch.num_rows() {
            let row = samples.len() + 1;
            let n = extract_index(n_col, i)
                .map_err(|reason| structural(&id, row, reason))?;
            let x = extract_coordinate(x_col, i)
                .map_err(|reason| structural(&id, row, format!("x: {reason}")))?;
            let y = extract_coordinate(y_col, i)
                .map_err(|reason| structural(&id, row, format!("y: {reason}")))?;
            push_increasing(&mut samples, Sample { n, x, y }, &id, row)?;
        }
    }

    let mut trace = Trace::new(id, samples);
    for (slot, field) in trace.columns.iter_mut().zip(fields.iter()) {
        *slot = field.name().clone();
    }
    Ok(trace)
}

// -- Parquet / Arrow helpers --

fn extract_index(col: &Arc<dyn Array>, row: usize) -> std::result::Result<i64, String> {
    if col.is_null(row) {
        return Err("null sample index".to_string());
    }
    match col.data_type() {
        DataType::Int64 => downcast::<Int64Array>(col).map(|a| a.value(row)),
        DataType::Int32 => downcast::<Int32Array>(col).map(|a| a.value(row) as i64),
        DataType::Float64 => {
            let v = downcast::<Float64Array>(col)?.value(row);
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(format!("sample index {v} is not an integer"))
            }
        }
        other => Err(format!("index column has type {other:?}, expected an integer")),
    }
}

fn extract_coordinate(col: &Arc<dyn Array>, row: usize) -> std::result::Result<Option<f64>, String> {
    if col.is_null(row) {
        return Ok(None);
    }
    let v = match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row),
        DataType::Float32 => downcast::<Float32Array>(col)?.value(row) as f64,
        other => return Err(format!("column has type {other:?}, expected Float64 or Float32")),
    };
    Ok(if v.is_nan() { None } else { Some(v) })
}

fn downcast<T: 'static>(col: &Arc<dyn Array>) -> std::result::Result<&T, String> {
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| format!("unexpected array layout for {:?}", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_csv_with_missing_tokens_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "S_1001_S1_RAN.csv",
            "n,x,y,val\n0,1.5,-2.0,0\n1,NaN,NaN,4\n2,,,4\n3.0,0.25,0.5,0\n",
        );
        let trace = load_trace(&path, "NaN").unwrap();
        assert_eq!(trace.id, "S_1001_S1_RAN");
        assert_eq!(trace.columns, ["n", "x", "y"].map(String::from));
        assert_eq!(
            trace.samples,
            vec![
                Sample::new(0, 1.5, -2.0),
                Sample::missing(1),
                Sample::missing(2),
                Sample::new(3, 0.25, 0.5),
            ]
        );
    }

    #[test]
    fn non_numeric_coordinate_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.csv", "n,x,y\n0,1.0,2.0\n1,abc,2.0\n");
        match load_trace(&path, "NaN") {
            Err(Error::Structural { trace, row, reason }) => {
                assert_eq!(trace, "bad");
                assert_eq!(row, 2);
                assert!(reason.contains("abc"));
            }
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn short_rows_and_bad_indices_are_structural() {
        let dir = tempfile::tempdir().unwrap();
        let short = write_file(dir.path(), "short.csv", "n,x,y\n0,1.0\n");
        assert!(matches!(load_trace(&short, "NaN"), Err(Error::Structural { .. })));

        let narrow = write_file(dir.path(), "narrow.csv", "n,x\n0,1.0\n");
        assert!(matches!(load_trace(&narrow, "NaN"), Err(Error::Structural { .. })));

        let repeated = write_file(dir.path(), "repeated.csv", "n,x,y\n0,1,1\n0,1,1\n");
        assert!(matches!(load_trace(&repeated, "NaN"), Err(Error::Structural { .. })));

        let fractional = write_file(dir.path(), "fractional.csv", "n,x,y\n0.5,1,1\n");
        assert!(matches!(load_trace(&fractional, "NaN"), Err(Error::Structural { .. })));
    }

    #[test]
    fn rows_count_data_records_from_one_in_both_formats() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let dir = tempfile::tempdir().unwrap();
        let csv_path = write_file(dir.path(), "dup.csv", "n,x,y\n5,1.0,1.0\n5,1.0,1.0\n");
        let pq_path = dir.path().join("dup.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("n", DataType::Int64, false),
            Field::new("x", DataType::Float64, true),
            Field::new("y", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![5, 5])),
                Arc::new(Float64Array::from(vec![1.0, 1.0])),
                Arc::new(Float64Array::from(vec![1.0, 1.0])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&pq_path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        for path in [&csv_path, &pq_path] {
            match load_trace(path, "NaN") {
                Err(Error::Structural { row, .. }) => assert_eq!(row, 2, "{}", path.display()),
                other => panic!("expected structural error, got {other:?}"),
            }
        }

        let narrow = write_file(dir.path(), "narrow.csv", "n,x\n0,1.0\n");
        assert!(matches!(load_trace(&narrow, "NaN"), Err(Error::Structural { row: 0, .. })));
    }

    #[test]
    fn custom_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "na.csv", "n,x,y\n0,NA,NA\n1,nan,1.0\n");
        let trace = load_trace(&path, "NA").unwrap();
        assert_eq!(trace.samples[0], Sample::missing(0));
        assert_eq!(trace.samples[1].x, None);
        assert_eq!(trace.samples[1].y, Some(1.0));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(matches!(
            load_trace(Path::new("trace.txt"), "NaN"),
            Err(Error::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }
}
