//! Write synthetic 1 kHz gaze recordings for trying out the pipeline.
//!
//! Each trace alternates fixations and saccades, adds measurement noise,
//! drops blinks as runs of `NaN`, and occasionally looks off screen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Generate synthetic gaze traces
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output directory
    #[arg(default_value = "sample_traces")]
    output: PathBuf,

    /// Number of traces
    #[arg(short, long, default_value = "6")]
    traces: usize,

    /// Samples per trace (1 kHz)
    #[arg(short, long, default_value = "20000")]
    samples: usize,

    /// Write .parquet instead of .csv
    #[arg(long)]
    parquet: bool,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

/// SplitMix64, enough for test data.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let u = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + (hi - lo) * u
    }

    /// Box-Muller
    fn gauss(&mut self, std_dev: f64) -> f64 {
        let u1 = self.uniform(0.0, 1.0).max(1e-15);
        let u2 = self.uniform(0.0, 1.0);
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.uniform(0.0, 1.0) < p
    }
}

struct Recording {
    x: Vec<Option<f64>>,
    y: Vec<Option<f64>>,
    /// GazeBase-style validity flag, 0 = valid.
    val: Vec<i64>,
}

fn generate_trace(len: usize, rng: &mut Rng) -> Recording {
    let mut x = Vec::with_capacity(len);
    let mut y = Vec::with_capacity(len);
    let mut val = Vec::with_capacity(len);

    let (mut gx, mut gy) = (0.0_f64, 0.0_f64);
    while x.len() < len {
        // Saccade to a new target, ~2 deg per ms at peak
        let (tx, ty) = if rng.chance(0.03) {
            (rng.uniform(25.0, 35.0), rng.uniform(-5.0, 5.0))
        } else {
            (rng.uniform(-20.0, 20.0), rng.uniform(-15.0, 10.0))
        };
        let amplitude = (tx - gx).hypot(ty - gy);
        let duration = (20.0 + 2.2 * amplitude).round() as usize;
        for k in 0..duration {
            let s = (k + 1) as f64 / duration as f64;
            // Smooth-step velocity profile
            let p = s * s * (3.0 - 2.0 * s);
            x.push(Some(gx + (tx - gx) * p + rng.gauss(0.02)));
            y.push(Some(gy + (ty - gy) * p + rng.gauss(0.02)));
            val.push(0);
        }
        gx = tx;
        gy = ty;

        let fixation = rng.uniform(150.0, 600.0) as usize;
        let (mut dx, mut dy) = (0.0, 0.0);
        for _ in 0..fixation {
            // Drift plus tremor
            dx += rng.gauss(0.003);
            dy += rng.gauss(0.003);
            x.push(Some(gx + dx + rng.gauss(0.02)));
            y.push(Some(gy + dy + rng.gauss(0.02)));
            val.push(0);
        }
        gx += dx;
        gy += dy;

        if rng.chance(0.15) {
            let blink = rng.uniform(80.0, 250.0) as usize;
            for _ in 0..blink {
                x.push(None);
                y.push(None);
                val.push(4);
            }
        }
    }

    x.truncate(len);
    y.truncate(len);
    val.truncate(len);
    Recording { x, y, val }
}

fn write_csv(path: &Path, rec: &Recording) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("creating CSV")?;
    wtr.write_record(["n", "x", "y", "val"])?;
    let fmt = |v: Option<f64>| v.map_or_else(|| "NaN".to_string(), |v| format!("{v:.4}"));
    for (n, ((x, y), val)) in rec.x.iter().zip(&rec.y).zip(&rec.val).enumerate() {
        wtr.write_record([n.to_string(), fmt(*x), fmt(*y), val.to_string()])?;
    }
    wtr.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, rec: &Recording) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("n", DataType::Int64, false),
        Field::new("x", DataType::Float64, true),
        Field::new("y", DataType::Float64, true),
        Field::new("val", DataType::Int64, false),
    ]));
    let n = Int64Array::from_iter_values(0..rec.x.len() as i64);
    let x: Float64Array = rec.x.iter().copied().collect();
    let y: Float64Array = rec.y.iter().copied().collect();
    let val = Int64Array::from(rec.val.clone());

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(n), Arc::new(x), Arc::new(y), Arc::new(val)],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = Rng(args.seed);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let ext = if args.parquet { "parquet" } else { "csv" };
    for i in 0..args.traces {
        let rec = generate_trace(args.samples, &mut rng);
        let path = args
            .output
            .join(format!("S_{:04}_S1_RAN.{ext}", 1001 + i));
        if args.parquet {
            write_parquet(&path, &rec)?;
        } else {
            write_csv(&path, &rec)?;
        }
        let missing = rec.x.iter().filter(|v| v.is_none()).count();
        log::info!("{}: {} samples, {missing} missing", path.display(), args.samples);
    }

    println!(
        "Wrote {} traces ({} samples each) to {}",
        args.traces,
        args.samples,
        args.output.display()
    );
    Ok(())
}
