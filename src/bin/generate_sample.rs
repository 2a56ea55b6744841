use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic feature table, clinical table and analysis config.
#[derive(Parser, Debug)]
#[command(name = "generate-sample")]
struct Args {
    /// Output directory.
    #[arg(long, default_value = "sample_data")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 120)]
    subjects: usize,

    #[arg(long, default_value_t = 12)]
    features: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// `value` with probability `1 - rate`, NaN otherwise.
    fn drop_out(&mut self, value: f64, rate: f64) -> f64 {
        if self.next_f64() < rate { f64::NAN } else { value }
    }
}

struct Clinical {
    subject: Vec<String>,
    age: Vec<f64>,
    sex: Vec<f64>,
    updrs_iii: Vec<f64>,
    moca: Vec<f64>,
}

fn generate_clinical(n: usize, rng: &mut SimpleRng) -> Clinical {
    let mut c = Clinical {
        subject: Vec::with_capacity(n),
        age: Vec::with_capacity(n),
        sex: Vec::with_capacity(n),
        updrs_iii: Vec::with_capacity(n),
        moca: Vec::with_capacity(n),
    };
    for i in 0..n {
        let age = rng.gauss(65.0, 8.0).clamp(40.0, 90.0).round();
        let sex = if rng.next_f64() < 0.45 { 1.0 } else { 0.0 };
        let severity = rng.gauss(0.0, 1.0);
        c.subject.push(format!("sub-{:03}", i + 1));
        c.age.push(age);
        c.sex.push(sex);
        let updrs = (25.0 + 10.0 * severity + 0.2 * (age - 65.0)).max(0.0).round();
        let moca = (26.0 - 2.0 * severity - 0.1 * (age - 65.0)).clamp(0.0, 30.0).round();
        c.updrs_iii.push(rng.drop_out(updrs, 0.08));
        c.moca.push(rng.drop_out(moca, 0.12));
    }
    c
}

/// Features load partly on age/sex and partly on motor severity.
fn generate_features(
    clinical: &Clinical,
    n_features: usize,
    rng: &mut SimpleRng,
) -> Vec<(String, Vec<f64>)> {
    (0..n_features)
        .map(|j| {
            let age_w = 0.02 * (j % 4) as f64;
            let sex_w = if j % 3 == 0 { 0.3 } else { 0.0 };
            let motor_w = if j < n_features / 2 { 0.01 } else { 0.0 };
            let values = (0..clinical.subject.len())
                .map(|i| {
                    let updrs = clinical.updrs_iii[i];
                    let motor = if updrs.is_nan() { 25.0 } else { updrs };
                    let v = 1.0
                        + age_w * (clinical.age[i] - 65.0)
                        + sex_w * clinical.sex[i]
                        + motor_w * (motor - 25.0)
                        + rng.gauss(0.0, 0.2);
                    rng.drop_out(v, 0.03 + 0.01 * (j % 5) as f64)
                })
                .collect();
            (format!("roi_{:02}", j + 1), values)
        })
        .collect()
}

fn cell(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}

fn write_clinical(path: &std::path::Path, c: &Clinical) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["subject", "age", "sex", "updrs_iii", "moca"])?;
    for i in 0..c.subject.len() {
        wtr.write_record([
            c.subject[i].clone(),
            cell(c.age[i]),
            cell(c.sex[i]),
            cell(c.updrs_iii[i]),
            cell(c.moca[i]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn features_batch(subjects: &[String], features: &[(String, Vec<f64>)]) -> Result<RecordBatch> {
    let mut fields = vec![Field::new("subject", DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        subjects.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))];
    for (name, values) in features {
        fields.push(Field::new(name, DataType::Float64, true));
        let array: Float64Array = values
            .iter()
            .map(|&v| (!v.is_nan()).then_some(v))
            .collect();
        columns.push(Arc::new(array));
    }
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("Failed to create RecordBatch")?;
    Ok(batch)
}

const ANALYSIS_TOML: &str = r#"empty_pairs = "emit_nan"

[input]
features = "features.parquet"
targets = "clinical.csv"
index_column = "subject"

[[correlation]]
scale = "motor"
field_name = "updrs_iii"
correlation = ["pearson", "spearman", "kendall"]

[[correlation]]
scale = "cognition"
field_name = "moca"
correlation = ["spearman"]

[residualize]
covariates = ["age", "sex"]

[output]
workbook = "out/correlations"
missing_values = "out/missing_values.png"
residualized_features = "out/features_residualized.csv"
"#;

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let clinical = generate_clinical(args.subjects, &mut rng);
    let features = generate_features(&clinical, args.features, &mut rng);

    let clinical_path = args.out_dir.join("clinical.csv");
    write_clinical(&clinical_path, &clinical)?;

    // Write Parquet
    let batch = features_batch(&clinical.subject, &features)?;
    let features_path = args.out_dir.join("features.parquet");
    let file = std::fs::File::create(&features_path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    let config_path = args.out_dir.join("analysis.toml");
    std::fs::write(&config_path, ANALYSIS_TOML)?;

    println!("{}", pretty_format_batches(&[batch.slice(0, batch.num_rows().min(5))])?);
    println!(
        "Wrote {} subjects × {} features to {}, clinical scores to {}, config to {}",
        args.subjects,
        args.features,
        features_path.display(),
        clinical_path.display(),
        config_path.display()
    );
    Ok(())
}
