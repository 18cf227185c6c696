use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use log::info;
use parquet::arrow::ArrowWriter;

const WEATHER: &[&str] = &["Cloudy", "Fog", "Sandstorms", "Stormy", "Sunny", "Windy"];
const TRAFFIC: &[&str] = &["Low", "Medium", "High", "Jam"];
const VEHICLE: &[&str] = &["motorcycle", "scooter", "van", "bicycle"];
const AREA: &[&str] = &["Urban", "Metropolitian", "Semi-Urban", "Other"];
const CATEGORY: &[&str] = &[
    "Apparel", "Books", "Clothing", "Cosmetics", "Electronics", "Grocery", "Home", "Jewelry",
    "Kitchen", "Outdoors", "Pet Supplies", "Shoes", "Skincare", "Snacks", "Sports", "Toys",
];

/// Share of cells left empty in the nullable columns.
const NULL_RATE: f64 = 0.02;

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic last-mile delivery dataset (CSV or Parquet)")]
struct Args {
    /// Output path; a `.parquet` extension selects Parquet
    #[arg(default_value = "cleaned_delivery_data.csv")]
    output: PathBuf,

    #[arg(long, default_value = "2000")]
    rows: usize,

    #[arg(long, default_value = "42")]
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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    fn pick(&mut self, choices: &[&'static str]) -> usize {
        (self.next_u64() % choices.len() as u64) as usize
    }

    fn sometimes_null<T>(&mut self, value: T) -> Option<T> {
        (self.next_f64() >= NULL_RATE).then_some(value)
    }
}

#[derive(Default)]
struct Columns {
    weather: Vec<Option<&'static str>>,
    traffic: Vec<Option<&'static str>>,
    vehicle: Vec<Option<&'static str>>,
    area: Vec<Option<&'static str>>,
    category: Vec<Option<&'static str>>,
    agent_rating: Vec<Option<f64>>,
    agent_age: Vec<Option<i64>>,
    delivery_time: Vec<f64>,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Columns {
    let mut cols = Columns::default();
    for _ in 0..rows {
        let w = rng.pick(WEATHER);
        let t = rng.pick(TRAFFIC);
        let v = rng.pick(VEHICLE);
        let a = rng.pick(AREA);
        let c = rng.pick(CATEGORY);
        let age = 20 + (rng.next_u64() % 30) as i64;
        let rating = (rng.gauss(4.6, 0.3).clamp(1.0, 5.0) * 10.0).round() / 10.0;

        // Congestion and bad weather dominate; better-rated agents are a bit faster.
        let base = 90.0 + 25.0 * t as f64 + 8.0 * (w % 3) as f64 + 6.0 * v as f64;
        let time = (base - 10.0 * (rating - 4.5) + rng.gauss(0.0, 25.0)).max(10.0).round();

        cols.weather.push(rng.sometimes_null(WEATHER[w]));
        cols.traffic.push(rng.sometimes_null(TRAFFIC[t]));
        cols.vehicle.push(rng.sometimes_null(VEHICLE[v]));
        cols.area.push(rng.sometimes_null(AREA[a]));
        cols.category.push(rng.sometimes_null(CATEGORY[c]));
        cols.agent_rating.push(rng.sometimes_null(rating));
        cols.agent_age.push(rng.sometimes_null(age));
        cols.delivery_time.push(time);
    }
    cols
}

fn write_csv(path: &Path, cols: &Columns) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record([
        "Agent_Age",
        "Agent_Rating",
        "Weather",
        "Traffic",
        "Vehicle",
        "Area",
        "Delivery_Time",
        "Category",
    ])?;
    let text = |v: Option<&str>| v.unwrap_or("").to_string();
    for i in 0..cols.delivery_time.len() {
        writer.write_record([
            cols.agent_age[i].map(|a| a.to_string()).unwrap_or_default(),
            cols.agent_rating[i].map(|r| r.to_string()).unwrap_or_default(),
            text(cols.weather[i]),
            text(cols.traffic[i]),
            text(cols.vehicle[i]),
            text(cols.area[i]),
            cols.delivery_time[i].to_string(),
            text(cols.category[i]),
        ])?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, cols: &Columns) -> Result<()> {
    let strings = |v: &[Option<&'static str>]| -> ArrayRef {
        Arc::new(StringArray::from(v.to_vec()))
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new("Agent_Age", DataType::Int64, true),
        Field::new("Agent_Rating", DataType::Float64, true),
        Field::new("Weather", DataType::Utf8, true),
        Field::new("Traffic", DataType::Utf8, true),
        Field::new("Vehicle", DataType::Utf8, true),
        Field::new("Area", DataType::Utf8, true),
        Field::new("Delivery_Time", DataType::Float64, false),
        Field::new("Category", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(cols.agent_age.clone())),
            Arc::new(Float64Array::from(cols.agent_rating.clone())),
            strings(&cols.weather),
            strings(&cols.traffic),
            strings(&cols.vehicle),
            strings(&cols.area),
            Arc::new(Float64Array::from(cols.delivery_time.clone())),
            strings(&cols.category),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let cols = generate(args.rows, &mut rng);

    let is_parquet = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&args.output, &cols)?;
    } else {
        write_csv(&args.output, &cols)?;
    }

    info!("seed {}", args.seed);
    println!("Wrote {} deliveries to {}", args.rows, args.output.display());
    Ok(())
}
