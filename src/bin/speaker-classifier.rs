//! Speaker classifier CLI — inspect a model configuration.
//!
//! Builds the network from a hyperparameter file (or the defaults), prints the
//! declared inputs and the parameter table to stderr, and runs one forward
//! pass on a synthetic batch.
//!
//! # Output
//!
//! A one-line JSON summary on stdout:
//!
//! ```json
//! {"parameters":42,"elements":1234567,"batch_size":2,"frames":161,"num_classes":100,"loss":4.61,"accuracy":0.0}
//! ```
//!
//! Exit code 0 on success, non-zero on error.

use candle_core::{DType, Device, Tensor};
use clap::Parser;
use speaker_classifier::{
    config::HParams,
    inputs::Batch,
    model::{classifier::ClassificationModel, Mode},
    params::ParameterRegistry,
};

#[derive(Parser, Debug)]
#[command(
    name = "speaker-classifier",
    about = "Build the speaker classifier and run a dry forward pass",
    long_about = "Build the speaker classifier from a JSON hyperparameter file,\n\
                  print its inputs and parameters, and run one forward pass on\n\
                  random data. A JSON summary line is printed to stdout."
)]
struct Args {
    /// Hyperparameter JSON. Omitted fields keep their defaults.
    #[arg(long, short = 'p')]
    hparams: Option<String>,

    /// Synthetic batch size.
    #[arg(long, short = 'b', default_value_t = 2)]
    batch_size: usize,

    /// Run the forward pass in training mode (batch statistics).
    #[arg(long)]
    train: bool,

    /// Print every parameter with its shape.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }

    let hp = match &args.hparams {
        Some(path) => HParams::from_json_file(path)?,
        None => HParams::default(),
    };

    let device = Device::Cpu;
    let registry = ParameterRegistry::new(DType::F32, &device);
    let model = ClassificationModel::new(&hp, &registry)?;

    eprintln!("params {} on {:?} ({:?})", registry.len(), registry.device(), registry.dtype());
    for desc in model.inputs() {
        eprintln!("input  {:<12} {:?} {}", desc.name, desc.dtype, desc.shape_string());
    }
    if args.verbose {
        for name in registry.names() {
            if let Some(t) = registry.get(&name) {
                eprintln!("param  {name:<56} {:?}", t.dims());
            }
        }
    }

    let hp = model.hparams();
    let n = args.batch_size;
    let signal = &hp.signal;
    let wav = Tensor::randn(0f32, 1.0, (n, signal.length()), &device)?;
    let x = Tensor::randn(0f32, 1.0, (n, signal.length_spec(), signal.n_mels), &device)?;
    let ids: Vec<u32> = (0..n).map(|i| (i % hp.model.num_classes) as u32).collect();
    let speaker_id = Tensor::new(ids.as_slice(), &device)?;
    let batch = Batch::new(wav, x, speaker_id);

    let mode = Mode::from(args.train);
    let out = model.build_graph(&batch, mode)?;
    let summary = out.summary()?;
    tracing::info!(loss = summary.loss, accuracy = summary.accuracy, ?mode, "dry run done");

    let json = serde_json::json!({
        "parameters": registry.len(),
        "elements": registry.num_elements(),
        "batch_size": n,
        "frames": signal.length_spec(),
        "num_classes": hp.model.num_classes,
        "loss": summary.loss,
        "accuracy": summary.accuracy,
    });
    println!("{json}");

    Ok(())
}
