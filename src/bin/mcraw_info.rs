use clap::Parser;
use mcraw::McrawReader;
use tracing_subscriber::EnvFilter;

/// Inspect a MotionCam container: camera metadata, frames and audio.
#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the .mcraw file
    input: String,

    /// Also load the audio chunks and report their count
    #[arg(long)]
    audio: bool,
}

fn run(args: &Args) -> mcraw::Result<()> {
    let mut reader = McrawReader::open(&args.input)?;

    println!("{}", serde_json::to_string_pretty(reader.metadata_json())?);

    let frames = reader.frames();
    println!("frames: {}", frames.len());
    if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
        println!("first timestamp: {first}");
        println!("last timestamp:  {last}");
    }

    if let (Some(rate), Some(channels)) = (
        reader.audio_sample_rate_hz(),
        reader.num_audio_channels(),
    ) {
        println!("audio: {rate} Hz, {channels} channel(s)");
    }
    if args.audio {
        let chunks = reader.load_audio()?;
        let samples: usize = chunks.iter().map(|c| c.samples.len()).sum();
        println!("audio chunks: {} ({samples} samples)", chunks.len());
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(-1);
    }
}
