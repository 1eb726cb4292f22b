use clap::Parser;
use mcraw::dng::write_frame_dng;
use mcraw::McrawReader;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Decode frames from a MotionCam container.
///
/// By default every decoded frame is written to stdout as raw u16 samples in
/// host byte order, ready to pipe into ffmpeg; with --dng each frame becomes
/// a DNG file in the given directory.
#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the .mcraw file
    input: String,

    /// Stop after this many frames
    #[arg(short = 'n', long = "num-frames")]
    num_frames: Option<usize>,

    /// Write one DNG per frame into this directory instead of raw samples
    #[arg(long, value_name = "DIR")]
    dng: Option<PathBuf>,
}

fn run(args: &Args) -> mcraw::Result<()> {
    let mut reader = McrawReader::open(&args.input)?;
    let timestamps = reader.frames().to_vec();
    let end = args.num_frames.unwrap_or(timestamps.len()).min(timestamps.len());

    if let Some(dir) = &args.dng {
        std::fs::create_dir_all(dir)?;
        let container = reader.metadata()?.clone();
        for (index, &timestamp) in timestamps[..end].iter().enumerate() {
            let (pixels, frame) = reader.load_frame(timestamp)?;
            let path = dir.join(format!("frame_{index:06}.dng"));
            let file = BufWriter::new(File::create(&path)?);
            write_frame_dng(file, &pixels, &frame, &container)?;
        }
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut expected_len = None;
    for &timestamp in &timestamps[..end] {
        let (pixels, _) = reader.load_frame(timestamp)?;
        match expected_len {
            None => expected_len = Some(pixels.len()),
            Some(len) if len != pixels.len() => {
                return Err(mcraw::McrawError::Format("frame size mismatch".to_string()));
            }
            _ => {}
        }
        for sample in pixels {
            out.write_all(&sample.to_ne_bytes())?;
        }
    }
    out.flush()?;

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
