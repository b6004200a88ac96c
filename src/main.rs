use civic_cast::mixdown::{mixdown, mixdown_with_rate};
use civic_cast::settings::MixingSettings;
use civic_cast::track::AudioTrack;
use clap::{Parser, Subcommand};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "civicast", about = "Municipal announcement mixdown CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix speech, music, and effect into a broadcast WAV
    Mix {
        /// Narrated speech (TTS) audio file
        #[arg(long)]
        tts: Option<PathBuf>,
        /// Background music audio file
        #[arg(long)]
        bgm: Option<PathBuf>,
        /// Sound effect audio file
        #[arg(long)]
        effect: Option<PathBuf>,
        /// Mixing settings JSON (camelCase fields; missing fields default)
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
        /// Force the output sample rate instead of following the inputs
        #[arg(long)]
        sample_rate: Option<u32>,
    },
    /// Show metadata for input audio files
    Probe {
        /// Audio file path(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the default mixing settings as JSON
    Defaults,
}

fn load_settings(path: Option<&Path>) -> Result<MixingSettings, String> {
    match path {
        None => Ok(MixingSettings::default()),
        Some(p) => {
            let data = std::fs::read_to_string(p)
                .map_err(|e| format!("Cannot read '{}': {}", p.display(), e))?;
            serde_json::from_str(&data)
                .map_err(|e| format!("Invalid settings JSON '{}': {}", p.display(), e))
        }
    }
}

fn decode_optional(path: Option<&Path>, label: &str) -> Result<Option<AudioTrack>, String> {
    match path {
        None => Ok(None),
        Some(p) => {
            let track = AudioTrack::decode_file(p)?;
            println!(
                "  {}: {} ({:.2}s, {} ch, {} Hz)",
                label,
                p.display(),
                track.duration_secs(),
                track.channel_count(),
                track.sample_rate()
            );
            Ok(Some(track))
        }
    }
}

fn probe_file(path: &Path) -> Result<(), String> {
    let tagged_file = lofty::read_from_path(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let properties = tagged_file.properties();
    let duration = properties.duration();
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .unwrap_or_else(|| "Unknown".to_string());

    println!(
        "{}: {} [{}:{:02}]",
        path.display(),
        title,
        duration.as_secs() / 60,
        duration.as_secs() % 60
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Mix {
            tts,
            bgm,
            effect,
            settings,
            output,
            sample_rate,
        } => {
            let settings = match load_settings(settings.as_deref()) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            println!("Decoding inputs...");
            let decoded = (|| {
                Ok::<_, String>((
                    decode_optional(tts.as_deref(), "tts")?,
                    decode_optional(bgm.as_deref(), "bgm")?,
                    decode_optional(effect.as_deref(), "effect")?,
                ))
            })();
            let (tts, bgm, effect) = match decoded {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            if tts.is_none() && bgm.is_none() && effect.is_none() {
                eprintln!("Error: no input tracks given (use --tts/--bgm/--effect).");
                std::process::exit(1);
            }

            let out = match sample_rate {
                Some(rate) => {
                    mixdown_with_rate(tts.as_ref(), bgm.as_ref(), effect.as_ref(), &settings, rate)
                }
                None => mixdown(tts.as_ref(), bgm.as_ref(), effect.as_ref(), &settings),
            };

            if let Err(e) = std::fs::write(&output, &out.wav) {
                eprintln!("Error: cannot write '{}': {}", output.display(), e);
                std::process::exit(1);
            }
            println!(
                "Wrote {} ({:.2}s @ {} Hz, {} bytes)",
                output.display(),
                out.duration_secs,
                out.sample_rate,
                out.wav.len()
            );
        }
        Commands::Probe { files } => {
            for file in &files {
                if let Err(e) = probe_file(file) {
                    eprintln!("  Error: {}", e);
                }
            }
        }
        Commands::Defaults => {
            let json = serde_json::to_string_pretty(&MixingSettings::default())
                .expect("defaults always serialize");
            println!("{}", json);
        }
    }
}
