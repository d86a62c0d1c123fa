use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use robinwood_core::{Operation, PipelineType};
use robinwood_engine::audio::{AudioOutputFormat, FfmpegTranscoder};
use robinwood_engine::{AudioInput, RequestContext, StealRequest, StealService};
use robinwood_settings::RobinwoodSettings;
use robinwood_store::{Database, SqliteUsageStore};
use robinwood_telemetry::{bootstrap_subscriber, init_telemetry, parse_level, TelemetryConfig};

#[derive(Parser)]
#[command(name = "robinwood", version, about = "Shrink text and audio payloads and meter the savings")]
struct Cli {
    /// Settings file (defaults to ~/.robinwood/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// User the run is metered against.
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// API key id recorded on usage events.
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the text pipeline over a file or stdin.
    Text {
        /// Input file; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        ops: OpsArgs,
    },
    /// Run the audio pipeline over a file.
    Audio {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Input is headerless mono f32le at 44.1 kHz.
        #[arg(long)]
        raw: bool,
        /// raw, wav, mp3 or mp3@<kbps>k.
        #[arg(long, default_value = "wav")]
        format: AudioOutputFormat,
        #[command(flatten)]
        ops: OpsArgs,
    },
    /// List presets for a pipeline type.
    Presets { kind: PipelineType },
    /// List the operations a pipeline type accepts.
    Operations { kind: PipelineType },
    /// Show quota and recent usage events.
    Usage {
        #[arg(long, default_value_t = 10)]
        history: u32,
    },
}

#[derive(Args)]
struct OpsArgs {
    /// Preset id: chill, medium, aggressive or podcast.
    #[arg(long, conflicts_with = "ops")]
    preset: Option<String>,
    /// Operations as a JSON array, e.g. '[{"type":"trim"}]'.
    #[arg(long)]
    ops: Option<String>,
}

impl OpsArgs {
    fn into_request(self) -> anyhow::Result<StealRequest> {
        match (self.preset, self.ops) {
            (Some(id), _) => Ok(StealRequest::preset(id)),
            (None, Some(json)) => {
                let operations: Vec<Operation> =
                    serde_json::from_str(&json).context("--ops must be a JSON array of operations")?;
                Ok(StealRequest::operations(operations))
            }
            (None, None) => bail!("pass --preset or --ops"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Warnings raised while loading settings go to a stderr-only subscriber.
    let settings = tracing::subscriber::with_default(bootstrap_subscriber(), || match &cli.settings {
        Some(path) => robinwood_settings::load_settings_from_path(path),
        None => robinwood_settings::load_settings(),
    })?;
    init_telemetry(&telemetry_config(&settings));

    let db_path = PathBuf::from(&settings.usage.database_path);
    let db = Database::open(&db_path).context("opening usage database")?;
    let store = SqliteUsageStore::new(db.clone());
    store
        .users()
        .get_or_create(&cli.user, None, settings.usage.default_tokens_limit)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let transcoder = FfmpegTranscoder::new(&settings.transcoder).with_cancellation(cancel);
    let service = StealService::new(
        Arc::new(transcoder),
        Arc::new(SqliteUsageStore::new(db)),
        &settings.usage,
    )?;
    let ctx = RequestContext {
        user_id: cli.user.clone(),
        api_key_id: cli.api_key.clone(),
    };

    match cli.command {
        Command::Text { input, ops } => {
            let text = read_text(input.as_deref())?;
            let out = service.steal_text(&ctx, text, &ops.into_request()?).await?;
            print_json(&out)?;
        }
        Command::Audio {
            input,
            output,
            raw,
            format,
            ops,
        } => {
            let request = ops.into_request()?;
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let payload = if raw {
                AudioInput::RawF32(bytes)
            } else {
                AudioInput::Container(bytes)
            };
            let out = service.steal_audio(&ctx, payload, &request, format).await?;
            std::fs::write(&output, &out.file)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(path = %output.display(), bytes = out.file.len(), "processed audio written");
            print_json(&out)?;
        }
        Command::Presets { kind } => print_json(&service.list_presets(kind))?,
        Command::Operations { kind } => print_json(&service.list_operations(kind))?,
        Command::Usage { history } => {
            let usage = service.meter().check_limits(&cli.user)?;
            let events = store.events().list_for_user(&cli.user, history)?;
            print_json(&serde_json::json!({ "limits": usage, "events": events }))?;
        }
    }
    Ok(())
}

fn telemetry_config(settings: &RobinwoodSettings) -> TelemetryConfig {
    let mut config = TelemetryConfig {
        json: settings.logging.json,
        ..TelemetryConfig::default()
    };
    match parse_level(&settings.logging.level) {
        Some(level) => config.log_level = level,
        None => eprintln!("unknown log level {:?}, using info", settings.logging.level),
    }
    config
}

fn read_text(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
