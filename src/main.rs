use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use launcher_assist::channel::{LauncherPlugin, MethodCall, MethodResult, Value};
use launcher_assist::config::Settings;
use launcher_assist::icon::{Drawable, IconResult, resolve_icon};
use launcher_assist::wallpaper::FileWallpaper;
use launcher_assist::{apps, brightness, codec, logs};

#[derive(Parser)]
#[command(
    name = "launcher-assist",
    about = "Application, icon and wallpaper helper for launchers"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one channel method, e.g. `call getAllApps --arg requestAdaptableIcons=true`
    Call {
        method: String,

        /// Argument as key=value; `@file` passes the file's bytes
        #[arg(short, long = "arg", value_parser = parse_arg)]
        args: Vec<(String, Value)>,

        /// Write the binary result envelope instead of JSON
        #[arg(long)]
        binary: bool,
    },
    /// Average brightness of an image file
    Brightness {
        image: PathBuf,

        #[arg(short, long, default_value_t = 1)]
        skip_pixel: i64,
    },
    /// Resolve an icon file (or a foreground/background pair) to PNG
    Icon {
        #[arg(required_unless_present = "foreground")]
        path: Option<PathBuf>,

        #[arg(long, requires = "background", conflicts_with = "path")]
        foreground: Option<PathBuf>,

        #[arg(long, requires = "foreground")]
        background: Option<PathBuf>,

        /// Request separate layers for adaptive icons
        #[arg(long)]
        layered: bool,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    Logs {
        #[command(subcommand)]
        action: Option<logs::LogsAction>,
    },
}

fn parse_arg(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;

    let value = match value {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        v if v.starts_with('@') => std::fs::read(&v[1..])
            .map(Value::Bytes)
            .map_err(|e| format!("{}: {}", &v[1..], e))?,
        v => v
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Str(v.to_string())),
    };

    Ok((key.to_string(), value))
}

fn write_icon(result: IconResult, out: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out)?;
    let files = match result {
        IconResult::Flat { png } => vec![("icon.png", png)],
        IconResult::Layered {
            foreground_png,
            background_png,
        } => vec![
            ("foreground.png", foreground_png),
            ("background.png", background_png),
        ],
    };

    files
        .into_iter()
        .map(|(name, bytes)| {
            let path = out.join(name);
            std::fs::write(&path, bytes).map(|_| path)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger first
    logs::init_logger(cli.settings.log_level)?;

    match cli.command {
        Commands::Call {
            method,
            args,
            binary,
        } => {
            let plugin = LauncherPlugin::new(
                apps::host_registry(),
                Box::new(FileWallpaper::new(cli.settings.wallpaper.clone())),
                cli.settings.tier(),
            );

            let call = args
                .into_iter()
                .fold(MethodCall::new(method), |call, (k, v)| call.arg(k, v));
            let result = plugin.handle(&call);

            if binary {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&codec::encode_result(&result)?)?;
                stdout.flush()?;
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }

            if let MethodResult::Error { code, .. } = &result {
                log::error!("{} returned {}", call.method, code);
                std::process::exit(1);
            }
        }
        Commands::Brightness { image, skip_pixel } => {
            let data = std::fs::read(&image)?;
            let score = brightness::brightness_from_bytes(&data, skip_pixel)?;
            log::info!("Brightness of {}: {}", image.display(), score);
            println!("{}", score);
        }
        Commands::Icon {
            path,
            foreground,
            background,
            layered,
            out,
        } => {
            let icon = match (path, foreground, background) {
                (_, Some(fg), Some(bg)) => {
                    Drawable::adaptive(Drawable::from_path(&fg)?, Drawable::from_path(&bg)?)
                }
                (Some(path), _, _) => Drawable::from_path(&path)?,
                _ => return Err("an icon path or --foreground/--background is required".into()),
            };

            let result = resolve_icon(&icon, layered, cli.settings.tier())?;
            for path in write_icon(result, &out)? {
                println!("{}", path.display());
            }
        }
        Commands::Logs { action } => {
            logs::handle_logs_command(action)?;
        }
    }
    Ok(())
}
