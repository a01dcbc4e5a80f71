use clap::Subcommand;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, metadata};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const SIZE_WARNING_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Subcommand)]
pub enum LogsAction {
    /// Show recent log entries
    Show {
        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },

    /// Clear the log file
    Clear,
}

/// `log` backend appending timestamped lines to the launcher-assist log file.
struct FileLogger {
    path: PathBuf,
    level: LevelFilter,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            write_log(&self.path, record.level().as_str(), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}

pub fn init_logger(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let log_file = get_log_file()?;

    // Create log directory if it doesn't exist
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::set_boxed_logger(Box::new(FileLogger {
        path: log_file,
        level,
    }))?;
    log::set_max_level(level);
    Ok(())
}

fn write_log(log_file: &Path, level: &str, msg: &str) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let log_entry = format!("[{}] {}: {}\n", timestamp, level, msg);

    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .and_then(|mut file| file.write_all(log_entry.as_bytes()));

    // Check file size and warn if over 5 MiB (simple check, no mutex needed)
    if let Ok(size) = metadata(log_file).map(|m| m.len()) {
        if size > SIZE_WARNING_BYTES {
            let warning = format!(
                "[{}] WARN: Log file is {:.1} MiB. Consider running 'launcher-assist logs clear'\n",
                timestamp,
                size as f64 / 1_048_576.0
            );
            let _ = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .and_then(|mut file| file.write_all(warning.as_bytes()));
        }
    }
}

pub fn handle_logs_command(action: Option<LogsAction>) -> Result<(), Box<dyn std::error::Error>> {
    match action.unwrap_or(LogsAction::Show { lines: 50 }) {
        LogsAction::Show { lines } => show_logs(lines),
        LogsAction::Clear => clear_logs(),
    }
}

fn tail_lines(log_file: &Path, lines: usize) -> std::io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(log_file)?);
    let all_lines: Vec<String> = reader.lines().collect::<Result<Vec<_>, _>>()?;

    let start = all_lines.len().saturating_sub(lines);
    Ok(all_lines[start..].to_vec())
}

fn show_logs(lines: usize) -> Result<(), Box<dyn std::error::Error>> {
    let log_file = get_log_file()?;

    if !log_file.exists() {
        println!("No log file found");
        return Ok(());
    }

    let size = metadata(&log_file)?.len();
    if size > SIZE_WARNING_BYTES {
        eprintln!(
            "Warning: Log file is {:.1} MiB. Consider clearing it.",
            size as f64 / 1_048_576.0
        );
    }

    for line in tail_lines(&log_file, lines)? {
        println!("{}", line);
    }

    Ok(())
}

fn clear_logs() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = get_log_file()?;

    if log_file.exists() {
        std::fs::write(&log_file, "")?;
        println!("Log file cleared");
    } else {
        println!("No log file to clear");
    }

    Ok(())
}

fn get_log_file() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(dirs::data_local_dir()
        .ok_or("No local data directory for this user")?
        .join(crate::APP_NAME)
        .join(format!("{}.log", crate::APP_NAME)))
}
