/// Version injected at compile time via FNGATE_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("FNGATE_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fngate::config::Config;
use fngate::engine::PlanEngine;
use fngate::topology::build;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Preview a GCP Cloud Function + API Gateway topology
#[derive(Parser, Debug)]
#[command(name = "fngate", version, about, long_about = None)]
struct Args {
    /// Plan output format
    #[arg(short, long, value_enum, default_value = "none")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    None,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("fngate {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("fngate").join("fngate.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".fngate").join("fngate.log");
    }
    PathBuf::from("fngate.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&Config::default(), args.output, &mut out).await {
        Err(err) if is_broken_pipe(&err) => Ok(()),
        result => result,
    }
}

/// Build the topology once and report the plan and exported URL
async fn run<W: Write>(config: &Config, output: OutputFormat, out: &mut W) -> Result<()> {
    let service_args = &config.service;
    tracing::info!(
        "Using project: {}, region: {}, stack: {}",
        service_args.project,
        service_args.region,
        config.stack
    );

    let mut engine = PlanEngine::new(&config.stack, &service_args.project, &service_args.region);

    let service = match build(&mut engine, &config.name, service_args).await {
        Ok(service) => service,
        Err(err) if err.is_recoverable() => {
            tracing::warn!("Invalid service arguments: {}", err);
            return Err(err).context("Invalid service arguments");
        }
        Err(err) => {
            tracing::error!("Provisioning failed: {}", err);
            return Err(err).context(format!("Failed to build service '{}'", config.name));
        }
    };

    let plan = engine.into_plan();
    match output {
        OutputFormat::None => {}
        OutputFormat::Json => writeln!(out, "{}", plan.to_json()?)?,
        OutputFormat::Yaml => write!(out, "{}", plan.to_yaml()?)?,
    }

    writeln!(
        out,
        "{}: {} resources declared",
        service.name,
        service.resources.len()
    )?;
    if let Some(url) = service.url() {
        writeln!(out, "url: {}", url)?;
    }
    out.flush()?;

    Ok(())
}

/// Output closed early, e.g. piped into `head`
fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngate::topology::ServiceArgs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("openapi.yaml"),
            "{{Project}} {{Region}} {{FunctionName}} {{Path}}\n",
        )
        .unwrap();
        dir
    }

    fn config(dir: &tempfile::TempDir, project: &str) -> Config {
        let args = ServiceArgs::new(project, "europe-west2", dir.path().join("src"))
            .with_template(dir.path().join("openapi.yaml"));
        Config::new("myService", "test", args)
    }

    #[tokio::test]
    async fn test_run_reports_resources_and_url() {
        let dir = fixture();
        let mut out = Vec::new();

        run(&config(&dir, "proj"), OutputFormat::None, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("myService: 7 resources declared"));
        let url = text
            .lines()
            .find_map(|l| l.strip_prefix("url: "))
            .expect("url line");
        assert!(url.ends_with(".europe-west2.gateway.dev"));
    }

    #[tokio::test]
    async fn test_run_prints_json_plan() {
        let dir = fixture();
        let mut out = Vec::new();

        run(&config(&dir, "proj"), OutputFormat::Json, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"project\": \"proj\""));
        assert!(text.contains("\"url\""));
    }

    #[tokio::test]
    async fn test_run_rejects_missing_project() {
        let dir = fixture();
        let mut out = Vec::new();

        let err = run(&config(&dir, ""), OutputFormat::Json, &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid service arguments"));
        assert!(err.chain().any(|c| c.to_string() == "missing project argument"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_run_reports_provisioning_failure() {
        let dir = fixture();
        let mut config = config(&dir, "proj");
        config.service.template = dir.path().join("absent.yaml");
        let mut out = Vec::new();

        let err = run(&config, OutputFormat::None, &mut out).await.unwrap_err();

        assert!(err.to_string().contains("Failed to build service 'myService'"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_broken_pipe_is_detected_through_context() {
        let err = anyhow::Error::from(io::Error::from(io::ErrorKind::BrokenPipe))
            .context("writing plan");
        assert!(is_broken_pipe(&err));

        let err = anyhow::anyhow!("missing project argument");
        assert!(!is_broken_pipe(&err));
    }
}
