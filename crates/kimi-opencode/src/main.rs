use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing::Instrument;
use tracing_subscriber::fmt::MakeWriter;

use kimi_opencode::config::{
    UserConfig, load_user_config, resolve_execute, resolve_home, resolve_model,
};
use kimi_opencode::env::EnvSnapshot;
use kimi_opencode::runner::{ShellRunner, run_all};
use kimi_opencode::task::TaskFile;
use kimi_opencode::{ExecInput, InstalledAgent, KimiOpenCode};

type BoxedLayer = Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>;

#[derive(Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

fn fmt_layer<W>(style: LogStyle, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::Layer;

    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn init_tracing(home: &std::path::Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <KIMI_OPENCODE_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory (absolute). Defaults to <KIMI_OPENCODE_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::{EnvFilter, prelude::*};

    let env_set = |k: &str| std::env::var_os(k).is_some();

    // TRACING_FILTER first, then RUST_LOG, then user config.
    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(kimi_opencode::config::expand_home(dir));
        }
    }

    let style = if tracing_json {
        LogStyle::Json
    } else if tracing_compact {
        LogStyle::Compact
    } else if tracing_pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    // Stdout carries the composed commands; logs always go to stderr.
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(style, std::io::stderr, true)];

    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut file_error = None;
    if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "kimi-opencode.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, nb, false));
            }
            Err(e) => file_error = Some((dir, e)),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = file_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

async fn run(task_path: PathBuf, user_cfg: Option<UserConfig>) -> anyhow::Result<ExitCode> {
    env_flags! {
        /// Model override; beats the task file and user config.
        KIMI_MODEL: &str = "";
        /// Execute the commands locally instead of printing them.
        KIMI_EXECUTE: bool = false;
    }

    let task = TaskFile::load(&task_path)?;
    let instruction = task.instruction_text()?;

    let model = resolve_model(*KIMI_MODEL, task.model.as_deref(), user_cfg.as_ref());
    let env_execute = std::env::var_os("KIMI_EXECUTE").map(|_| *KIMI_EXECUTE);
    let execute = resolve_execute(env_execute, user_cfg.as_ref(), *KIMI_EXECUTE);

    let agent = KimiOpenCode::new(model, task.mcp_servers);
    tracing::info!(
        "task={}, agent={}, model={}, instruction_chars={}, execute={}",
        task_path.display(),
        agent.name(),
        agent.model(),
        instruction.chars().count(),
        execute
    );
    let commands = agent.create_run_agent_commands(&instruction)?;

    if !execute {
        let shown: Vec<ExecInput> = commands.iter().map(ExecInput::redacted).collect();
        let text = serde_json::to_string_pretty(&shown).context("failed to render commands")?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let outputs = run_all(&ShellRunner::new(), &commands).await?;
    for out in &outputs {
        print!("{}", out.stdout);
        eprint!("{}", out.stderr);
    }
    let status = outputs.last().map(|o| o.status).unwrap_or(0);
    tracing::info!("run finished: status={}", status);
    Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_flags! {
        /// Adapter home directory (absolute). Defaults to $HOME/.kimi-opencode
        KIMI_OPENCODE_HOME: &str = "";
    }

    // Freeze credentials before anything else can touch the environment.
    let _ = EnvSnapshot::process();

    let home = resolve_home(*KIMI_OPENCODE_HOME);
    let user_cfg = match load_user_config(&home) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ignoring unreadable {}/config.toml: {e}", home.display());
            None
        }
    };
    init_tracing(&home, user_cfg.as_ref());

    let Some(task_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: kimi-opencode <task.toml>");
        return ExitCode::from(2);
    };

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    match run(task_path, user_cfg).instrument(span).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
