use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use editor::{ClockSurface, EditorConfig, EditorState, Session};
use media_io::{FfprobeProbe, MediaProbe};
use serde::Serialize;
use timeline::{format_time, timeline_header, EffectPreset, EffectToken, PRESETS};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Slack on top of the configured processing delay before giving up on a job.
const JOB_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "quickcut-cli", version, about = "Headless driver for the quickcut editor")]
struct Cli {
    /// Config file (default: <config dir>/quickcut/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the simulated auto-edit/export latency
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print probed media info as JSON
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the effect presets
    Presets,
    /// Print the effective config, or write it to the config path
    Config {
        #[arg(long)]
        write: bool,
    },
    /// Load clips, apply edits and print the resulting editor state
    Edit {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Zero-based index of the clip to activate
        #[arg(long)]
        select: Option<usize>,
        /// Preset name (see `presets`) or a raw filter chain
        #[arg(long)]
        effect: Option<String>,
        /// Number of placeholder text overlays to add
        #[arg(long, default_value_t = 0)]
        add_text: usize,
        #[arg(long)]
        seek: Option<f64>,
        #[arg(long)]
        auto_edit: bool,
        #[arg(long)]
        export: bool,
        /// Human-readable summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Serialize)]
struct PresetRow {
    name: &'static str,
    filter: &'static str,
}

fn load_config(cli: &Cli) -> Result<(EditorConfig, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(EditorConfig::default_path);
    let mut cfg = match &cli.config {
        Some(p) => EditorConfig::load_from(p).with_context(|| format!("reading {}", p.display()))?,
        None => EditorConfig::load(),
    };
    if let Some(ms) = cli.delay_ms {
        cfg.processing_delay_ms = ms;
    }
    Ok((cfg, path))
}

fn resolve_effect(arg: &str) -> Result<EffectToken> {
    if let Some(p) = EffectPreset::by_name(arg) {
        return Ok(p.token());
    }
    let token = EffectToken::new(arg);
    token.parse().with_context(|| format!("invalid effect {arg:?}"))?;
    Ok(token)
}

fn print_summary(state: &EditorState) {
    println!("{}", timeline_header(state.clips.len()));
    for clip in &state.clips {
        let marker = if Some(clip.id) == state.active { '*' } else { ' ' };
        println!(
            "{marker} {} [{}] {} trimmed to {}",
            clip.id,
            clip.label(),
            format_time(clip.duration),
            format_time(clip.trimmed_duration())
        );
    }
    if state.has_active_clip() {
        println!("position {} / {}", format_time(state.current_time), format_time(state.max_seek()));
        let effect = EffectPreset::matching(&state.effect).map(|p| p.name).unwrap_or(state.effect.as_str());
        println!("effect: {}", if effect.is_empty() { "None" } else { effect });
        for o in &state.overlays {
            println!("overlay {:?} at ({}%, {}%) {}px {}", o.text, o.x, o.y, o.font_size, o.color);
        }
    }
    if state.exceeds_limit() {
        println!(
            "warning: video is {} long; only the first {} is used. Try auto-edit.",
            format_time(state.duration),
            format_time(state.limit)
        );
    }
    if let Some(notice) = &state.notice {
        println!("{notice}");
    }
}

fn wait_for_job(session: &mut Session<ClockSurface>, timeout: Duration) -> Result<()> {
    let report = session.run_until_idle(timeout);
    if session.state().is_processing() {
        bail!("processing did not finish within {timeout:?}");
    }
    info!(outcomes = ?report.finished, "processing finished");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn edit(
    cfg: &EditorConfig,
    files: &[PathBuf],
    select: Option<usize>,
    effect: Option<&str>,
    add_text: usize,
    seek: Option<f64>,
    auto_edit: bool,
    export: bool,
) -> Result<EditorState> {
    let mut session = Session::with_ffprobe(cfg, ClockSurface::new()).context("locating ffprobe")?;
    let report = session.upload(files)?;
    for p in &report.ignored {
        warn!(path = %p.display(), "not a video, skipped");
    }
    let loaded = session.run_until_idle(Duration::from_secs(30));
    if session.pending_probes() > 0 {
        bail!("timed out probing {} file(s)", session.pending_probes());
    }
    for p in &loaded.unresolved {
        warn!(path = %p.display(), "could not determine duration, skipped");
    }
    if session.state().clips.is_empty() {
        bail!("no playable video among the inputs");
    }

    if let Some(i) = select {
        let id = session.state().clips.get(i).map(|c| c.id).with_context(|| format!("no clip at index {i}"))?;
        session.select(id)?;
        session.poll();
    }
    if let Some(e) = effect {
        session.set_effect(resolve_effect(e)?)?;
    }
    for _ in 0..add_text {
        session.add_text_overlay()?;
    }
    if let Some(t) = seek {
        session.seek(t)?;
    }

    let job_timeout = cfg.processing_delay() + JOB_GRACE;
    if auto_edit && session.auto_edit()? {
        wait_for_job(&mut session, job_timeout)?;
    }
    if export && session.export()? {
        wait_for_job(&mut session, job_timeout)?;
    }
    session.poll();
    let state = session.state().clone();
    session.close();
    Ok(state)
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let (cfg, cfg_path) = load_config(&cli)?;

    match &cli.command {
        Command::Probe { files } => {
            let probe = FfprobeProbe::locate(cfg.ffprobe.as_deref())?;
            for f in files {
                let info = probe.probe(f).with_context(|| format!("probing {}", f.display()))?;
                println!("{}", serde_json::to_string(&serde_json::json!({ "path": f, "info": info }))?);
            }
        }
        Command::Presets => {
            let rows: Vec<PresetRow> = PRESETS.iter().map(|p| PresetRow { name: p.name, filter: p.token }).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Config { write } => {
            if *write {
                let path = cfg_path.context("no config directory on this platform")?;
                cfg.save(&path)?;
                println!("wrote {}", path.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            }
        }
        Command::Edit { files, select, effect, add_text, seek, auto_edit, export, summary } => {
            let state = edit(&cfg, files, *select, effect.as_deref(), *add_text, *seek, *auto_edit, *export)?;
            if *summary {
                print_summary(&state);
            } else {
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
        }
    }
    Ok(())
}
