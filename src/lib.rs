// src/lib.rs

pub mod cli;
pub mod config;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod hub;
pub mod logging;
pub mod resolve;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, find_project_root, load_from_path};
use crate::engine::{Engine, EngineParts, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::{DependencyResolver, ImportResolver};
use crate::watch::{FsEvent, NotifyWatchBackend, TargetMatcher, spawn_target_watcher};
use crate::watch::path_utils::relative_str;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project root discovery and config loading
/// - target and dependency watchers
/// - command executor
/// - engine / runtime
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let root = project_root(&args)?;
    let cfg = load_config(&root, &args)?;
    info!(root = ?root, files = ?cfg.files(), cmd = %cfg.cmd(), "configuration loaded");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let matcher = TargetMatcher::new(&root, cfg.files(), &cfg.resolve().exclude)?;
    let resolver = ImportResolver::new(Arc::clone(&fs), cfg.resolve())?;

    if args.dry_run {
        print_dry_run(&cfg, &root, &matcher, &resolver, fs.as_ref());
        return Ok(());
    }

    // Runtime event channel. Unbounded: notify callbacks must never block.
    let (rt_tx, rt_rx) = mpsc::unbounded_channel::<RuntimeEvent>();

    let watch_backend = NotifyWatchBackend::new(rt_tx.clone())?;
    let runner = ProcessRunner::new(
        cfg.config().run_policy,
        cfg.config().queue_length,
        rt_tx.clone(),
    );

    // Started before the scan so no creation falls in between; duplicates
    // are ignored by the controller.
    let _target_watcher = spawn_target_watcher(&root, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested);
        });
    }

    // Seed the initial targets, then mark the scan complete.
    let initial = matcher.scan(fs.as_ref());
    info!(count = initial.len(), "initial targets found");
    for rel in initial {
        send(&rt_tx, RuntimeEvent::TargetFs(FsEvent::created(root.join(rel))))?;
    }
    send(&rt_tx, RuntimeEvent::InitialScanComplete)?;

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };

    let engine = Engine::new(EngineParts {
        resolver: Box::new(resolver),
        watch_backend: Box::new(watch_backend),
        runner: Box::new(runner),
        fs,
        matcher,
        cmd: cfg.cmd().to_string(),
        use_hash: cfg.config().use_hash,
        run_on_ready: cfg.config().run_on_ready || args.once,
        options,
    });

    Runtime::new(engine, rt_rx, options).run().await
}

fn send(tx: &mpsc::UnboundedSender<RuntimeEvent>, event: RuntimeEvent) -> Result<()> {
    tx.send(event).map_err(anyhow::Error::from)?;
    Ok(())
}

/// `--root` if given, else the nearest marked ancestor of the current
/// directory.
fn project_root(args: &CliArgs) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let root = match &args.root {
        Some(dir) => cwd.join(dir),
        None => find_project_root(&cwd),
    };
    // Canonicalize once so we have a stable base path.
    Ok(root.canonicalize().unwrap_or(root))
}

/// Load the config file (or the `package.json` section when the default
/// file is absent) and apply CLI overrides before validating.
///
/// With neither file present, the CLI flags alone must provide `files` and
/// `cmd`.
pub fn load_config(root: &Path, args: &CliArgs) -> Result<ConfigFile> {
    let path = root.join(&args.config);
    let package_json = root.join("package.json");
    let is_default = args.config == cli::DEFAULT_CONFIG;

    let mut raw = if path.is_file() {
        debug!(config = ?path, "loading config file");
        load_from_path(&path)?
    } else if is_default && package_json.is_file() {
        debug!(config = ?package_json, "loading config from package.json");
        load_from_path(&package_json).or_else(|e| {
            debug!(error = %e, "no usable package.json section");
            Ok::<_, errors::QuickscopeError>(RawConfigFile::default())
        })?
    } else if is_default {
        RawConfigFile::default()
    } else {
        return Err(errors::QuickscopeError::ConfigError(format!(
            "config file {path:?} does not exist"
        )));
    };

    apply_cli_overrides(&mut raw, args);
    ConfigFile::try_from(raw)
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if !args.files.is_empty() {
        raw.files = args.files.clone();
    }
    if let Some(cmd) = &args.cmd {
        raw.cmd = cmd.clone();
    }
    if let Some(policy) = args.run_policy {
        raw.config.run_policy = policy;
    }
}

/// Dry-run output: configuration, targets and their resolved dependencies.
fn print_dry_run(
    cfg: &ConfigFile,
    root: &Path,
    matcher: &TargetMatcher,
    resolver: &dyn DependencyResolver,
    fs: &dyn FileSystem,
) {
    let show = |path: &Path| {
        relative_str(root, path).unwrap_or_else(|| path.to_string_lossy().into_owned())
    };

    println!("quickscope dry-run");
    println!("  root = {}", root.display());
    println!("  cmd = {}", cfg.cmd());
    println!("  files = {:?}", cfg.files());
    println!("  config.run_policy = {}", cfg.config().run_policy);
    println!("  config.queue_length = {}", cfg.config().queue_length);
    println!("  config.use_hash = {}", cfg.config().use_hash);
    println!("  resolve.exclude = {:?}", cfg.resolve().exclude);
    println!();

    let targets = matcher.scan(fs);
    println!("targets ({}):", targets.len());
    for rel in targets {
        println!("  - {}", rel.display());
        match resolver.resolve(root, &root.join(&rel)) {
            Ok(list) => {
                // The target itself comes last.
                for dep in list.iter().take(list.len().saturating_sub(1)) {
                    println!("      {}", show(dep));
                }
            }
            Err(e) => println!("      (error: {e})"),
        }
    }

    debug!("dry-run complete (no execution)");
}
