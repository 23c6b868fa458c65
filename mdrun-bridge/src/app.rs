//! What each subcommand does, on top of one `MdRunEngine`.

use anyhow::{Context, Result};
use mdrun_core::lens::BlockLens;
use mdrun_core::runner::DispatchOutcome;
use mdrun_core::{DispatchRequest, MdRunEngine, RunAction, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cli::Command;
use crate::console::{self, ConsoleHost, SharedInput};
use crate::pty::PtyTerminalHost;
use crate::watcher::DocumentWatcher;

pub fn start_engine(settings: Settings, trusted: bool, input: SharedInput) -> MdRunEngine {
    let host = Arc::new(ConsoleHost::new(trusted, input));
    MdRunEngine::start(settings, Box::new(PtyTerminalHost::default()), host)
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn execute(command: Command, settings: Settings) -> Result<()> {
    let trusted = !matches!(command, Command::Serve { untrusted: true, .. });
    let input = console::stdin_lines();
    let engine = start_engine(settings, trusted, input.clone());

    let result = match command {
        Command::Lenses { file, watch } => lenses(&engine, &file, watch).await,
        Command::Run {
            file,
            index,
            type_only,
        } => run(&engine, &file, index, type_only).await,
        Command::Render { file } => render(&engine, &file).await,
        Command::Serve { file, .. } => serve(&engine, &file, &input).await,
    };

    engine.shutdown().await;
    result
}

pub fn lens_lines(lenses: &[BlockLens]) -> Result<Vec<String>> {
    lenses
        .iter()
        .map(|lens| serde_json::to_string(lens).context("Failed to serialize lens"))
        .collect()
}

async fn print_lenses(engine: &MdRunEngine, file: &Path) -> Result<()> {
    let text = read_document(file)?;
    let lenses = engine.code_lenses(&text).await;
    for line in lens_lines(&lenses)? {
        println!("{}", line);
    }
    Ok(())
}

async fn lenses(engine: &MdRunEngine, file: &Path, watch: bool) -> Result<()> {
    print_lenses(engine, file).await?;
    if !watch {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel::<PathBuf>(16);
    let _watcher = DocumentWatcher::new(file, tx)?;
    tracing::info!(file = %file.display(), "watching for changes");

    loop {
        tokio::select! {
            changed = rx.recv() => {
                let Some(changed) = changed else { break };
                tracing::debug!(path = %changed.display(), "document changed");
                if let Err(e) = print_lenses(engine, file).await {
                    tracing::warn!("Failed to refresh lenses: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn run(engine: &MdRunEngine, file: &Path, index: usize, type_only: bool) -> Result<()> {
    let text = read_document(file)?;
    let lenses = engine.code_lenses(&text).await;
    let lens = lenses.get(index).with_context(|| {
        format!(
            "No runnable block #{} in {} ({} found)",
            index,
            file.display(),
            lenses.len()
        )
    })?;

    let outcome = if type_only {
        engine
            .dispatch(DispatchRequest::new(
                lens.content.clone(),
                lens.language.clone(),
                RunAction::Type,
            ))
            .await
    } else {
        engine.run_command(Some(&lens.content), &lens.language).await
    };

    if matches!(outcome, Some(DispatchOutcome::Sent { .. })) {
        eprintln!("Ctrl-C closes the terminal.");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
    }
    Ok(())
}

async fn render(engine: &MdRunEngine, file: &Path) -> Result<()> {
    let text = read_document(file)?;
    println!("{}", engine.render_preview(&text).await);
    Ok(())
}

/// Print the preview, then handle one request URI per input line, in order.
/// Requests that came in while a prompt was open are handled first.
pub async fn serve(engine: &MdRunEngine, file: &Path, input: &SharedInput) -> Result<()> {
    let text = read_document(file)?;
    println!("{}", engine.render_preview(&text).await);
    tracing::info!("serving requests from stdin");

    while let Some(line) = input.next_request().await {
        let uri = line.trim();
        if uri.is_empty() {
            continue;
        }
        let outcome = engine.handle_uri(uri).await;
        tracing::debug!(?outcome, "request handled");
    }
    Ok(())
}
