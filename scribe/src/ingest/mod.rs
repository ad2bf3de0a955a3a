//! `scribe ingest`: stream a transcript into a project as one turn.
//!
//! The tokenizer runs on a dedicated `std::thread` that owns the
//! `StreamState`. The async driver reads input, forwards chunks over a
//! crossbeam channel, renders progress events, and commits the finalized
//! state together with its reverse diff.

pub mod types;
pub mod worker;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use scribe_core::{calculate_reverse_diff, db, FileSet, StreamState};
use tokio::io::AsyncRead;

use crate::cli::IngestArgs;
use crate::config::Config;
use crate::event::{EventHandler, IngestEvent};
use crate::report::{self, Outcome, ProgressReporter};
use types::ParseRequest;

pub async fn run(db_path: &Path, config: &Config, args: IngestArgs) -> anyhow::Result<()> {
    // Registered first so an early Ctrl-C still reaches the finalize path.
    let term_flag = crate::signal::register_shutdown()?;

    let conn = crate::open_store(db_path).await?;
    let name = args.project.project.as_str();
    let project = match db::find_project(&conn, name).await? {
        Some(project) => Some(project),
        None if args.dry_run => None,
        None => Some(db::detect_or_create_project(&conn, name).await?),
    };
    let committed = match &project {
        Some(project) => db::get_current_files(&conn, &project.id).await?,
        None => FileSet::new(),
    };
    tracing::info!(project = name, files = committed.len(), "starting turn");

    let reader: Box<dyn AsyncRead + Unpin + Send> = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?,
        ),
        _ => Box::new(tokio::io::stdin()),
    };
    let chunk_size = args.chunk_size.map_or(config.chunk_size, |n| n as usize);
    let chunks = crate::source::utf8_chunks(reader, chunk_size).fuse();
    futures::pin_mut!(chunks);

    let EventHandler { tx, mut rx } = EventHandler::new();
    let (req_tx, req_rx) = crossbeam_channel::unbounded::<ParseRequest>();
    let seed = committed.clone();
    let worker = std::thread::Builder::new()
        .name("scribe-parser".to_owned())
        .spawn(move || worker::parser_worker_loop(seed, req_rx, tx))
        .context("cannot start parser thread")?;

    let mut reporter = ProgressReporter::default();
    let mut stderr = std::io::stderr();
    let mut reading = true;

    let state: StreamState = 'ingest: loop {
        tokio::select! {
            // Heartbeat: the signal flag is checked at least every 50ms even
            // while stdin is idle.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if reading && term_flag.load(Ordering::Relaxed) {
                    tracing::warn!("interrupted, finalizing what has been received");
                    reading = false;
                    let _ = req_tx.send(ParseRequest::Finish);
                }
            }
            maybe_chunk = chunks.next(), if reading => {
                match maybe_chunk {
                    Some(Ok(chunk)) => {
                        if req_tx.send(ParseRequest::Chunk(chunk)).is_err() {
                            reading = false;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(e).context("reading transcript");
                    }
                    None => {
                        reading = false;
                        let _ = req_tx.send(ParseRequest::Finish);
                    }
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(IngestEvent::Progress(snapshot)) => {
                        reporter.update(&snapshot, &mut stderr)?;
                    }
                    Some(IngestEvent::Finished(state)) => break 'ingest *state,
                    None => anyhow::bail!("parser thread exited without a final state"),
                }
            }
        }
    };
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("parser thread panicked"))?;

    let diff = calculate_reverse_diff(&committed, &state.working_files);
    let outcome = match &project {
        _ if args.dry_run => Outcome::DryRun,
        _ if diff.is_empty() => Outcome::Unchanged,
        Some(project) => {
            let summary = (!state.summary_text.is_empty()).then_some(state.summary_text.as_str());
            let turn_id =
                db::commit_turn(&conn, &project.id, &state.working_files, &diff, summary).await?;
            tracing::info!(project = name, turn = %turn_id, "turn committed");
            Outcome::Committed { turn_id }
        }
        None => Outcome::DryRun,
    };

    report::write_summary(&mut std::io::stdout().lock(), &state, &diff, &outcome)?;
    Ok(())
}
