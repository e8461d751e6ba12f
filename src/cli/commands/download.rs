//! Download command: runs the pipeline and renders its progress.

use std::io::Write;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Error;
use crate::pipeline::{self, DownloadRequest, Pipeline, ProgressEvent, Stage};

/// Download one URL as an MP3
pub fn cmd_download(
    rt: &Runtime,
    config: &Config,
    url: &str,
    cover_lookup: bool,
    cover_title: Option<String>,
) -> anyhow::Result<()> {
    // Tool probing blocks, so it happens before entering the runtime
    let pipeline = Pipeline::from_config(config);
    let mut request = DownloadRequest::new(url);
    if cover_lookup {
        request = request.with_cover_lookup(cover_title);
    }

    println!("Downloading: {}", url);
    println!("Output dir:  {:?}", pipeline.options().output_dir);
    println!();

    let result = rt.block_on(async {
        let (tx, mut rx) = pipeline::progress::channel();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling...");
                trigger.cancel();
            }
        });

        let renderer = tokio::spawn(async move {
            let mut view = ProgressView::default();
            while let Some(event) = rx.recv().await {
                view.render(&event);
            }
            view.finish();
        });

        let result = pipeline.run_with_cancel(&request, tx, cancel).await;
        let _ = renderer.await;
        result
    });

    match result {
        Ok(path) => {
            println!("✓ Saved {:?}", path);
            Ok(())
        }
        Err(Error::Cancelled) => {
            eprintln!("✗ Cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("✗ {}: {}", e.kind(), e);
            if matches!(e.root(), Error::CoverFetchFailed(_) | Error::TagWriteFailed { .. }) {
                eprintln!("  The MP3 was saved without tags.");
            }
            std::process::exit(1);
        }
    }
}

/// One status line per stage, with the percentage redrawn in place
#[derive(Default)]
struct ProgressView {
    stage: Option<Stage>,
    line_open: bool,
}

impl ProgressView {
    fn render(&mut self, event: &ProgressEvent) {
        if self.stage != Some(event.stage) {
            self.finish();
            self.stage = Some(event.stage);
        }
        if event.stage == Stage::Done {
            return;
        }

        let line = match event.percent {
            Some(pct) => format!("{:>3}% {}", pct, event.status()),
            None => format!("     {}", event.status()),
        };
        print!("\r{:<60}", line);
        let _ = std::io::stdout().flush();
        self.line_open = true;
    }

    fn finish(&mut self) {
        if self.line_open {
            println!();
            self.line_open = false;
        }
    }
}
