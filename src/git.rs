use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressSink;

const RECEIVING_WEIGHT: f64 = 0.9;
const TAIL_LINES: usize = 3;

/// Turns git's `--progress` lines into monotonically increasing deltas.
#[derive(Debug, Default)]
pub struct ProgressParser {
    reported: f64,
}

fn percent(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once(':')?;
    let pct = rest.trim_start().split('%').next()?.trim();
    pct.parse::<f64>().ok().map(|p| p.clamp(0.0, 100.0) / 100.0)
}

impl ProgressParser {
    /// Returns the increment since the last reported position, if any.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim_start_matches("remote: ").trim();
        let overall = if line.starts_with("Receiving objects") {
            percent(line)? * RECEIVING_WEIGHT
        } else if line.starts_with("Resolving deltas") {
            RECEIVING_WEIGHT + percent(line)? * (1.0 - RECEIVING_WEIGHT)
        } else {
            return None;
        };

        let delta = overall - self.reported;
        if delta <= 0.0 {
            return None;
        }
        self.reported = overall;
        Some(delta)
    }
}

/// Clone `url` into `dest`, streaming progress into `sink`. Always ends the
/// stream with `Finished` or `Failed`. Only `cancel` stops git early; a
/// consumer that went away just stops receiving progress.
pub async fn clone_repo(url: String, dest: &Path, sink: ProgressSink, cancel: CancellationToken) {
    if dest.exists() {
        sink.fail(format!("{} already exists", dest.display()));
        return;
    }

    let spawned = Command::new("git")
        .args(["clone", "--progress", &url])
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            sink.fail(format!("could not start git: {}", e));
            return;
        }
    };

    let Some(mut stderr) = child.stderr.take() else {
        sink.fail("git stderr unavailable");
        return;
    };

    let mut parser = ProgressParser::default();
    let mut pending = String::new();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
    let mut buf = [0u8; 1024];
    let mut reporting = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                child.kill().await.ok();
                sink.fail("clone cancelled");
                return;
            }
            read = stderr.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    pending.push_str(&String::from_utf8_lossy(&buf[..n]));
                    while let Some(pos) = pending.find(['\r', '\n']) {
                        let line: String = pending.drain(..=pos).collect();
                        let line = line.trim_end();
                        if line.is_empty() {
                            continue;
                        }
                        if let Some(delta) = parser.feed(line) {
                            if !sink.advance(delta) && reporting {
                                tracing::debug!(url = %url, "progress consumer gone, clone continues");
                                reporting = false;
                            }
                        }
                        if tail.len() == TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line.to_string());
                    }
                }
                Err(e) => {
                    sink.fail(format!("reading git output: {}", e));
                    return;
                }
            }
        }
    }

    match child.wait().await {
        Ok(status) if status.success() => {
            tracing::info!(url = %url, dest = %dest.display(), "clone finished");
            sink.finish();
        }
        Ok(status) => {
            let detail = tail.back().cloned().unwrap_or_else(|| status.to_string());
            tracing::error!(url = %url, %status, "clone failed");
            sink.fail(detail);
        }
        Err(e) => sink.fail(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CloneEvent, ProgressStream};

    #[test]
    fn receiving_objects_maps_to_first_ninety_percent() {
        let mut parser = ProgressParser::default();
        let d = parser
            .feed("Receiving objects:  50% (50/100), 1.00 MiB | 2.00 MiB/s")
            .unwrap();
        assert!((d - 0.45).abs() < 1e-9);
        let d = parser.feed("Receiving objects: 100% (100/100), done.").unwrap();
        assert!((d - 0.45).abs() < 1e-9);
    }

    #[test]
    fn resolving_deltas_fills_the_rest() {
        let mut parser = ProgressParser::default();
        parser.feed("Receiving objects: 100% (10/10)");
        let d = parser.feed("Resolving deltas: 100% (4/4), done.").unwrap();
        assert!((d - 0.1).abs() < 1e-9);
    }

    #[test]
    fn repeated_or_unrelated_lines_yield_nothing() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.feed("Cloning into 'demo'..."), None);
        assert_eq!(parser.feed("remote: Counting objects: 100% (5/5)"), None);
        parser.feed("Receiving objects:  20% (2/10)");
        assert_eq!(parser.feed("Receiving objects:  20% (2/10)"), None);
        assert_eq!(parser.feed("Receiving objects:  10% (1/10)"), None);
    }

    #[tokio::test]
    async fn existing_destination_fails_without_running_git() {
        let dir = std::env::temp_dir();
        let (sink, stream) = ProgressStream::channel();
        clone_repo(
            "https://example.invalid/repo.git".to_string(),
            &dir,
            sink,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(stream.next().await, Some(CloneEvent::Failed(_))));
        assert_eq!(stream.next().await, None);
    }
}
