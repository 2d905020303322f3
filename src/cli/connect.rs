//! The `connect` command: attach a document to a remote peer.
//!
//! Runs the single-owner event loop: poll the transport for inbound
//! envelopes, apply them to the document, and accept interaction
//! commands from stdin (`click <node>`, `show <node>`, `reconnect`,
//! `quit`).

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, TryRecvError, unbounded};

use crate::config::SyncConfig;
use crate::connection::{Connection, DialFn, Transport, ws::WsTransport};
use crate::document::{Document, MemDocument, load};
use crate::event;
use crate::logger::{status_connected, status_disconnected};
use crate::protocol::Handshake;

pub fn run(
    url: &str,
    doc_path: &Path,
    args: Option<&str>,
    path: Option<&str>,
    config: &SyncConfig,
) -> Result<()> {
    let endpoint = url::Url::parse(url).with_context(|| format!("invalid endpoint `{url}`"))?;
    // No TLS stack: plain ws only
    if endpoint.scheme() != "ws" {
        anyhow::bail!("unsupported scheme `{}` (expected ws://)", endpoint.scheme());
    }

    let mut doc = load::from_file(doc_path, &config.event.file_attr)?;
    crate::log!("sync"; "loaded {} addressable nodes from {}", doc.len(), doc_path.display());

    let handshake = Handshake {
        path: path.map(str::to_string).unwrap_or_else(|| {
            format!(
                "/{}",
                doc_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )
        }),
        args: args.unwrap_or_default().to_string(),
    };

    let target = endpoint.to_string();
    let dial: DialFn =
        Box::new(move || Ok(Box::new(WsTransport::dial(&target)?) as Box<dyn Transport>));
    let mut connection = Connection::new(dial, handshake);

    match connection.connect() {
        Ok(()) => status_connected(url),
        Err(e) => status_disconnected("connect failed", &retry_hint(&e.to_string())),
    }

    let commands = spawn_stdin_reader();
    loop {
        match connection.poll(&mut doc, config) {
            // Drain pending messages before sleeping
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => status_disconnected("disconnected", &retry_hint(&e.to_string())),
        }

        match commands.try_recv() {
            Ok(line) => {
                if !handle_command(line.trim(), &mut doc, &mut connection, config) {
                    break;
                }
            }
            Err(TryRecvError::Empty) => {}
            // stdin closed: nothing left to interact with
            Err(TryRecvError::Disconnected) => break,
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    Ok(())
}

fn retry_hint(detail: &str) -> String {
    format!("{detail}\ntype `reconnect` to retry")
}

/// Forward stdin lines to the event loop.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Handle one stdin command. Returns `false` to leave the loop.
fn handle_command(
    line: &str,
    doc: &mut MemDocument,
    connection: &mut Connection,
    config: &SyncConfig,
) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "" => {}

        "quit" | "exit" => return false,

        "reconnect" => match connection.connect() {
            Ok(()) => status_connected("reconnected"),
            Err(e) => status_disconnected("reconnect failed", &retry_hint(&e.to_string())),
        },

        "show" => match doc.find_by_name(rest).and_then(|n| doc.describe_node(n)) {
            Some(snapshot) => println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).unwrap_or_default()
            ),
            None => crate::log!("sync"; "no node named `{}`", rest),
        },

        "click" => click(rest, doc, connection, config),

        _ => crate::log!("sync"; "unknown command `{}` (click/show/reconnect/quit)", command),
    }
    true
}

/// Encode an interaction on the named node and transmit if needed.
fn click(name: &str, doc: &mut MemDocument, connection: &mut Connection, config: &SyncConfig) {
    let Some(node) = doc.find_by_name(name) else {
        crate::log!("sync"; "no node named `{}`", name);
        return;
    };

    let encoded = match event::encode(doc, node, config) {
        Ok(encoded) => encoded,
        Err(e) => {
            crate::log!("error"; "bad event descriptor on `{}`: {}", name, e);
            return;
        }
    };

    if encoded.stop_propagation {
        crate::debug!("sync"; "`{}` swallowed the event", name);
    }
    match encoded.envelope {
        Some(envelope) => {
            if let Err(e) = connection.send(&envelope) {
                status_disconnected("disconnected", &retry_hint(&e.to_string()));
            }
        }
        None => crate::debug!("sync"; "`{}`: local-only interaction", name),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_ws_schemes() {
        let config = SyncConfig::default();
        let doc = Path::new("absent.html");

        // Scheme is checked before anything touches the filesystem
        let err = run("wss://peer.example/", doc, None, None, &config).unwrap_err();
        assert!(err.to_string().contains("expected ws://"));

        let err = run("http://peer.example/", doc, None, None, &config).unwrap_err();
        assert!(err.to_string().contains("expected ws://"));

        let err = run("not a url", doc, None, None, &config).unwrap_err();
        assert!(err.to_string().contains("invalid endpoint"));
    }
}
