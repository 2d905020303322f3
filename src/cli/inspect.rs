//! The `inspect` command: dump a document's node table as JSON.

use std::path::Path;

use anyhow::Result;

use crate::config::SyncConfig;
use crate::document::load;

pub fn run(doc_path: &Path, pretty: bool, config: &SyncConfig) -> Result<()> {
    let doc = load::from_file(doc_path, &config.event.file_attr)?;
    let snapshot = doc.snapshot();

    let out = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{out}");

    crate::debug!("sync"; "{} addressable nodes in {}", doc.len(), doc_path.display());
    Ok(())
}
