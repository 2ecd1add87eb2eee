//! Persisting a profile model and restoring it.
//!
//! The snapshot is the bincode encoding of the whole [`ProgramRun`],
//! identifier counters included, so a restored model keeps minting the same
//! identifiers.

use crate::Result;
use crate::diagnostics;
use crate::model::ProgramRun;

use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub fn save(run: &ProgramRun, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| {
        diagnostics::error_message(format!("create snapshot {}", path.display()))
    })?;
    let mut out = BufWriter::new(file);
    bincode::serialize_into(&mut out, run).with_context(|| {
        diagnostics::error_message(format!("write snapshot {}", path.display()))
    })?;
    out.flush()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<ProgramRun> {
    let file = File::open(path).with_context(|| {
        diagnostics::error_message(format!("open snapshot {}", path.display()))
    })?;
    let run = bincode::deserialize_from(BufReader::new(file)).with_context(|| {
        diagnostics::error_message(format!("decode snapshot {}", path.display()))
    })?;
    Ok(run)
}
