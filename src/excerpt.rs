//! Exporting the event lines of a profile log to a standalone file.

use crate::Result;
use crate::diagnostics;

use anyhow::Context;
use chrono::Local;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory used when no explicit destination is given.
pub const DEFAULT_DIR: &str = "old_runs";

/// Write the `@` lines of `source` to `dest`.
///
/// The first line names the absolute source path and the creation time,
/// followed by a blank line.
pub fn export(source: &Path, dest: &Path) -> Result<usize> {
    let input = File::open(source)
        .with_context(|| diagnostics::error_message(format!("open {}", source.display())))?;
    let output = File::create(dest)
        .with_context(|| diagnostics::error_message(format!("create {}", dest.display())))?;
    let mut out = BufWriter::new(output);

    let absolute = std::path::absolute(source)?;
    let created = Local::now().format("created on %Y.%m.%d at %H:%M:%S");
    writeln!(out, "{} {}", absolute.display(), created)?;
    writeln!(out)?;

    // Lines are copied as bytes; build output around the events need not be UTF-8.
    let mut reader = BufReader::new(input);
    let mut line = Vec::new();
    let mut written = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.starts_with(b"@") {
            out.write_all(&line)?;
            if !line.ends_with(b"\n") {
                out.write_all(b"\n")?;
            }
            written += 1;
        }
    }
    out.flush()?;
    Ok(written)
}

/// `dir/name`, or `dir/name1`, `dir/name2`, ... if taken. Creates `dir`.
pub fn unique_destination(dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| diagnostics::error_message(format!("create {}", dir.display())))?;

    let mut candidate = dir.join(name);
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}{}", name, n));
        n += 1;
    }
    Ok(candidate)
}
