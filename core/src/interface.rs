//! JSON file loading for configuration files.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file is missing, unreadable, or not valid JSON for `T`.
pub fn load_json<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!("input file {:?} not found", path);
        }
        Err(e) => return Err(e).context(format!("opening file {:?}", path)),
    };
    serde_json::from_reader(file).with_context(|| format!("parsing JSON from {:?}", path))
}
