use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::input::FileExistsAction;

/// `name_(n).ext` next to `path`.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_({n}){ext}"))
}

/// Final absolute output path for `directory/file_name` under the given
/// exists-policy. Only checks existence; nothing is written here.
pub fn resolve_output_path(
    directory: &Path,
    file_name: &str,
    action: FileExistsAction,
) -> Result<PathBuf, Error> {
    let target = std::path::absolute(directory.join(file_name))?;

    let resolved = match action {
        FileExistsAction::Overwrite => target,
        FileExistsAction::Error => {
            if target.exists() {
                return Err(Error::OutputExists(target));
            }
            target
        }
        FileExistsAction::Rename => {
            let mut candidate = target.clone();
            let mut n = 0;
            while candidate.exists() {
                n += 1;
                candidate = numbered(&target, n);
            }
            candidate
        }
    };
    log::debug!("output path resolved to {}", resolved.display());
    Ok(resolved)
}
