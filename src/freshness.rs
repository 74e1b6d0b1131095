use std::{fs, io, path::Path};

/// Returns `true` if the artifact at `artifact` is non-empty and was modified after `source`, so
/// it doesn't have to be rebuilt. A missing artifact is never fresh.
pub fn is_fresh<S: AsRef<Path>, A: AsRef<Path>>(source: S, artifact: A) -> io::Result<bool> {
    let artifact = match fs::metadata(artifact) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if artifact.len() == 0 {
        return Ok(false);
    }

    let source = fs::metadata(source)?;
    Ok(artifact.modified()? > source.modified()?)
}
