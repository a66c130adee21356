use crate::common::*;

/// List the files in `dir` with one of `extensions`, sorted by path.
pub fn list_images(dir: impl AsRef<Path>, extensions: &[impl AsRef<str>]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    ensure!(dir.is_dir(), "'{}' is not a directory", dir.display());

    let pattern = format!("{}/*", glob::Pattern::escape(&dir.display().to_string()));
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)?.try_collect()?;
    paths.retain(|path| path.is_file() && has_extension(path, extensions));
    paths.sort();
    Ok(paths)
}

pub fn has_extension(path: &Path, extensions: &[impl AsRef<str>]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|expect| expect.as_ref().eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Get the file name without extension.
pub fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| format_err!("invalid file name '{}'", path.display()))
}
