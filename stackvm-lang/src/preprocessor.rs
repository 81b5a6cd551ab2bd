//! `#include "path"` splicing with a visited-set cycle guard (§4.1).
//! The file reader is injected so the preprocessor stays testable
//! without touching the real filesystem.

use crate::error::PreprocessError;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

pub fn preprocess(
    source: &str,
    dir: &Path,
    read_file: &mut dyn FnMut(&Path) -> io::Result<String>,
) -> Result<String, PreprocessError> {
    let mut visited = HashSet::new();
    expand(source, dir, read_file, &mut visited)
}

fn expand(
    source: &str,
    dir: &Path,
    read_file: &mut dyn FnMut(&Path) -> io::Result<String>,
    visited: &mut HashSet<PathBuf>,
) -> Result<String, PreprocessError> {
    let mut out = String::new();

    for line in source.lines() {
        match parse_include(line) {
            Some(relative) => {
                let path = dir.join(&relative);

                if visited.contains(&path) {
                    continue;
                }
                visited.insert(path.clone());

                let contents = read_wrap(read_file, &path)?;
                let child_dir = path.parent().unwrap_or(dir).to_path_buf();
                out.push_str(&expand(&contents, &child_dir, read_file, visited)?);
                out.push('\n');
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    Ok(out)
}

fn read_wrap(
    read_file: &mut dyn FnMut(&Path) -> io::Result<String>,
    path: &Path,
) -> Result<String, PreprocessError> {
    read_file(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            PreprocessError::NotFound(path.to_path_buf())
        } else {
            PreprocessError::ReadError(path.to_path_buf(), err.to_string())
        }
    })
}

fn parse_include(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("#include")?.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reader(files: HashMap<&'static str, &'static str>) -> impl FnMut(&Path) -> io::Result<String> {
        move |path: &Path| {
            files
                .get(path.to_str().unwrap())
                .map(|s| s.to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    #[test]
    fn splices_included_file_in_place() {
        let mut files = HashMap::new();
        files.insert("base/lib.fs", "42");
        let mut read = reader(files);
        let result = preprocess("1\n#include \"lib.fs\"\n2", Path::new("base"), &mut read).unwrap();
        assert_eq!(result, "1\n42\n\n2\n");
    }

    #[test]
    fn including_same_file_twice_yields_same_output_as_once() {
        let mut files = HashMap::new();
        files.insert("base/lib.fs", "42");
        let mut read = reader(files.clone());
        let once = preprocess("#include \"lib.fs\"", Path::new("base"), &mut read).unwrap();

        let mut read2 = reader(files);
        let twice = preprocess(
            "#include \"lib.fs\"\n#include \"lib.fs\"",
            Path::new("base"),
            &mut read2,
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_file_is_fatal() {
        let mut read = reader(HashMap::new());
        let err = preprocess("#include \"nope.fs\"", Path::new("base"), &mut read).unwrap_err();
        assert!(matches!(err, PreprocessError::NotFound(_)));
    }

    #[test]
    fn cyclic_include_does_not_recurse_forever() {
        let mut files = HashMap::new();
        files.insert("base/a.fs", "#include \"b.fs\"\nA");
        files.insert("base/b.fs", "#include \"a.fs\"\nB");
        let mut read = reader(files);
        let result = preprocess("#include \"a.fs\"", Path::new("base"), &mut read).unwrap();
        assert_eq!(result, "B\n\nA\n\n");
    }
}
