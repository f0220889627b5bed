use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};

pub fn read_folder(folder_path: &PathBuf) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.insert(0, path);
        } else if path.is_dir() {
            files.extend(read_folder(&path)?);
        }
    }

    files.sort();

    Ok(files)
}

/// Every `.json` file under `folder_path`, sorted.
pub fn read_json_folder(folder_path: &PathBuf) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = read_folder(folder_path)?;
    files.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
    Ok(files)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let content = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid request in {}", path.display()))?;
    Ok(content)
}

/// Writes `value` as pretty JSON to `out`, creating its parent folders.
pub fn write_json<T: Serialize>(out: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(out)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_read_folder() {
        let current_dir = env::current_dir().unwrap();
        let folder_path = current_dir.join("tests/fixtures/routes");
        let files = read_folder(&folder_path).unwrap();

        assert_eq!(
            files,
            vec![
                current_dir.join("tests/fixtures/routes/nested/route-c.json"),
                current_dir.join("tests/fixtures/routes/notes.txt"),
                current_dir.join("tests/fixtures/routes/route-a.json"),
                current_dir.join("tests/fixtures/routes/route-b.json"),
            ]
        );
    }

    #[test]
    fn test_read_json_folder_skips_other_files() {
        let current_dir = env::current_dir().unwrap();
        let files = read_json_folder(&current_dir.join("tests/fixtures/routes")).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|path| path.extension().unwrap() == "json"));
    }
}
