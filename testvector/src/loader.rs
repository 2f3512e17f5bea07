//! Reading test vector files from disk.

use {
    crate::{
        error::{Result, TestVectorError},
        model::TestVector,
    },
    log::{debug, info},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// On-disk rendering of a test vector, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Load and parse one test vector file.
pub fn load_test_vector(path: &Path) -> Result<TestVector> {
    let format = Format::from_path(path).ok_or_else(|| TestVectorError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let text = fs::read_to_string(path).map_err(|source| TestVectorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let test_vector: TestVector = match format {
        Format::Json => serde_json::from_str(&text).map_err(|source| TestVectorError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Yaml => serde_yaml::from_str(&text).map_err(|source| TestVectorError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };
    debug!(
        "loaded {} test cases from {}",
        test_vector.test_cases.len(),
        path.display()
    );
    Ok(test_vector)
}

/// List the test vector files directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source: std::io::Error| TestVectorError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && Format::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    info!("found {} test vector files in {}", files.len(), dir.display());
    Ok(files)
}

/// A test vector's name: its file name without the extension.
pub fn test_vector_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, std::fs::File, std::io::Write, tempfile::TempDir};

    const YAML_VECTOR: &str = r#"
test_cases:
  - test_case_id: punt
    expectations:
      - expectation_id: exp-1
        check: { kind: packet_in, payload: "0102" }
"#;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = write_file(&dir, "punt.yaml", YAML_VECTOR);
        let json = write_file(&dir, "empty.json", r#"{"test_cases": []}"#);

        let tv = load_test_vector(&yaml).unwrap();
        assert_eq!(tv.test_cases[0].test_case_id, "punt");
        assert!(load_test_vector(&json).unwrap().test_cases.is_empty());
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let text = write_file(&dir, "vector.pb.txt", "test_cases {}");
        let broken = write_file(&dir, "broken.json", "{");

        assert_matches!(
            load_test_vector(&text),
            Err(TestVectorError::UnsupportedFormat { .. })
        );
        assert_matches!(load_test_vector(&broken), Err(TestVectorError::Json { .. }));
        assert_matches!(
            load_test_vector(&dir.path().join("missing.yml")),
            Err(TestVectorError::Io { .. })
        );
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "b.yml", YAML_VECTOR);
        write_file(&dir, "a.json", "{}");
        write_file(&dir, "notes.md", "");
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let names: Vec<_> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|path| test_vector_name(path))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
