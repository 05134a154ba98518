//! Newline-delimited domain list ingestion

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Read targets from a file, one `host[:port]` per line.
///
/// Lines are trimmed and may be wrapped in single or double quotes. Blank
/// lines are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a line contains a comma,
/// or no target is left.
pub async fn from_list(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot open file \"{}\"", path.display()))?;

    let mut targets = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = check_line(line).with_context(|| format!("line {}", number + 1))?;
        if !line.is_empty() {
            targets.push(line.to_string());
        }
    }

    if targets.is_empty() {
        bail!("no line provided in \"{}\"", path.display());
    }

    Ok(targets)
}

fn check_line(line: &str) -> Result<&str> {
    let line = line.trim();
    if line.contains(',') {
        bail!("invalid line detected: comma not allowed");
    }
    Ok(line.trim_matches(['\'', '"']))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn list(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_check_line() {
        assert_eq!(check_line("  example.test  ").unwrap(), "example.test");
        assert_eq!(check_line("\"example.test:8443\"").unwrap(), "example.test:8443");
        assert_eq!(check_line("'example.test'").unwrap(), "example.test");
        assert_eq!(check_line("   ").unwrap(), "");
        assert!(check_line("a.test,b.test").is_err());
    }

    #[tokio::test]
    async fn test_from_list() {
        let file = list("example.test\n\n  'www.example.test:8443'\n\"api.example.test\"\n");
        let targets = from_list(file.path()).await.unwrap();
        assert_eq!(
            targets,
            vec!["example.test", "www.example.test:8443", "api.example.test"]
        );
    }

    #[tokio::test]
    async fn test_from_list_crlf() {
        let file = list("a.example.test\r\nb.example.test\r\n");
        let targets = from_list(file.path()).await.unwrap();
        assert_eq!(targets, vec!["a.example.test", "b.example.test"]);
    }

    #[tokio::test]
    async fn test_from_list_comma() {
        let file = list("example.test\na.test,b.test\n");
        let err = from_list(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("comma not allowed"));
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[tokio::test]
    async fn test_from_list_empty() {
        let file = list("\n   \n\n");
        let err = from_list(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("no line provided"));
    }

    #[tokio::test]
    async fn test_from_list_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = from_list(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(err.to_string().contains("cannot open file"));
    }
}
