use std::path::Path;

use gatebench_core::Request;

use crate::error::EvalError;

/// Load a JSONL workload: one request per non-empty line.
///
/// Validation happens here, not in the runner: a request missing a required
/// field fails the load with its line number, and an empty workload is an
/// error rather than a silent no-op run.
pub fn load_workload(path: &Path) -> Result<Vec<Request>, EvalError> {
    let content = std::fs::read_to_string(path)?;

    let mut workload = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: Request = serde_json::from_str(line).map_err(|e| {
            EvalError::Workload(format!(
                "invalid request on line {}: {e}",
                index + 1
            ))
        })?;
        workload.push(request);
    }

    if workload.is_empty() {
        return Err(EvalError::Workload(format!(
            "empty workload: {}",
            path.display()
        )));
    }

    tracing::info!(path = %path.display(), requests = workload.len(), "Workload loaded");
    Ok(workload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_workload(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_jsonl() {
        let file = write_workload(concat!(
            r#"{"id":"r1","modality":"text","input":"hi","max_output_tokens":10}"#,
            "\n",
            "\n", // blank lines are skipped
            r#"{"id":"r2","modality":"text","input":"there","max_output_tokens":20,"metadata":{"category":"trivial"}}"#,
            "\n",
        ));

        let workload = load_workload(file.path()).unwrap();
        assert_eq!(workload.len(), 2);
        assert_eq!(workload[0].id, "r1");
        assert_eq!(workload[1].category_hint(), Some("trivial"));
    }

    #[test]
    fn missing_field_names_the_line() {
        let file = write_workload(concat!(
            r#"{"id":"r1","modality":"text","input":"hi","max_output_tokens":10}"#,
            "\n",
            r#"{"id":"r2","modality":"text","input":"no cap"}"#,
            "\n",
        ));

        let err = load_workload(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let file = write_workload("not json at all\n");
        assert!(matches!(
            load_workload(file.path()),
            Err(EvalError::Workload(_))
        ));
    }

    #[test]
    fn empty_workload_is_rejected() {
        let file = write_workload("\n\n");
        let err = load_workload(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty workload"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = Path::new("/nonexistent/workload.jsonl");
        assert!(matches!(load_workload(path), Err(EvalError::Io(_))));
    }
}
