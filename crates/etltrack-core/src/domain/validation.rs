use super::{
    DomainError,
    DomainResult,
};

const MAX_RUN_ID_LENGTH: usize = 128;

pub fn validate_run_id(run_id: &str) -> DomainResult<()> {
    if run_id.is_empty() {
        return Err(DomainError::InvalidEvent(
            "Run id cannot be empty".to_string(),
        ));
    }

    if run_id.len() > MAX_RUN_ID_LENGTH {
        return Err(DomainError::InvalidEvent(format!(
            "Run id '{}...' exceeds maximum length of {} characters",
            &run_id[..32.min(run_id.len())],
            MAX_RUN_ID_LENGTH
        )));
    }

    if !run_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(DomainError::InvalidEvent(format!(
            "Run id '{}' contains invalid characters (only alphanumeric, underscore, hyphen, dot allowed)",
            run_id
        )));
    }

    Ok(())
}

pub fn validate_job_figures(duration_seconds: i64, records: i64) -> DomainResult<()> {
    if duration_seconds < 0 {
        return Err(DomainError::InvalidEvent(format!(
            "Job duration cannot be negative: {}",
            duration_seconds
        )));
    }

    if records < 0 {
        return Err(DomainError::InvalidEvent(format!(
            "Job record count cannot be negative: {}",
            records
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_run_ids() {
        assert!(validate_run_id("run-2024-001").is_ok());
        assert!(validate_run_id("nightly.load_7").is_ok());
    }

    #[test]
    fn test_invalid_run_ids() {
        assert!(validate_run_id("").is_err());
        assert!(validate_run_id("run 001").is_err());
        assert!(validate_run_id(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_job_figures() {
        assert!(validate_job_figures(0, 0).is_ok());
        assert!(validate_job_figures(45, 45200).is_ok());
        assert!(validate_job_figures(-1, 0).is_err());
        assert!(validate_job_figures(0, -1).is_err());
    }
}
