use thiserror::Error;
use uuid::{Uuid, Variant};

/// Upload limit for résumé files: 10 MiB.
pub const MAX_RESUME_BYTES: u64 = 10 * 1024 * 1024;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileValidationError {
    #[error("File is empty")]
    Empty,

    #[error("File size must be less than 10MB")]
    TooLarge,

    #[error("Only PDF files are allowed")]
    NotPdf,

    #[error("File must have a .pdf extension")]
    BadExtension,
}

/// Checks an upload before it ever reaches storage.
///
/// Order: emptiness, size, MIME type, extension. The first failing check wins.
pub fn validate_resume_file(
    file_name: &str,
    content_type: &str,
    size: u64,
) -> Result<(), FileValidationError> {
    if size == 0 {
        return Err(FileValidationError::Empty);
    }
    if size > MAX_RESUME_BYTES {
        return Err(FileValidationError::TooLarge);
    }
    if !content_type.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        return Err(FileValidationError::NotPdf);
    }
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(FileValidationError::BadExtension);
    }
    Ok(())
}

/// Human-readable size: `0 Bytes`, `1 KB`, `1.5 KB`, `2.25 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = bytes as f64 / divisor as f64;
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Accepts the canonical hyphenated RFC 4122 form, versions 1 through 5.
pub fn is_valid_uuid(value: &str) -> bool {
    if value.len() != 36 {
        return false;
    }
    match Uuid::parse_str(value) {
        Ok(id) => {
            id.get_variant() == Variant::RFC4122 && (1..=5).contains(&id.get_version_num())
        }
        Err(_) => false,
    }
}

/// Reduces a user-supplied file name to a storage-safe segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_pdf_passes() {
        assert!(validate_resume_file("cv.pdf", "application/pdf", 1024).is_ok());
        assert!(validate_resume_file("CV.PDF", "application/pdf", MAX_RESUME_BYTES).is_ok());
    }

    #[test]
    fn test_empty_file_rejected() {
        assert_eq!(
            validate_resume_file("cv.pdf", "application/pdf", 0),
            Err(FileValidationError::Empty)
        );
    }

    #[test]
    fn test_oversized_file_rejected() {
        let err = validate_resume_file("cv.pdf", "application/pdf", MAX_RESUME_BYTES + 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 10MB");
    }

    #[test]
    fn test_wrong_mime_rejected() {
        let err = validate_resume_file("cv.pdf", "image/png", 10).unwrap_err();
        assert_eq!(err.to_string(), "Only PDF files are allowed");
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let err = validate_resume_file("cv.docx", "application/pdf", 10).unwrap_err();
        assert_eq!(err.to_string(), "File must have a .pdf extension");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_format_file_size_is_monotonic_within_unit() {
        let small = format_file_size(2048);
        let large = format_file_size(4096);
        assert_eq!(small, "2 KB");
        assert_eq!(large, "4 KB");
    }

    #[test]
    fn test_generated_uuids_validate() {
        for _ in 0..20 {
            assert!(is_valid_uuid(&generate_uuid().to_string()));
        }
    }

    #[test]
    fn test_non_uuids_rejected() {
        assert!(!is_valid_uuid(""));
        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid("00000000-0000-0000-0000-000000000000"));
        assert!(!is_valid_uuid("936da01f9abd4d9d80c702af85c822a8"));
        assert!(!is_valid_uuid("936da01f-9abd-4d9d-80c7-02af85c822a8-extra"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Resume (final).pdf"), "My_Resume__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".."), "resume.pdf");
    }
}
