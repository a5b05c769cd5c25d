use crate::error::{AppError, AppResult};
use crate::models::{MediaImage, UploadedMedia};
use async_trait::async_trait;

pub const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A file picked by the user, read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[async_trait(?Send)]
pub trait MediaStore {
    /// Previously uploaded images.
    async fn list_media(&self) -> AppResult<Vec<MediaImage>>;

    /// Callers run [`validate_upload`] first; stores may check again.
    async fn upload(&self, upload: MediaUpload) -> AppResult<UploadedMedia>;
}

/// Reject uploads the server would refuse, before any request is made.
pub fn validate_upload(upload: &MediaUpload, max_bytes: u64) -> AppResult<()> {
    check_picked_file(&upload.content_type, upload.size(), max_bytes)
}

/// Same checks as [`validate_upload`] on a picked file's metadata, so an
/// oversized file is refused before it is read into memory.
pub fn check_picked_file(content_type: &str, size: u64, max_bytes: u64) -> AppResult<()> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(AppError::validation(
            "Invalid file type. Only images are allowed.",
        ));
    }
    if size > max_bytes {
        return Err(AppError::validation(format!(
            "File too large. Maximum size is {}MB.",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

pub fn is_image_file_name(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

pub fn image_files(entries: Vec<MediaImage>) -> Vec<MediaImage> {
    entries
        .into_iter()
        .filter(|e| is_image_file_name(&e.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, size: usize) -> MediaUpload {
        MediaUpload {
            file_name: "photo.png".into(),
            content_type: content_type.into(),
            bytes: vec![0; size],
        }
    }

    #[test]
    fn test_accepts_allowed_types_within_limit() {
        for ty in ALLOWED_CONTENT_TYPES {
            assert!(validate_upload(&upload(ty, 16), DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        }
    }

    #[test]
    fn test_rejects_other_types() {
        for ty in ["image/svg+xml", "application/pdf", "text/plain", ""] {
            let err = validate_upload(&upload(ty, 16), DEFAULT_MAX_UPLOAD_BYTES)
                .expect_err("type should be rejected");
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        assert!(validate_upload(&upload("image/png", 1024), 1024).is_ok());
        let err = validate_upload(&upload("image/png", 1025), 1024).expect_err("too large");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_too_large_message_names_limit() {
        let big = upload("image/png", (DEFAULT_MAX_UPLOAD_BYTES + 1) as usize);
        assert_eq!(
            validate_upload(&big, DEFAULT_MAX_UPLOAD_BYTES),
            Err(AppError::Validation(
                "File too large. Maximum size is 10MB.".into()
            ))
        );
    }

    #[test]
    fn test_picked_file_checked_from_metadata() {
        // 50MB file never gets read: the size alone rejects it.
        let err = check_picked_file("image/jpeg", 50 * 1024 * 1024, DEFAULT_MAX_UPLOAD_BYTES)
            .expect_err("too large");
        assert_eq!(
            err,
            AppError::Validation("File too large. Maximum size is 10MB.".into())
        );
        assert!(check_picked_file("image/gif", 10, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(check_picked_file("image/svg+xml", 10, DEFAULT_MAX_UPLOAD_BYTES).is_err());
    }

    #[test]
    fn test_image_file_name_filter() {
        assert!(is_image_file_name("a.png"));
        assert!(is_image_file_name("A.JPEG"));
        assert!(is_image_file_name("x.y.WebP"));
        assert!(!is_image_file_name("notes.txt"));
        assert!(!is_image_file_name("png"));
        assert!(!is_image_file_name("photo.png.txt"));

        let listed = image_files(vec![
            MediaImage {
                name: "a.gif".into(),
                url: "/media/a.gif".into(),
            },
            MediaImage {
                name: "b.svg".into(),
                url: "/media/b.svg".into(),
            },
        ]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a.gif");
    }
}
