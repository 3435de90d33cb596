//! Single-shot upload of whole files.

use mediastack_upload_model::input::{FilePart, UploadFilesInput};
use mediastack_upload_model::output::{FileEntry, FilesOutput, MediaRecord};
use tracing::{debug, warn};

use crate::error::{UploadServiceError, UploadServiceResult};
use crate::media::{MediaSource, NewMedia};
use crate::provider::MediaUploader;
use crate::validation::{or_default, resolve_content_type, sanitize_file_name};

impl MediaUploader {
    /// Store every file of a request independently.
    ///
    /// A failing file becomes an error entry; the others are still stored.
    /// Entries keep request order.
    pub async fn upload_files(&self, input: UploadFilesInput) -> FilesOutput {
        let context = or_default(input.context.as_deref(), &self.config.default_context);
        let mut files = Vec::with_capacity(input.files.len());

        for part in input.files {
            let display_name =
                sanitize_file_name(part.file_name.as_deref().unwrap_or(&part.field_name));
            match self
                .store_file(part, &context, input.provider.as_deref())
                .await
            {
                Ok(record) => files.push(FileEntry::Uploaded(record)),
                Err(e) => {
                    warn!(file = %display_name, error = %e, "single-shot upload failed");
                    files.push(FileEntry::failed(display_name, e.to_string()));
                }
            }
        }

        debug!(
            context = %context,
            files = files.len(),
            failed = files.iter().filter(|f| !f.is_uploaded()).count(),
            "processed single-shot upload"
        );
        FilesOutput { files }
    }

    async fn store_file(
        &self,
        part: FilePart,
        context: &str,
        provider: Option<&str>,
    ) -> UploadServiceResult<MediaRecord> {
        let size = part.len();
        if size > self.config.max_single_upload_size {
            return Err(UploadServiceError::FileTooLarge {
                size,
                max: self.config.max_single_upload_size,
            });
        }

        let content_type = resolve_content_type(part.content_type.as_deref());
        let provider = self.resolve_provider(&content_type, provider, context);
        let stored = self
            .media
            .create_media(NewMedia {
                source: MediaSource::Bytes(part.data),
                name: sanitize_file_name(part.file_name.as_deref().unwrap_or_default()),
                content_type: content_type.to_string(),
                context: context.to_owned(),
                provider,
            })
            .await?;
        Ok(stored.into())
    }
}

#[cfg(test)]
mod tests {
    use mediastack_upload_model::input::UploadFilesInput;
    use mediastack_upload_model::output::FileEntry;

    use crate::test_support::{TestHarness, file_part};

    #[tokio::test]
    async fn test_should_keep_order_when_middle_file_fails() {
        let harness = TestHarness::new();
        harness.media.fail_on("two.txt");

        let output = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![
                    file_part("one.txt", "text/plain", b"1"),
                    file_part("two.txt", "text/plain", b"22"),
                    file_part("three.txt", "text/plain", b"333"),
                ],
                ..Default::default()
            })
            .await;

        assert_eq!(output.files.len(), 3);
        match &output.files[0] {
            FileEntry::Uploaded(record) => {
                assert_eq!(record.name, "one.txt");
                assert_eq!(record.size, 1);
            }
            FileEntry::Failed(f) => panic!("first file failed: {}", f.error),
        }
        match &output.files[1] {
            FileEntry::Failed(f) => {
                assert_eq!(f.name, "two.txt");
                assert!(f.error.contains("refused"));
            }
            FileEntry::Uploaded(_) => panic!("second file should fail"),
        }
        match &output.files[2] {
            FileEntry::Uploaded(record) => assert_eq!(record.name, "three.txt"),
            FileEntry::Failed(f) => panic!("third file failed: {}", f.error),
        }
        assert_eq!(harness.media.inner.len(), 2);
    }

    #[tokio::test]
    async fn test_should_sanitize_names_of_failed_files() {
        let harness = TestHarness::with_config(|c| c.max_single_upload_size = 1);
        let output = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![file_part("../../etc/pass\0wd.txt", "text/plain", b"too big")],
                ..Default::default()
            })
            .await;
        match &output.files[0] {
            FileEntry::Failed(f) => assert_eq!(f.name, "passwd.txt"),
            FileEntry::Uploaded(_) => panic!("oversized file should fail"),
        }
    }

    #[tokio::test]
    async fn test_should_reject_oversized_file_only() {
        let harness = TestHarness::with_config(|c| c.max_single_upload_size = 3);
        let output = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![
                    file_part("big.bin", "application/octet-stream", b"12345"),
                    file_part("ok.bin", "application/octet-stream", b"123"),
                ],
                ..Default::default()
            })
            .await;
        assert!(!output.files[0].is_uploaded());
        assert!(output.files[1].is_uploaded());
    }

    #[tokio::test]
    async fn test_should_apply_context_and_image_upgrade() {
        let harness = TestHarness::new();
        let output = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![
                    file_part("pic.png", "image/png", b"png"),
                    file_part("doc.png", "image/png", b"png"),
                ],
                context: Some("default".to_owned()),
                provider: None,
            })
            .await;
        let FileEntry::Uploaded(record) = &output.files[0] else {
            panic!("upload failed");
        };
        let stored = harness.media.inner.get(record.id).unwrap();
        assert_eq!(stored.provider, "media.provider.image");

        let output = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![file_part("scan.png", "image/png", b"png")],
                context: Some("docs".to_owned()),
                provider: None,
            })
            .await;
        let FileEntry::Uploaded(record) = &output.files[0] else {
            panic!("upload failed");
        };
        let stored = harness.media.inner.get(record.id).unwrap();
        assert_eq!(stored.provider, "media.provider.file");
        assert_eq!(stored.context, "docs");
    }

    #[tokio::test]
    async fn test_should_return_empty_list_without_files() {
        let harness = TestHarness::new();
        let output = harness
            .uploader
            .upload_files(UploadFilesInput::default())
            .await;
        assert!(output.files.is_empty());
    }

    #[tokio::test]
    async fn test_should_not_touch_scratch_storage() {
        let harness = TestHarness::new();
        let _ = harness
            .uploader
            .upload_files(UploadFilesInput {
                files: vec![file_part("a.txt", "text/plain", b"a")],
                ..Default::default()
            })
            .await;
        assert_eq!(harness.scratch_entries(), 0);
    }
}
