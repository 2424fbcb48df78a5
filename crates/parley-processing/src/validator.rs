use parley_core::constants::{
    allowed_type_for_mime, MAX_FILES, MAX_FILE_SIZE, MAX_TOTAL_SIZE,
};
use parley_core::models::{file_extension, CandidateFile};
use parley_core::ValidationError;

pub use parley_core::Rejection;

/// Count and byte total of the attachments already admitted to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmittedTotals {
    pub count: usize,
    pub total_bytes: u64,
}

impl AdmittedTotals {
    pub fn new(count: usize, total_bytes: u64) -> Self {
        Self { count, total_bytes }
    }

    /// Totals after admitting `files` on top of these.
    pub fn with_files<'a>(self, files: impl IntoIterator<Item = &'a CandidateFile>) -> Self {
        files.into_iter().fold(self, |acc, file| Self {
            count: acc.count + 1,
            total_bytes: acc.total_bytes.saturating_add(file.byte_size()),
        })
    }
}

/// Outcome of screening a batch: the files that may be admitted and the
/// aggregate list of per-file rejections.
#[derive(Debug, Clone, Default)]
pub struct Screening {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<Rejection>,
}

impl Screening {
    pub fn is_fully_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Attachment validator
///
/// Checks candidates against size, type and count policy. Every check is a
/// pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentValidator {
    max_file_size: u64,
    max_files: usize,
    max_total_size: u64,
}

impl Default for AttachmentValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl AttachmentValidator {
    pub fn new(max_file_size: u64, max_files: usize, max_total_size: u64) -> Self {
        Self {
            max_file_size,
            max_files,
            max_total_size,
        }
    }

    /// Validator enforcing the limits shared with the relay.
    pub fn standard() -> Self {
        Self::new(MAX_FILE_SIZE, MAX_FILES, MAX_TOTAL_SIZE)
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate that the declared MIME type is allowed and that the file
    /// extension is the one paired with it.
    ///
    /// A `.pdf` declared as `text/plain` is rejected even though both halves
    /// appear in the table on their own.
    pub fn validate_type(&self, file_name: &str, mime_type: &str) -> Result<(), ValidationError> {
        let unsupported = || ValidationError::UnsupportedType {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        };

        let allowed = allowed_type_for_mime(mime_type).ok_or_else(unsupported)?;
        let extension = file_extension(file_name).ok_or_else(unsupported)?;

        if extension != allowed.extension {
            tracing::debug!(
                file_name = %file_name,
                mime_type = %mime_type,
                expected_extension = %allowed.extension,
                "Extension does not match declared MIME type"
            );
            return Err(unsupported());
        }

        Ok(())
    }

    /// Validate one candidate file: size first, then type.
    pub fn validate_single(&self, file: &CandidateFile) -> Result<(), ValidationError> {
        self.validate_file_size(file.byte_size())?;
        self.validate_type(file.name(), file.mime_type())?;
        Ok(())
    }

    /// Validate the aggregate limits of adding `new_files` to `existing`.
    pub fn validate_batch(
        &self,
        existing: AdmittedTotals,
        new_files: &[CandidateFile],
    ) -> Result<(), ValidationError> {
        let count = existing.count + new_files.len();
        if count > self.max_files {
            return Err(ValidationError::TooManyFiles {
                count,
                max: self.max_files,
            });
        }

        let total = existing.with_files(new_files).total_bytes;
        if total > self.max_total_size {
            return Err(ValidationError::TotalTooLarge {
                total,
                max: self.max_total_size,
            });
        }

        Ok(())
    }

    /// Check each file on its own, gathering the rejections.
    pub fn screen_files(&self, files: Vec<CandidateFile>) -> Screening {
        let mut screening = Screening::default();

        for file in files {
            match self.validate_single(&file) {
                Ok(()) => screening.accepted.push(file),
                Err(error) => {
                    tracing::debug!(
                        file_name = %file.name(),
                        mime_type = %file.mime_type(),
                        size = file.byte_size(),
                        error = %error,
                        "Rejected attachment"
                    );
                    screening.rejected.push(Rejection {
                        file_name: file.name().to_string(),
                        error,
                    });
                }
            }
        }

        screening
    }

    /// Screen a batch picked by the user.
    ///
    /// Each file is checked on its own and failures are gathered. The files
    /// that pass are then checked together against `existing`; a batch-level
    /// failure rejects the whole batch.
    pub fn screen_batch(
        &self,
        existing: AdmittedTotals,
        files: Vec<CandidateFile>,
    ) -> Result<Screening, ValidationError> {
        let screening = self.screen_files(files);
        self.validate_batch(existing, &screening.accepted)?;
        Ok(screening)
    }
}

/// Validate one candidate against the standard limits.
pub fn validate_single(file: &CandidateFile) -> Result<(), ValidationError> {
    AttachmentValidator::standard().validate_single(file)
}

/// Validate adding a batch to already admitted attachments, with the standard limits.
pub fn validate_batch(
    existing: AdmittedTotals,
    new_files: &[CandidateFile],
) -> Result<(), ValidationError> {
    AttachmentValidator::standard().validate_batch(existing, new_files)
}

/// Screen a batch with the standard limits.
pub fn screen_batch(
    existing: AdmittedTotals,
    files: Vec<CandidateFile>,
) -> Result<Screening, ValidationError> {
    AttachmentValidator::standard().screen_batch(existing, files)
}
