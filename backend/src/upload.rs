use actix_multipart::Multipart;
use futures::TryStreamExt;
use image::RgbImage;

pub const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file part in request")]
    MissingFile,
    #[error("file part has an empty filename")]
    EmptyFilename,
    #[error("Failed to read upload: {0}")]
    Read(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode image: {0}")]
pub struct DecodeError(#[from] image::ImageError);

/// Raw upload for a single request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Decode to 8-bit RGB regardless of the source colour type.
    pub fn decode(&self) -> Result<RgbImage, DecodeError> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgb8())
    }
}

/// Pull the `file` part out of a multipart body. Parts without a filename
/// are form values, not files, and don't count.
pub async fn read_file_field(mut payload: Multipart) -> Result<UploadedImage, UploadError> {
    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(UploadError::MissingFile),
            Err(e) => {
                log::debug!("Multipart framing error before file part: {}", e);
                return Err(UploadError::MissingFile);
            }
        };

        let filename = if field.name() == Some(FILE_FIELD) {
            field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_owned)
        } else {
            None
        };

        let Some(filename) = filename else {
            // Drain so the stream can advance to the next part.
            while field
                .try_next()
                .await
                .map_err(|e| UploadError::Read(e.to_string()))?
                .is_some()
            {}
            continue;
        };

        if filename.is_empty() {
            return Err(UploadError::EmptyFilename);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| UploadError::Read(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
        }
        return Ok(UploadedImage { filename, bytes });
    }
}
