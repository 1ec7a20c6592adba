use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use neonlocks_contracts::EncodedImage;
use thiserror::Error;

pub const MAX_IMAGE_SIZE_MB: u64 = 4;
pub const MAX_IMAGE_BYTES: u64 = MAX_IMAGE_SIZE_MB * 1024 * 1024;

const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Rejections from [`accept_file`]. Only `Read` is not a validation failure.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Please upload an image file (JPG, PNG).")]
    NotAnImage { content_type: String },

    #[error("Image size must be less than {MAX_IMAGE_SIZE_MB}MB.")]
    TooLarge { size: u64 },

    #[error("failed to read {name}: {source}")]
    Read { name: String, source: io::Error },
}

impl IntakeError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Read { .. })
    }
}

/// A file offered for upload: declared type and size up front, bytes on demand.
pub trait ImageSource {
    fn name(&self) -> &str;
    fn content_type(&self) -> &str;
    fn size(&self) -> u64;
    fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

/// A file on disk. The declared type comes from the extension, the way a
/// browser labels a picked file.
#[derive(Debug, Clone)]
pub struct LocalImageFile {
    path: PathBuf,
    name: String,
    content_type: String,
    size: u64,
}

impl LocalImageFile {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self {
            content_type: content_type_for_path(&path).to_string(),
            size: metadata.len(),
            name,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for LocalImageFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MemoryImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl ImageSource for MemoryImageFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_CONTENT_TYPE)
}

/// Validates the declared type, then the size, then reads the whole file.
pub fn accept_file(file: &dyn ImageSource) -> Result<EncodedImage, IntakeError> {
    let content_type = file.content_type();
    if !content_type.starts_with("image/") {
        return Err(IntakeError::NotAnImage {
            content_type: content_type.to_string(),
        });
    }
    if file.size() > MAX_IMAGE_BYTES {
        return Err(IntakeError::TooLarge { size: file.size() });
    }

    let bytes = file.read_bytes().map_err(|source| IntakeError::Read {
        name: file.name().to_string(),
        source,
    })?;
    Ok(EncodedImage::from_bytes(content_type, &bytes))
}
