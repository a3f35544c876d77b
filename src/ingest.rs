//! Image ingestion: turn an uploaded file into an in-memory RGB bitmap.

use crate::error::{Result, XrayReportError};
use image::{ImageReader, RgbImage};
use std::io::Cursor;
use tracing::{debug, info};
use uuid::Uuid;

/// Image formats accepted by the upload control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Extensions the file picker offers.
    pub const ACCEPTED_EXTENSIONS: [&'static str; 3] = ["jpg", "jpeg", "png"];

    /// Resolve a format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn from_sniffed(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// An uploaded image together with its decoded bitmap.
///
/// Each upload gets a fresh interaction id so that a report can be tied back
/// to the exact image it was produced from.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    id: Uuid,
    file_name: String,
    format: ImageFormat,
    bytes: Vec<u8>,
    bitmap: RgbImage,
}

impl UploadedImage {
    /// Validate the file name and decode the bytes.
    ///
    /// Fails with [`XrayReportError::ImageDecode`] when the extension is not
    /// accepted or when the content is not a decodable JPEG/PNG image. No
    /// resizing or repair is attempted.
    pub fn from_upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();

        if ImageFormat::from_file_name(&file_name).is_none() {
            return Err(XrayReportError::ImageDecode(format!(
                "{} is not a JPG or PNG file",
                file_name
            )));
        }

        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| XrayReportError::ImageDecode(e.to_string()))?;

        let format = reader
            .format()
            .and_then(ImageFormat::from_sniffed)
            .ok_or_else(|| {
                XrayReportError::ImageDecode(format!(
                    "{} does not contain JPEG or PNG data",
                    file_name
                ))
            })?;

        let bitmap = reader
            .decode()
            .map_err(|e| XrayReportError::ImageDecode(e.to_string()))?
            .to_rgb8();

        info!(
            file_name = %file_name,
            width = bitmap.width(),
            height = bitmap.height(),
            "Accepted upload"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            file_name,
            format,
            bytes,
            bitmap,
        })
    }

    /// Interaction id of this upload.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Format detected from the file content.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The bytes exactly as uploaded.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The normalized RGB bitmap.
    pub fn bitmap(&self) -> &RgbImage {
        &self.bitmap
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }

    /// Re-encode the RGB bitmap as PNG.
    ///
    /// Both the model request and the exported document carry this encoding,
    /// so they see the same normalized pixels.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.bitmap
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| XrayReportError::Render(format!("PNG encoding failed: {}", e)))?;
        debug!(bytes = buf.len(), "Encoded bitmap as PNG");
        Ok(buf)
    }
}
