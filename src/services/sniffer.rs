use crate::api::error::AppError;
use crate::config::UploadConfig;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of leading bytes inspected to determine the content type
pub const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";

/// The record field an upload targets. Decides the multipart field name,
/// the accepted content types and the size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaField {
    Thumbnail,
    Video,
}

impl MediaField {
    pub fn form_name(self) -> &'static str {
        match self {
            MediaField::Thumbnail => "thumbnail",
            MediaField::Video => "video",
        }
    }

    pub fn accepted_types(self) -> &'static [&'static str] {
        match self {
            MediaField::Thumbnail => &["image/jpeg", "image/png"],
            MediaField::Video => &["video/mp4"],
        }
    }

    pub fn size_limit(self, config: &UploadConfig) -> u64 {
        match self {
            MediaField::Thumbnail => config.max_thumbnail_size,
            MediaField::Video => config.max_video_size,
        }
    }
}

/// Content type determined from the bytes themselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffedType {
    pub mime_type: String,
    pub extension: &'static str,
}

/// Determine the media type of `header`. The client-declared type plays no part.
pub fn sniff(header: &[u8]) -> SniffedType {
    if let Some(kind) = infer::get(header) {
        return SniffedType {
            mime_type: normalize(kind.mime_type()),
            extension: kind.extension(),
        };
    }

    if !header.is_empty() && !header.contains(&0) && std::str::from_utf8(header).is_ok() {
        return SniffedType {
            mime_type: mime::TEXT_PLAIN.essence_str().to_string(),
            extension: "txt",
        };
    }

    SniffedType {
        mime_type: OCTET_STREAM.to_string(),
        extension: "bin",
    }
}

/// Sniff `header` and check it against the accepted set for `field`
pub fn validate(field: MediaField, header: &[u8]) -> Result<SniffedType, AppError> {
    let sniffed = sniff(header);
    if field
        .accepted_types()
        .iter()
        .any(|accepted| *accepted == sniffed.mime_type)
    {
        Ok(sniffed)
    } else {
        Err(AppError::UnsupportedMediaType(format!(
            "sniffed '{}' for {} upload",
            sniffed.mime_type,
            field.form_name()
        )))
    }
}

/// Read up to `SNIFF_LEN` bytes. Shorter streams yield whatever they have.
/// The caller must chain the returned bytes back in front of the reader.
pub async fn read_header<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    header.truncate(filled);
    Ok(header)
}

// Drop parameters and case, e.g. "Image/JPEG; q=1" -> "image/jpeg"
fn normalize(raw: &str) -> String {
    raw.parse::<mime::Mime>()
        .map(|m| m.essence_str().to_lowercase())
        .unwrap_or_else(|_| OCTET_STREAM.to_string())
}
