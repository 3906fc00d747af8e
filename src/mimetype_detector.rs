use std::path::Path;

/// Detects MIME type based on file extension
pub fn from_path(path: &Path) -> Option<MimeType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}

/// Detects MIME type from file extension string
fn from_extension(ext: &str) -> Option<MimeType> {
    let ext_lower = ext.to_lowercase();
    match ext_lower.as_str() {
        "jpg" | "jpeg" => Some(MimeType::new("image", "jpeg")),
        "png" => Some(MimeType::new("image", "png")),
        "webp" => Some(MimeType::new("image", "webp")),
        _ => None,
    }
}

/// Declared content types the upload pipeline will decode.
pub const ACCEPTED_UPLOAD_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Checks a client-declared content type against [`ACCEPTED_UPLOAD_TYPES`].
///
/// Parameters such as `; charset=binary` are ignored and matching is case-insensitive.
pub fn is_accepted_upload(declared: &str) -> bool {
    MimeType::parse(declared)
        .map(|mime| ACCEPTED_UPLOAD_TYPES.contains(&mime.to_string().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    type_: String,
    subtype: String,
}

impl MimeType {
    fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_string(),
            subtype: subtype.to_string(),
        }
    }

    /// Parses the `type/subtype` essence of a Content-Type value.
    pub fn parse(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim().to_lowercase();
        let (type_, subtype) = essence.split_once('/')?;
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self::new(type_, subtype))
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}
