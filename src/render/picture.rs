use std::path::Path;

use printpdf::image_crate::{self, DynamicImage, GenericImageView};

use crate::models::user::DEFAULT_PROFILE_PICTURE;

/// Side of the square box the profile picture is fitted into, in points.
pub const PICTURE_BOX: f32 = 120.0;

pub const PICTURE_NOT_FOUND: &str = "(Profile picture not found)";
pub const PICTURE_ERROR: &str = "(Error displaying profile picture)";

/// Outcome of loading the profile picture. This is the one block of the
/// document that degrades to placeholder text instead of failing the render.
pub enum Picture {
    Image(DynamicImage),
    NotFound,
    Unreadable,
}

impl Picture {
    /// Looks `field` up in the uploads directory; an empty field means the
    /// default picture. Only the final path component is honoured.
    pub async fn load(uploads_dir: &Path, field: &str) -> Self {
        let name = match field.trim() {
            "" => DEFAULT_PROFILE_PICTURE,
            other => other,
        };
        let Some(file_name) = Path::new(name).file_name() else {
            return Picture::NotFound;
        };
        let path = uploads_dir.join(file_name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Picture::NotFound,
        }
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("reading profile picture {}: {e}", path.display());
                return Picture::Unreadable;
            }
        };
        match image_crate::load_from_memory(&bytes) {
            Ok(img) => Picture::Image(img),
            Err(e) => {
                log::warn!("decoding profile picture {}: {e}", path.display());
                Picture::Unreadable
            }
        }
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Picture::Image(_) => None,
            Picture::NotFound => Some(PICTURE_NOT_FOUND),
            Picture::Unreadable => Some(PICTURE_ERROR),
        }
    }
}

/// Scales `(w, h)` pixels to fit the picture box, keeping the aspect ratio.
pub fn fitted_size(img: &DynamicImage) -> (f32, f32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return (0.0, 0.0);
    }
    let scale = (PICTURE_BOX / w as f32).min(PICTURE_BOX / h as f32);
    (w as f32 * scale, h as f32 * scale)
}
