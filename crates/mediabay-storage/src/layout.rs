//! Canonical file names inside a workspace.
//!
//! Names depend only on the asset identifier, the media kind and the
//! thumbnail width, so every artifact of an upload can be located from its
//! identifier alone.

use uuid::Uuid;

pub const IMAGE_EXTENSION: &str = "jpg";
pub const VIDEO_EXTENSION: &str = "mp4";

/// `{id}.mp4` for videos, `{id}.jpg` for images.
pub fn original_file_name(asset_id: Uuid, is_video: bool) -> String {
    let ext = if is_video {
        VIDEO_EXTENSION
    } else {
        IMAGE_EXTENSION
    };
    format!("{}.{}", asset_id, ext)
}

/// `{id}.jpg`. For images this is the original itself.
pub fn cover_file_name(asset_id: Uuid) -> String {
    format!("{}.{}", asset_id, IMAGE_EXTENSION)
}

/// `{id}_{width}.jpg`
pub fn thumbnail_file_name(asset_id: Uuid, width: u32) -> String {
    format!("{}_{}.{}", asset_id, width, IMAGE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_follow_layout() {
        let id = Uuid::parse_str("01890a5d-ac96-774b-bcce-b302099a8057").unwrap();
        assert_eq!(
            original_file_name(id, false),
            "01890a5d-ac96-774b-bcce-b302099a8057.jpg"
        );
        assert_eq!(
            original_file_name(id, true),
            "01890a5d-ac96-774b-bcce-b302099a8057.mp4"
        );
        assert_eq!(
            cover_file_name(id),
            "01890a5d-ac96-774b-bcce-b302099a8057.jpg"
        );
        assert_eq!(
            thumbnail_file_name(id, 270),
            "01890a5d-ac96-774b-bcce-b302099a8057_270.jpg"
        );
    }

    #[test]
    fn test_image_original_doubles_as_cover() {
        let id = Uuid::new_v4();
        assert_eq!(original_file_name(id, false), cover_file_name(id));
    }
}
