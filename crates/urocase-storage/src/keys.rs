//! Object key layout.

use uuid::Uuid;

const VIDEO_PREFIX: &str = "videos/";

/// Key of a stored, transcoded case video.
pub fn video_key(id: &Uuid) -> String {
    format!("{}{}.mp4", VIDEO_PREFIX, id)
}

/// Key for a video that has not been stored yet.
pub fn new_video_key() -> String {
    video_key(&Uuid::new_v4())
}

/// Whether `key` points into the video namespace.
pub fn is_video_key(key: &str) -> bool {
    key.strip_prefix(VIDEO_PREFIX)
        .and_then(|rest| rest.strip_suffix(".mp4"))
        .is_some_and(|id| Uuid::parse_str(id).is_ok())
}
