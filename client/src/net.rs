pub const VIDEO_PATH: &str = "/ws/video";
pub const MOTION_PATH: &str = "/ws/motion";

/// Suffixes the caller-supplied base address with a channel path.
pub fn channel_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
