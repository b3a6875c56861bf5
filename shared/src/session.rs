use crate::grid::{CoordinateCache, GridDescriptor, GridError};
use crate::mask::{EditGesture, MotionMask};
use crate::protocol::{self, MotionControl, ProtocolError, VideoControl};
use crate::scale::{self, ScalingState};

/// Channel lifecycle. `Closed` is terminal: there is no reconnect, a
/// closed channel stays closed for the life of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closed => "closed",
        }
    }

    fn advance(&mut self, next: ChannelState) {
        if *self != ChannelState::Closed {
            *self = next;
        }
    }
}

/// What the embedding layer must do after a video-channel message.
#[derive(Debug, PartialEq, Eq)]
pub enum VideoEffect {
    /// Stream-init: size the canvases and re-run the viewport fit.
    Configure(GridDescriptor),
    /// Non-empty frame payload: repaint the overlay, then decode.
    RenderFrame,
    /// Zero-length heartbeat, dropped.
    Heartbeat,
    /// Recognized but irrelevant control reply; log and move on.
    Ignored,
}

/// What the embedding layer must do after a motion-channel message.
#[derive(Debug, PartialEq, Eq)]
pub enum MotionEffect {
    /// Full mask replacement applied.
    MaskReplaced,
    /// Block indices flagged for this tick, to highlight transiently.
    Detections(Vec<usize>),
    /// Payload dropped: empty, or the grid is still unknown.
    Dropped,
}

/// Per-viewer session state. Both channels feed this on a single thread;
/// the only hazard is ordering, not data races. A server mask push landing
/// mid-gesture overwrites local edits (last write wins, by protocol).
#[derive(Default)]
pub struct SessionCore {
    pub video_state: ChannelState,
    pub motion_state: ChannelState,
    grid: Option<GridDescriptor>,
    cache: Option<CoordinateCache>,
    pub mask: MotionMask,
    gesture: EditGesture,
    pub edit_active: bool,
    pub scaling: ScalingState,
    frame_counter: u64,
}

impl SessionCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> Option<&GridDescriptor> {
        self.grid.as_ref()
    }

    /// The shared index-to-pixel cache, available only after stream-init.
    pub fn coordinates(&self) -> Result<&CoordinateCache, GridError> {
        self.cache.as_ref().ok_or(GridError::NotInitialized)
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn set_video_state(&mut self, next: ChannelState) {
        self.video_state.advance(next);
    }

    pub fn set_motion_state(&mut self, next: ChannelState) {
        self.motion_state.advance(next);
    }

    pub fn on_video_text(&mut self, text: &str) -> Result<VideoEffect, ProtocolError> {
        match protocol::parse_video_control(text)? {
            VideoControl::Init {
                width,
                height,
                mb_width,
            } => {
                let descriptor = GridDescriptor::from_init(width, height, mb_width)?;
                // Rebuild the cache only when dimensions actually changed.
                if self.grid != Some(descriptor) {
                    self.cache = Some(CoordinateCache::build(descriptor));
                    self.grid = Some(descriptor);
                }
                Ok(VideoEffect::Configure(descriptor))
            }
            VideoControl::Unknown => Ok(VideoEffect::Ignored),
        }
    }

    pub fn on_video_binary(&mut self, len: usize) -> VideoEffect {
        if len == 0 {
            return VideoEffect::Heartbeat;
        }
        self.frame_counter += 1;
        VideoEffect::RenderFrame
    }

    pub fn on_motion_text(&mut self, text: &str) -> Result<MotionEffect, ProtocolError> {
        let MotionControl { mask } = protocol::parse_motion_control(text)?;
        self.mask.replace(mask);
        Ok(MotionEffect::MaskReplaced)
    }

    pub fn on_motion_binary(&mut self, bytes: &[u8]) -> MotionEffect {
        if bytes.is_empty() {
            return MotionEffect::Dropped;
        }
        // Stream-init race: detection data can beat the init message here
        // because the channels connect independently.
        let Some(cache) = self.cache.as_ref() else {
            return MotionEffect::Dropped;
        };
        let flagged = bytes
            .iter()
            .take(cache.len())
            .enumerate()
            .filter(|&(_, &byte)| byte == 1)
            .map(|(index, _)| index)
            .collect();
        MotionEffect::Detections(flagged)
    }

    /// Recomputes the fit of the video canvas into the viewport. Keeps the
    /// identity transform while dimensions are unknown.
    pub fn rescale(&mut self, viewport_w: f64, viewport_h: f64, top_inset: f64) -> ScalingState {
        self.scaling = match self.grid {
            Some(grid) => scale::fit(
                viewport_w,
                viewport_h,
                grid.width_px as f64,
                grid.height_px as f64,
                top_inset,
            ),
            None => ScalingState {
                top_offset: top_inset,
                ..ScalingState::default()
            },
        };
        self.scaling
    }

    /// Toggles mask-edit mode. Entry is refused until the grid is known;
    /// an absent mask is lazily zero-filled to one flag per block.
    pub fn toggle_edit(&mut self) -> bool {
        if self.edit_active {
            self.edit_active = false;
            self.gesture = EditGesture::Idle;
            return false;
        }
        let Some(cache) = self.cache.as_ref() else {
            return false;
        };
        if self.mask.is_empty() {
            self.mask.reset(cache.len());
        }
        self.edit_active = true;
        true
    }

    fn block_at(&self, x: f64, y: f64) -> Option<usize> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.cache.as_ref()?.coord_to_index(x as u32, y as u32)
    }

    /// Pointer press in canvas space: fixes the brush and paints the
    /// pressed block.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if !self.edit_active {
            return;
        }
        if let Some(index) = self.block_at(x, y) {
            self.gesture.press(&mut self.mask, index);
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !self.edit_active {
            return;
        }
        if let Some(index) = self.block_at(x, y) {
            self.gesture.drag(&mut self.mask, index);
        }
    }

    /// Pointer release: paints the final block and yields the full mask to
    /// transmit. Partial updates are not part of the protocol; every
    /// completed gesture costs one full-mask round trip.
    pub fn pointer_up(&mut self, point: Option<(f64, f64)>) -> Option<Vec<u8>> {
        if !self.edit_active {
            return None;
        }
        let index = point.and_then(|(x, y)| self.block_at(x, y));
        if self.gesture.release(&mut self.mask, index) {
            Some(self.mask.as_bytes().to_vec())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT_320: &str = r#"{"action":"init","width":320,"height":240,"mbWidth":1}"#;

    fn initialized() -> SessionCore {
        let mut session = SessionCore::new();
        session.on_video_text(INIT_320).unwrap();
        session
    }

    #[test]
    fn init_publishes_grid_and_cache() {
        let mut session = SessionCore::new();
        let effect = session.on_video_text(INIT_320).unwrap();
        let grid = match effect {
            VideoEffect::Configure(grid) => grid,
            other => panic!("expected Configure, got {other:?}"),
        };
        assert_eq!(grid.block_size, 16);
        assert_eq!(grid.grid_width, 20);
        assert_eq!(session.coordinates().unwrap().len(), 300);
    }

    #[test]
    fn repeated_init_with_same_dimensions_reconfigures() {
        let mut session = initialized();
        let effect = session.on_video_text(INIT_320).unwrap();
        assert!(matches!(effect, VideoEffect::Configure(_)));
        assert_eq!(session.coordinates().unwrap().len(), 300);
    }

    #[test]
    fn init_with_new_dimensions_rebuilds_cache() {
        let mut session = initialized();
        session
            .on_video_text(r#"{"action":"init","width":640,"height":480,"mbWidth":2}"#)
            .unwrap();
        let grid = *session.grid().unwrap();
        assert_eq!(grid.block_size, 32);
        assert_eq!(session.coordinates().unwrap().len(), 300);
    }

    #[test]
    fn coordinates_before_init_is_not_initialized() {
        let session = SessionCore::new();
        assert_eq!(
            session.coordinates().err(),
            Some(GridError::NotInitialized)
        );
    }

    #[test]
    fn unknown_control_is_ignored_not_fatal() {
        let mut session = SessionCore::new();
        let effect = session
            .on_video_text(r#"{"action":"recording-started"}"#)
            .unwrap();
        assert_eq!(effect, VideoEffect::Ignored);
        assert!(session.grid().is_none());
    }

    #[test]
    fn malformed_control_leaves_session_untouched() {
        let mut session = initialized();
        assert!(session.on_video_text("{{{").is_err());
        assert!(session.on_motion_text("nope").is_err());
        assert!(session.grid().is_some());
        assert!(session.mask.is_empty());
    }

    #[test]
    fn frame_counter_ticks_only_on_nonempty_payloads() {
        let mut session = initialized();
        assert_eq!(session.on_video_binary(0), VideoEffect::Heartbeat);
        assert_eq!(session.frame_counter(), 0);
        assert_eq!(session.on_video_binary(1400), VideoEffect::RenderFrame);
        assert_eq!(session.on_video_binary(900), VideoEffect::RenderFrame);
        assert_eq!(session.frame_counter(), 2);
    }

    #[test]
    fn detection_vector_maps_flagged_indices() {
        let mut session = initialized();
        let mut vector = vec![0u8; 300];
        vector[5] = 1;
        vector[42] = 1;
        let effect = session.on_motion_binary(&vector);
        assert_eq!(effect, MotionEffect::Detections(vec![5, 42]));
        // Index 5 highlights the block at (80, 0).
        assert_eq!(
            session.coordinates().unwrap().index_to_coord(5),
            Some((80, 0))
        );
    }

    #[test]
    fn detection_before_init_is_dropped_silently() {
        let mut session = SessionCore::new();
        assert_eq!(session.on_motion_binary(&[1, 0, 1]), MotionEffect::Dropped);
        assert!(session.mask.is_empty());
    }

    #[test]
    fn empty_motion_payload_is_dropped() {
        let mut session = initialized();
        assert_eq!(session.on_motion_binary(&[]), MotionEffect::Dropped);
    }

    #[test]
    fn mask_replacement_overwrites_unconditionally() {
        let mut session = initialized();
        session
            .on_motion_text(r#"{"mask":[1,0,1]}"#)
            .unwrap();
        assert_eq!(session.mask.as_bytes(), &[1, 0, 1]);
    }

    #[test]
    fn edit_mode_requires_grid_and_lazily_builds_mask() {
        let mut session = SessionCore::new();
        assert!(!session.toggle_edit());
        assert!(!session.edit_active);

        let mut session = initialized();
        assert!(session.toggle_edit());
        assert_eq!(session.mask.len(), 300);
        assert!(session.mask.as_bytes().iter().all(|&flag| flag == 0));
        assert!(!session.toggle_edit());
        assert!(!session.edit_active);
    }

    #[test]
    fn edit_gesture_paints_four_blocks_and_transmits_once() {
        let mut session = initialized();
        session.toggle_edit();

        // Press block 0, drag across blocks 1..=3, release on block 3.
        session.pointer_down(4.0, 4.0);
        session.pointer_move(20.0, 4.0);
        session.pointer_move(36.0, 4.0);
        session.pointer_move(52.0, 4.0);
        let payload = session.pointer_up(Some((52.0, 4.0)));

        let payload = payload.expect("release must transmit");
        assert_eq!(payload.len(), 300);
        assert_eq!(&payload[0..4], &[1, 1, 1, 1]);
        assert!(payload[4..].iter().all(|&flag| flag == 0));

        // Nothing further to transmit without a new gesture.
        assert_eq!(session.pointer_up(Some((52.0, 4.0))), None);
    }

    #[test]
    fn pointer_events_outside_edit_mode_are_inert() {
        let mut session = initialized();
        session.pointer_down(4.0, 4.0);
        session.pointer_move(20.0, 4.0);
        assert_eq!(session.pointer_up(Some((20.0, 4.0))), None);
        assert!(session.mask.is_empty());
    }

    #[test]
    fn release_off_canvas_still_transmits() {
        let mut session = initialized();
        session.toggle_edit();
        session.pointer_down(4.0, 4.0);
        let payload = session.pointer_up(None).expect("gesture completed");
        assert_eq!(payload[0], 1);
    }

    #[test]
    fn server_push_mid_gesture_wins() {
        // Known, documented race: a late server replacement lands while a
        // gesture is painting; the replacement takes the mask wholesale and
        // the gesture finishes on top of it.
        let mut session = initialized();
        session.toggle_edit();
        session.pointer_down(4.0, 4.0);
        session
            .on_motion_text(&format!(r#"{{"mask":[{}]}}"#, vec!["0"; 300].join(",")))
            .unwrap();
        let payload = session.pointer_up(Some((20.0, 4.0))).unwrap();
        assert_eq!(payload[0], 0, "press was overwritten by the server push");
        assert_eq!(payload[1], 1, "release still painted the final block");
    }

    #[test]
    fn closed_channel_state_is_terminal() {
        let mut session = SessionCore::new();
        assert_eq!(session.video_state, ChannelState::Connecting);
        session.set_video_state(ChannelState::Open);
        session.set_video_state(ChannelState::Closed);
        session.set_video_state(ChannelState::Open);
        assert_eq!(session.video_state, ChannelState::Closed);
    }

    #[test]
    fn rescale_uses_grid_dimensions() {
        let mut session = initialized();
        let scaling = session.rescale(160.0, 1000.0, 0.0);
        assert_eq!(scaling.scale_factor, 0.5);
        // Unknown grid keeps the identity transform.
        let mut bare = SessionCore::new();
        assert_eq!(bare.rescale(160.0, 1000.0, 32.0).scale_factor, 1.0);
    }
}
