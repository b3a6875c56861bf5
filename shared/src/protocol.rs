use serde::Deserialize;
use thiserror::Error;

use crate::grid::GridError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Control messages on the video channel, tagged by `action`. The server
/// occasionally replies to command tokens with messages we don't know;
/// those land on `Unknown` and are logged and ignored by the caller.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum VideoControl {
    Init {
        width: u32,
        height: u32,
        #[serde(rename = "mbWidth")]
        mb_width: u32,
    },
    #[serde(other)]
    Unknown,
}

/// Control message on the motion channel: a full mask replacement, one
/// entry per block.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MotionControl {
    pub mask: Vec<u8>,
}

pub fn parse_video_control(text: &str) -> Result<VideoControl, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_motion_control(text: &str) -> Result<MotionControl, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Outbound command tokens on the video channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    ModeDay,
    ModeNight,
    StartRecord,
    StopRecord,
}

impl Command {
    pub fn token(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::ModeDay => "mode:day",
            Command::ModeNight => "mode:night",
            Command::StartRecord => "startrecord",
            Command::StopRecord => "stoprecord",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_init() {
        let control =
            parse_video_control(r#"{"action":"init","width":320,"height":240,"mbWidth":1}"#)
                .unwrap();
        assert_eq!(
            control,
            VideoControl::Init {
                width: 320,
                height: 240,
                mb_width: 1
            }
        );
    }

    #[test]
    fn unrecognized_action_is_unknown_not_error() {
        let control = parse_video_control(r#"{"action":"recording","file":"x.mp4"}"#).unwrap();
        assert_eq!(control, VideoControl::Unknown);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_video_control("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_video_control(r#"{"width":320}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn parses_mask_replacement() {
        let control = parse_motion_control(r#"{"mask":[0,1,0,1]}"#).unwrap();
        assert_eq!(control.mask, vec![0, 1, 0, 1]);
    }

    #[test]
    fn command_tokens_match_wire_format() {
        assert_eq!(Command::Start.token(), "start");
        assert_eq!(Command::ModeDay.token(), "mode:day");
        assert_eq!(Command::ModeNight.token(), "mode:night");
        assert_eq!(Command::StartRecord.token(), "startrecord");
        assert_eq!(Command::StopRecord.token(), "stoprecord");
    }
}
