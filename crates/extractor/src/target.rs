use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractError;

/// Room links as they appear in the wild: `https://live.douyin.com/<id>`,
/// with the scheme and `live.` prefix both optional.
pub static ROOM_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:live\.)?douyin\.com/([A-Za-z0-9_.-]+)").unwrap()
});

static ROOM_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

const LIVE_BASE_URL: &str = "https://live.douyin.com";

/// An immutable extraction target: the room id plus its normalized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTarget {
    room_id: String,
    url: String,
}

impl RoomTarget {
    /// Accepts a full room URL or a bare room id copied out of one.
    pub fn parse(input: &str) -> Result<Self, ExtractError> {
        let input = input.trim();
        let room_id = if let Some(caps) = ROOM_URL_REGEX.captures(input) {
            caps.get(1)
                .map(|m| m.as_str())
                .ok_or_else(|| ExtractError::InvalidUrl(input.to_string()))?
        } else if ROOM_ID_REGEX.is_match(input) {
            input
        } else {
            return Err(ExtractError::InvalidUrl(input.to_string()));
        };

        Ok(Self {
            room_id: room_id.to_string(),
            url: format!("{LIVE_BASE_URL}/{room_id}"),
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RoomTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
