//! Download preference keys and values

use serde::{Deserialize, Serialize};

pub const DOWNLOAD_LONG_PRESS_ACTION_KEY: &str = "downloadLongPressAction";
pub const DOWNLOAD_DESTINATION_KEY: &str = "downloadDestination";
/// Device-local folder bookmark; never leaves the device.
pub const DOWNLOAD_FILES_ROOT_URI_KEY: &str = "downloadFilesRootUri";

/// What a long press on media does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaLongPressAction {
    #[default]
    Share,
    Download,
}

impl MediaLongPressAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::Download => "download",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "share" => Some(Self::Share),
            "download" => Some(Self::Download),
            _ => None,
        }
    }
}

/// Where downloaded media is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownloadDestination {
    #[default]
    Photos,
    Files,
}

impl DownloadDestination {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Files => "files",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "photos" => Some(Self::Photos),
            "files" => Some(Self::Files),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_app_defaults() {
        assert_eq!(MediaLongPressAction::default(), MediaLongPressAction::Share);
        assert_eq!(DownloadDestination::default(), DownloadDestination::Photos);
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(MediaLongPressAction::parse("download"), Some(MediaLongPressAction::Download));
        assert_eq!(MediaLongPressAction::parse("Download"), None);
        assert_eq!(DownloadDestination::parse("files"), Some(DownloadDestination::Files));
        assert_eq!(DownloadDestination::parse("camera"), None);
    }
}
