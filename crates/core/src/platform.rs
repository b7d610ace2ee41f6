//! URL classification into supported platforms.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A content source a URL can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Snapchat,
    Instagram,
    TikTok,
    Twitter,
    Facebook,
    Unknown,
}

impl Platform {
    /// Stable lowercase name, used for credential file keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Snapchat => "snapchat",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Unknown => "unknown",
        }
    }

    /// Platforms a user can actually request, for error hints.
    pub fn supported() -> &'static [Platform] {
        &[
            Platform::Snapchat,
            Platform::Instagram,
            Platform::TikTok,
            Platform::Twitter,
            Platform::Facebook,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Classify a URL into a [`Platform`].
///
/// Host matching is case-insensitive and ignores a leading `www.`.
/// URLs that parse but whose host is not recognized map to
/// [`Platform::Unknown`]; unparseable or host-less URLs are errors.
pub fn identify(url: &str) -> Result<Platform, PlatformError> {
    let parsed = Url::parse(url).map_err(|_| PlatformError::InvalidUrl(url.to_string()))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| PlatformError::MissingHost(url.to_string()))?
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let platform = if host.contains("snapchat.com") {
        Platform::Snapchat
    } else if host.contains("instagram.com") {
        Platform::Instagram
    } else if host.contains("tiktok.com") {
        Platform::TikTok
    } else if host.contains("twitter.com") || host == "x.com" || host.ends_with(".x.com") {
        Platform::Twitter
    } else if host.contains("facebook.com") || host.contains("fb.watch") {
        Platform::Facebook
    } else {
        Platform::Unknown
    };

    Ok(platform)
}

/// Extract the username from a Snapchat profile/story URL.
///
/// Recognized paths: `/add/<user>`, `/stories/<user>`, `/spotlight/<user>`,
/// with or without trailing segments (share links append `/l`).
pub fn snapchat_username(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let action = segments.next()?.to_ascii_lowercase();
    if !matches!(action.as_str(), "add" | "stories" | "spotlight") {
        return None;
    }

    segments.next().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_all_supported_hosts() {
        let cases = [
            ("snapchat.com/add/ghost", Platform::Snapchat),
            ("instagram.com/p/abc123", Platform::Instagram),
            ("tiktok.com/@user/video/1", Platform::TikTok),
            ("vm.tiktok.com/ZMabcdef", Platform::TikTok),
            ("twitter.com/user/status/1", Platform::Twitter),
            ("x.com/user/status/1", Platform::Twitter),
            ("facebook.com/watch?v=1", Platform::Facebook),
            ("fb.watch/abcdef", Platform::Facebook),
        ];

        for (host_and_path, expected) in cases {
            for scheme in ["http", "https"] {
                for www in ["", "www."] {
                    let url = format!("{}://{}{}", scheme, www, host_and_path);
                    assert_eq!(identify(&url), Ok(expected), "url: {}", url);
                }
            }
        }
    }

    #[test]
    fn test_identify_unknown_host() {
        assert_eq!(identify("https://example.com/video"), Ok(Platform::Unknown));
        assert_eq!(identify("https://youtube.com/watch"), Ok(Platform::Unknown));
    }

    #[test]
    fn test_identify_invalid_url() {
        assert!(matches!(
            identify("not a url"),
            Err(PlatformError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_identify_missing_host() {
        // file: URLs parse but carry no host
        assert!(matches!(
            identify("file:///tmp/video.mp4"),
            Err(PlatformError::MissingHost(_))
        ));
    }

    #[test]
    fn test_identify_host_case_insensitive() {
        assert_eq!(
            identify("https://WWW.Instagram.COM/p/abc"),
            Ok(Platform::Instagram)
        );
    }

    #[test]
    fn test_snapchat_username_patterns() {
        let cases = [
            "https://www.snapchat.com/add/ghostface",
            "https://www.snapchat.com/add/ghostface/",
            "https://www.snapchat.com/add/ghostface/l",
            "https://snapchat.com/stories/ghostface",
            "https://snapchat.com/spotlight/ghostface",
        ];
        for url in cases {
            assert_eq!(snapchat_username(url).as_deref(), Some("ghostface"));
        }
    }

    #[test]
    fn test_snapchat_username_unrecognized_path() {
        assert_eq!(snapchat_username("https://snapchat.com/discover/x"), None);
        assert_eq!(snapchat_username("https://snapchat.com/add"), None);
        assert_eq!(snapchat_username("not a url"), None);
    }
}
