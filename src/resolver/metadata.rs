// PeerTube video and caption payloads
//
// Only the fields resolution depends on are decoded; everything else in the
// API response is ignored.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::errors::ResolveError;
use super::models::{AssetKey, CaptionTrack, MediaDescriptor};
use super::thumbnail::ThumbnailRequest;
use super::utils::absolute_url;

/// Plugin data key flagging premium content
const PREMIUM_PLUGIN_KEY: &str = "is-premium-content";

/// `state.id` values meaning "live stream not started yet / ended"
const WAITING_FOR_LIVE_STATES: [u32; 2] = [4, 5];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingPlaylistPayload {
    #[serde(default)]
    playlist_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ResolutionPayload {
    id: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePayload {
    #[serde(default)]
    file_url: String,
    resolution: ResolutionPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct StatePayload {
    id: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
}

/// Subset of `GET /api/v1/videos/{id}` used for resolution
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub preview_path: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub channel: ChannelRef,
    #[serde(default)]
    streaming_playlists: Option<Vec<StreamingPlaylistPayload>>,
    #[serde(default)]
    files: Option<Vec<FilePayload>>,
    #[serde(default)]
    state: Option<StatePayload>,
    #[serde(default)]
    plugin_data: Option<HashMap<String, Value>>,
}

impl VideoMetadata {
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Premium flag set by the instance plugin (`true` or `"true"`)
    pub fn is_premium(&self) -> bool {
        let flag = self
            .plugin_data
            .as_ref()
            .and_then(|data| data.get(PREMIUM_PLUGIN_KEY));

        match flag {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag == "true",
            _ => false,
        }
    }

    pub fn is_waiting_for_live(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |s| WAITING_FOR_LIVE_STATES.contains(&s.id))
    }

    /// `name@host`, the key the subscription lookup is made with
    pub fn qualified_channel_name(&self) -> String {
        format!("{}@{}", self.channel.name, self.channel.host)
    }

    pub fn asset_key(&self, host: &str) -> AssetKey {
        AssetKey::new(host, self.uuid.clone())
    }

    /// Preview image request, falling back to the small thumbnail
    pub fn thumbnail_request(&self, host: &str) -> ThumbnailRequest {
        ThumbnailRequest {
            asset: self.asset_key(host),
            preview_path: self.preview_path.clone().or_else(|| self.thumbnail_path.clone()),
        }
    }

    /// Descriptor with the given caption tracks attached
    pub fn descriptor(&self, captions: Vec<CaptionTrack>) -> MediaDescriptor {
        let descriptor = self
            .streaming_playlists
            .iter()
            .flatten()
            .fold(MediaDescriptor::new(), |d, p| d.with_streaming(p.playlist_url.clone()));

        self.files
            .iter()
            .flatten()
            .fold(descriptor, |d, f| d.with_progressive(f.file_url.clone(), f.resolution.id))
            .with_premium(self.is_premium())
            .with_waiting_for_live(self.is_waiting_for_live())
            .with_captions(captions)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LanguagePayload {
    id: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionPayload {
    language: LanguagePayload,
    #[serde(default)]
    file_url: Option<String>,
    #[serde(default)]
    caption_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionListPayload {
    #[serde(default)]
    data: Vec<CaptionPayload>,
}

/// Decode `GET /api/v1/videos/{id}/captions`. Relative caption paths are made absolute.
pub fn parse_captions(json: &str, scheme: &str, host: &str) -> Result<Vec<CaptionTrack>, ResolveError> {
    let list: CaptionListPayload = serde_json::from_str(json)?;

    Ok(list
        .data
        .into_iter()
        .filter_map(|c| {
            let path = c.file_url.or(c.caption_path)?;
            Some(CaptionTrack {
                url: absolute_url(scheme, host, &path),
                language_id: c.language.id,
                label: c.language.label,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::models::VariantKind;

    const VIDEO: &str = r#"{
        "uuid": "9c9de5e8-0a1e-484a-b099-e80766180a6d",
        "name": "Launch day",
        "previewPath": "/lazy-static/previews/9c9de5e8.jpg",
        "isLive": false,
        "state": {"id": 1, "label": "Published"},
        "channel": {"name": "studio", "host": "tube.example"},
        "pluginData": {"is-premium-content": "true"},
        "streamingPlaylists": [
            {"id": 3, "type": 1, "playlistUrl": "https://tube.example/static/streaming-playlists/hls/private/9c9d/master.m3u8"}
        ],
        "files": [
            {"fileUrl": "https://tube.example/static/web-videos/private/9c9d-720.mp4", "resolution": {"id": 720, "label": "720p"}}
        ]
    }"#;

    #[test]
    fn test_video_payload_to_descriptor() {
        let video = VideoMetadata::from_json(VIDEO).unwrap();
        let descriptor = video.descriptor(Vec::new());

        assert!(video.is_premium());
        assert!(!video.is_waiting_for_live());
        assert_eq!(video.qualified_channel_name(), "studio@tube.example");
        assert_eq!(descriptor.kind(), Some(VariantKind::Streaming));
        assert_eq!(descriptor.progressive[0].resolution, 720);
        assert!(descriptor.is_premium);

        let thumbnail = video.thumbnail_request("tube.example");
        assert_eq!(thumbnail.asset.id, video.uuid);
        assert_eq!(
            thumbnail.preview_path.as_deref(),
            Some("/lazy-static/previews/9c9de5e8.jpg")
        );
    }

    #[test]
    fn test_premium_flag_variants() {
        let bool_flag =
            VideoMetadata::from_json(r#"{"uuid": "a", "pluginData": {"is-premium-content": true}}"#)
                .unwrap();
        let absent =
            VideoMetadata::from_json(r#"{"uuid": "a", "pluginData": null, "files": null}"#).unwrap();
        let other =
            VideoMetadata::from_json(r#"{"uuid": "a", "pluginData": {"is-premium-content": "no"}}"#)
                .unwrap();

        assert!(bool_flag.is_premium());
        assert!(!absent.is_premium());
        assert!(!other.is_premium());
        assert!(!absent.descriptor(Vec::new()).has_variants());
    }

    #[test]
    fn test_waiting_for_live_state() {
        let video = VideoMetadata::from_json(r#"{"uuid": "a", "isLive": true, "state": {"id": 4}}"#)
            .unwrap();
        assert!(video.is_waiting_for_live());
        assert!(video.descriptor(Vec::new()).waiting_for_live);
    }

    #[test]
    fn test_caption_parsing() {
        let json = r#"{"total": 2, "data": [
            {"language": {"id": "en", "label": "English"}, "captionPath": "/lazy-static/video-captions/a-en.vtt"},
            {"language": {"id": "fr", "label": "French"}, "fileUrl": "https://cdn.example/a-fr.vtt"},
            {"language": {"id": "de", "label": "German"}}
        ]}"#;

        let captions = parse_captions(json, "https", "tube.example").unwrap();
        assert_eq!(captions.len(), 2);
        assert_eq!(
            captions[0].url,
            "https://tube.example/lazy-static/video-captions/a-en.vtt"
        );
        assert_eq!(captions[1].url, "https://cdn.example/a-fr.vtt");
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            VideoMetadata::from_json(r#"{"name": "no uuid"}"#),
            Err(ResolveError::InvalidMetadata(_))
        ));
    }
}
