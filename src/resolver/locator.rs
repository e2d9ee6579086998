// AssetLocator - maps a descriptor + quality + optional token to a playable URL
//
// Handles:
// - Streaming manifest selection (first playlist, player does ABR)
// - Progressive file selection by exact quality, else best under the ceiling
// - Token query parameters for private paths only
//
// No I/O: identical inputs always produce identical output.

use super::models::{
    AccessToken, MediaDescriptor, ProgressiveVariant, QualitySelector, ResolvedTarget,
    VariantKind, DEFAULT_QUALITY_CEILING,
};
use super::utils::{append_query_param, is_private_path, REINJECT_PARAM, TOKEN_PARAM};

/// URL chosen before any token is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub kind: VariantKind,
    pub url: &'a str,
}

/// Pure variant selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLocator {
    ceiling: u32,
}

impl Default for AssetLocator {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY_CEILING)
    }
}

impl AssetLocator {
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Resolve the playable target, or `None` while nothing is resolvable
    pub fn locate(
        &self,
        descriptor: &MediaDescriptor,
        quality: QualitySelector,
        token: Option<&AccessToken>,
    ) -> Option<ResolvedTarget> {
        let selection = self.select(descriptor, quality)?;
        let needs_token = is_private_path(selection.url);

        let applied_token = token
            .filter(|_| needs_token)
            .map(|t| t.value.clone())
            .filter(|t| !t.is_empty());

        let url = match applied_token.as_deref() {
            Some(value) => Self::with_token(selection, value),
            None => selection.url.to_string(),
        };

        Some(ResolvedTarget {
            url,
            needs_token,
            applied_token,
        })
    }

    /// Pick the variant URL without touching tokens
    pub fn select<'a>(
        &self,
        descriptor: &'a MediaDescriptor,
        quality: QualitySelector,
    ) -> Option<Selection<'a>> {
        // Single-rendition assumption: the first manifest covers all renditions
        if let Some(stream) = descriptor
            .streaming
            .iter()
            .find(|s| !s.playlist_url.is_empty())
        {
            return Some(Selection {
                kind: VariantKind::Streaming,
                url: &stream.playlist_url,
            });
        }

        let files: Vec<&ProgressiveVariant> = descriptor
            .progressive
            .iter()
            .filter(|f| !f.file_url.is_empty())
            .collect();

        self.select_progressive(&files, quality)
            .map(|file| Selection {
                kind: VariantKind::Progressive,
                url: &file.file_url,
            })
    }

    /// Selectable resolutions, highest first; empty for streaming descriptors
    pub fn available_qualities(descriptor: &MediaDescriptor) -> Vec<u32> {
        if descriptor.kind() != Some(VariantKind::Progressive) {
            return Vec::new();
        }

        let mut heights: Vec<u32> = descriptor
            .progressive
            .iter()
            .filter(|f| !f.file_url.is_empty())
            .map(|f| f.resolution)
            .collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();
        heights
    }

    fn select_progressive<'a>(
        &self,
        files: &[&'a ProgressiveVariant],
        quality: QualitySelector,
    ) -> Option<&'a ProgressiveVariant> {
        if let QualitySelector::Explicit(height) = quality {
            if let Some(exact) = files.iter().find(|f| f.resolution == height) {
                return Some(*exact);
            }
        }

        // Best default under the ceiling; first listed wins on ties
        let mut best: Option<&'a ProgressiveVariant> = None;
        for file in files.iter().filter(|f| f.resolution <= self.ceiling) {
            if best.map_or(true, |b| file.resolution > b.resolution) {
                best = Some(*file);
            }
        }

        if best.is_some() {
            return best;
        }

        // Everything is above the ceiling: cheapest available
        let mut lowest: Option<&'a ProgressiveVariant> = None;
        for file in files {
            if lowest.map_or(true, |l| file.resolution < l.resolution) {
                lowest = Some(*file);
            }
        }
        lowest
    }

    fn with_token(selection: Selection<'_>, token: &str) -> String {
        let url = append_query_param(selection.url, TOKEN_PARAM, token);
        match selection.kind {
            // Sub-manifests and segments need the token too
            VariantKind::Streaming => append_query_param(&url, REINJECT_PARAM, "true"),
            VariantKind::Progressive => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HOST: &str = "https://tube.example";

    fn progressive(heights: &[u32]) -> MediaDescriptor {
        heights.iter().fold(MediaDescriptor::new(), |d, h| {
            d.with_progressive(format!("{}/static/web-videos/abc-{}.mp4", HOST, h), *h)
        })
    }

    fn token(value: &str) -> AccessToken {
        AccessToken::new(value, "/static/web-videos/private/abc.mp4")
    }

    #[test]
    fn test_auto_picks_1080_over_2160() {
        let descriptor = progressive(&[480, 720, 1080, 2160]);
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, None)
            .unwrap();

        assert_eq!(target.url, format!("{}/static/web-videos/abc-1080.mp4", HOST));
        assert!(!target.needs_token);
        assert_eq!(target.applied_token, None);
    }

    #[rstest]
    #[case(&[2160, 1440, 720], 720)]
    #[case(&[360, 1080, 2160, 480], 1080)]
    #[case(&[4320, 2160], 2160)]
    #[case(&[240], 240)]
    fn test_auto_respects_ceiling(#[case] heights: &[u32], #[case] expected: u32) {
        let descriptor = progressive(heights);
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, None)
            .unwrap();

        assert!(target.url.ends_with(&format!("abc-{}.mp4", expected)));
    }

    #[test]
    fn test_explicit_quality_match_wins() {
        let descriptor = progressive(&[480, 720, 1080, 2160]);
        let locator = AssetLocator::default();

        let hd = locator
            .locate(&descriptor, QualitySelector::Explicit(2160), None)
            .unwrap();
        assert!(hd.url.ends_with("abc-2160.mp4"));

        // Unknown quality behaves like auto
        let missing = locator
            .locate(&descriptor, QualitySelector::Explicit(144), None)
            .unwrap();
        assert!(missing.url.ends_with("abc-1080.mp4"));
    }

    #[test]
    fn test_private_hls_gets_reinject_param() {
        let descriptor = MediaDescriptor::new().with_streaming(format!(
            "{}/static/streaming-playlists/hls/private/abc/master.m3u8",
            HOST
        ));
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, Some(&token("abc123")))
            .unwrap();

        assert!(target
            .url
            .ends_with("?videoFileToken=abc123&reinjectVideoFileToken=true"));
        assert!(target.needs_token);
        assert_eq!(target.applied_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_params_stay_out_of_fragment() {
        let descriptor = MediaDescriptor::new().with_streaming(format!(
            "{}/static/streaming-playlists/hls/private/abc/master.m3u8#live",
            HOST
        ));
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, Some(&token("abc123")))
            .unwrap();

        assert!(target
            .url
            .ends_with("master.m3u8?videoFileToken=abc123&reinjectVideoFileToken=true#live"));
    }

    #[test]
    fn test_private_file_with_existing_query() {
        let descriptor = MediaDescriptor::new().with_progressive(
            format!("{}/static/web-videos/private/abc-720.mp4?start=10", HOST),
            720,
        );
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, Some(&token("t0k")))
            .unwrap();

        assert!(target.url.ends_with("abc-720.mp4?start=10&videoFileToken=t0k"));
        assert!(!target.url.contains(REINJECT_PARAM));
    }

    #[test]
    fn test_public_path_never_gets_token() {
        let locator = AssetLocator::default();
        let descriptors = [
            progressive(&[720]),
            MediaDescriptor::new().with_streaming(format!("{}/static/hls/abc/master.m3u8", HOST)),
        ];

        for descriptor in &descriptors {
            for value in ["abc123", "", "x?y=z"] {
                let target = locator
                    .locate(descriptor, QualitySelector::Auto, Some(&token(value)))
                    .unwrap();
                assert!(!target.url.contains(TOKEN_PARAM));
                assert_eq!(target.applied_token, None);
            }
        }
    }

    #[test]
    fn test_private_path_without_token_stays_unauthenticated() {
        let descriptor = MediaDescriptor::new()
            .with_progressive(format!("{}/static/web-videos/private/abc-720.mp4", HOST), 720);
        let target = AssetLocator::default()
            .locate(&descriptor, QualitySelector::Auto, None)
            .unwrap();

        assert!(target.needs_token);
        assert!(!target.url.contains(TOKEN_PARAM));
    }

    #[test]
    fn test_no_variants_is_unresolvable() {
        let locator = AssetLocator::default();
        assert!(locator
            .locate(&MediaDescriptor::new(), QualitySelector::Auto, None)
            .is_none());
        assert!(locator
            .locate(&progressive(&[]).with_progressive("", 720), QualitySelector::Auto, None)
            .is_none());
    }

    #[test]
    fn test_locate_is_idempotent() {
        let descriptor = MediaDescriptor::new().with_streaming(format!(
            "{}/static/streaming-playlists/hls/private/abc/master.m3u8",
            HOST
        ));
        let locator = AssetLocator::default();
        let t = token("abc123");

        let first = locator.locate(&descriptor, QualitySelector::Auto, Some(&t));
        let second = locator.locate(&descriptor, QualitySelector::Auto, Some(&t));
        assert_eq!(first, second);
    }

    #[test]
    fn test_available_qualities() {
        let descriptor = progressive(&[480, 1080, 720, 1080]);
        assert_eq!(AssetLocator::available_qualities(&descriptor), vec![1080, 720, 480]);

        let streaming = descriptor.with_streaming(format!("{}/hls/master.m3u8", HOST));
        assert!(AssetLocator::available_qualities(&streaming).is_empty());
    }
}
