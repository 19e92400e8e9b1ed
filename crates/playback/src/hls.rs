//! Direct-file fallback for streaming manifests.
//!
//! Some browsers and networks fail to load HLS manifests. The hosts we serve from also
//! publish a progressive MP4 for each stream, so one retry against that file is allowed.

use url::Url;

const MUX_STREAM_HOST: &str = "stream.mux.com";

/// Whether `url` points at an HLS manifest.
pub fn is_hls_manifest(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.path().to_ascii_lowercase().ends_with(".m3u8"))
        .unwrap_or(false)
}

/// Rewrites a recognised manifest URL to its downloadable MP4. Returns `url` unchanged
/// when no pattern matches, which callers treat as "no fallback available". Query and
/// fragment are carried over.
///
/// Recognised shapes:
/// * `<scheme>://<host>/<video>/manifest/video.m3u8` -> `.../<video>/downloads/default.mp4`
/// * `<scheme>://stream.mux.com/<playback>.m3u8` -> `.../<playback>/high.mp4`
pub fn direct_download_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match download_path(&parsed) {
        Some(path) => {
            parsed.set_path(&path);
            parsed.to_string()
        }
        None => url.to_string(),
    }
}

fn download_path(url: &Url) -> Option<String> {
    let path = url.path();
    if let Some(base) = path.strip_suffix("/manifest/video.m3u8") {
        return Some(format!("{}/downloads/default.mp4", base));
    }

    if url.host_str() == Some(MUX_STREAM_HOST) {
        let playback_id = path.strip_prefix('/')?.strip_suffix(".m3u8")?;
        if !playback_id.is_empty() && !playback_id.contains('/') {
            return Some(format!("/{}/high.mp4", playback_id));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloudflare_manifest_maps_to_download() {
        let url = "https://customer-abc.cloudflarestream.com/9f8e7d/manifest/video.m3u8";
        assert_eq!(
            direct_download_url(url),
            "https://customer-abc.cloudflarestream.com/9f8e7d/downloads/default.mp4"
        );
    }

    #[test]
    fn query_string_is_kept() {
        let url = "https://videodelivery.net/abc/manifest/video.m3u8?clientBandwidthHint=5";
        assert_eq!(
            direct_download_url(url),
            "https://videodelivery.net/abc/downloads/default.mp4?clientBandwidthHint=5"
        );
        assert!(is_hls_manifest(url));
    }

    #[test]
    fn fragment_is_kept() {
        let url = "https://videodelivery.net/abc/manifest/video.m3u8#t=5";
        assert!(is_hls_manifest(url));
        assert_eq!(
            direct_download_url(url),
            "https://videodelivery.net/abc/downloads/default.mp4#t=5"
        );
    }

    #[test]
    fn mux_playback_id() {
        assert_eq!(
            direct_download_url("https://stream.mux.com/Xy12.m3u8"),
            "https://stream.mux.com/Xy12/high.mp4"
        );
        assert_eq!(
            direct_download_url("http://stream.mux.com/Xy12.m3u8?token=t"),
            "http://stream.mux.com/Xy12/high.mp4?token=t"
        );
    }

    #[test]
    fn unknown_urls_are_unchanged() {
        let url = "https://cdn.example.com/playlist.m3u8";
        assert_eq!(direct_download_url(url), url);
        assert_eq!(direct_download_url("not a url"), "not a url");
        assert!(!is_hls_manifest("https://cdn.example.com/clip.mp4"));
        assert!(!is_hls_manifest("clip.m3u8"));
    }
}
