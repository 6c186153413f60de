use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{ExtractionStrategy, StreamDescriptor};

static FLV_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(https?://[^"]+\.flv[^"]*)""#).unwrap());
static HLS_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(https?://[^"]+\.m3u8[^"]*)""#).unwrap());
static QUALITY_INFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(sd|hd|uhd|origin|ld)\.").unwrap());
static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""title":"([^"]+)""#).unwrap());
static NICKNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""nickname":"([^"]+)""#).unwrap());
static PACE_PUSH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"self\.__pace_f\.push\(\[\d+,"(\w+:.+?)"\]\)</script>"#).unwrap()
});

const ROOM_STATUS_LIVE: i64 = 2;
const FALLBACK_TITLE: &str = "Douyin Live";
const FALLBACK_AUTHOR: &str = "Unknown";

fn capture_group_1_owned(re: &Regex, input: &str) -> Option<String> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Quoted stream URLs lifted straight out of the markup. Most robust:
/// survives layout rewrites that break the JSON state shape.
pub struct DirectUrlStrategy;

impl ExtractionStrategy for DirectUrlStrategy {
    fn name(&self) -> &'static str {
        "direct-url"
    }

    fn applies(&self, body: &str) -> bool {
        FLV_URL_REGEX.is_match(body) || HLS_URL_REGEX.is_match(body)
    }

    fn extract(&self, body: &str) -> Option<StreamDescriptor> {
        let flv_urls: Vec<String> = FLV_URL_REGEX
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('\\').to_owned())
            .collect();
        let hls_urls: Vec<String> = HLS_URL_REGEX
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('\\').to_owned())
            .collect();

        // FLV preferred over HLS.
        let best = flv_urls.first().or_else(|| hls_urls.first())?.clone();

        let mut qualities = FxHashMap::default();
        for url in flv_urls.iter().chain(hls_urls.iter()).take(10) {
            if let Some(caps) = QUALITY_INFIX_REGEX.captures(url)
                && let Some(quality) = caps.get(1)
            {
                qualities
                    .entry(quality.as_str().to_owned())
                    .or_insert_with(|| url.clone());
            }
        }
        if qualities.is_empty() {
            qualities.insert("best".to_string(), best.clone());
        }

        let title =
            capture_group_1_owned(&TITLE_REGEX, body).unwrap_or_else(|| FALLBACK_TITLE.to_owned());
        let author = capture_group_1_owned(&NICKNAME_REGEX, body)
            .unwrap_or_else(|| FALLBACK_AUTHOR.to_owned());

        Some(StreamDescriptor {
            stream_url: best,
            title,
            author,
            is_live: true,
            qualities,
        })
    }
}

/// Payloads arrive as `d:<json>` with quotes escaped for the embedding
/// script tag.
fn unescape_payload(payload: &str) -> String {
    let stripped = payload
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    stripped.replace("\\\"", "\"")
}

fn pace_payloads(body: &str) -> Vec<String> {
    PACE_PUSH_REGEX
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|payload| payload.contains("streamStore"))
        .map(unescape_payload)
        .collect()
}

/// Reads the room/stream stores out of one hydration-state object.
fn descriptor_from_state(state: &Value) -> Option<StreamDescriptor> {
    let room_info = state.get("roomStore").and_then(|s| s.get("roomInfo"));
    let room = room_info.and_then(|info| info.get("room"));
    let title = room
        .and_then(|r| r.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_TITLE);
    let author = room_info
        .and_then(|info| info.get("anchor"))
        .and_then(|a| a.get("nickname"))
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_AUTHOR);
    let status = room
        .and_then(|r| r.get("status"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let stream = state
        .get("streamStore")
        .and_then(|s| s.get("streamData"))
        .and_then(|s| s.get("H264_streamData"))
        .and_then(|s| s.get("stream"))
        .and_then(Value::as_object)?;

    let mut qualities = FxHashMap::default();
    let mut first = None;
    for (quality_name, quality_data) in stream {
        let Some(flv) = quality_data
            .get("main")
            .and_then(|m| m.get("flv"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        if flv.is_empty() {
            continue;
        }
        qualities.insert(quality_name.clone(), flv.to_owned());
        if first.is_none() {
            first = Some(flv.to_owned());
        }
    }

    // Origin quality when the page exposes it, otherwise whatever came first.
    let stream_url = qualities.get("origin").cloned().or(first)?;

    Some(StreamDescriptor {
        stream_url,
        title: title.to_owned(),
        author: author.to_owned(),
        is_live: status == ROOM_STATUS_LIVE,
        qualities,
    })
}

/// The current markup pushes `["$","$L12",null,{...,"state":{...}}]`
/// wrappers through `__pace_f`; the state object rides in the trailing
/// element.
pub struct StateWrapperStrategy;

impl ExtractionStrategy for StateWrapperStrategy {
    fn name(&self) -> &'static str {
        "state-wrapper"
    }

    fn applies(&self, body: &str) -> bool {
        body.contains("__pace_f") && body.contains("streamStore")
    }

    fn extract(&self, body: &str) -> Option<StreamDescriptor> {
        for payload in pace_payloads(body) {
            let Ok(data) = serde_json::from_str::<Value>(&payload) else {
                continue;
            };
            let Some(items) = data.as_array() else {
                continue;
            };
            for item in items.iter().rev() {
                if let Some(state) = item.get("state")
                    && let Some(descriptor) = descriptor_from_state(state)
                {
                    return Some(descriptor);
                }
            }
        }
        None
    }
}

/// The pre-wrapper layout where the pushed array holds the state-bearing
/// objects directly. Kept for markup rollbacks.
pub struct LegacyStateStrategy;

impl ExtractionStrategy for LegacyStateStrategy {
    fn name(&self) -> &'static str {
        "legacy-state"
    }

    fn applies(&self, body: &str) -> bool {
        body.contains("__pace_f")
    }

    fn extract(&self, body: &str) -> Option<StreamDescriptor> {
        for payload in pace_payloads(body) {
            let Ok(data) = serde_json::from_str::<Value>(&payload) else {
                continue;
            };
            let Some(items) = data.as_array() else {
                continue;
            };
            for item in items {
                if let Some(state) = item.get("state")
                    && let Some(descriptor) = descriptor_from_state(state)
                {
                    return Some(descriptor);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compact because real hydration payloads are single-line script text.
    fn state_json(status: i64) -> serde_json::Value {
        serde_json::json!({
            "roomStore": {
                "roomInfo": {
                    "room": {"title": "Midnight Room", "status": status},
                    "anchor": {"nickname": "Shenxin"}
                }
            },
            "streamStore": {
                "streamData": {
                    "H264_streamData": {
                        "stream": {
                            "origin": {"main": {"flv": "https://pull.example.com/live/room_origin.flv"}},
                            "hd": {"main": {"flv": "https://pull.example.com/live/room_hd.flv"}},
                            "empty": {"main": {"flv": ""}}
                        }
                    }
                }
            }
        })
    }

    fn pace_body(payload_json: &str) -> String {
        let escaped = payload_json.replace('"', "\\\"");
        format!(r#"<html><script>self.__pace_f.push([1,"d:{escaped}"])</script></html>"#)
    }

    #[test]
    fn direct_url_prefers_flv_and_maps_qualities() {
        let body = concat!(
            r#"<html>"title":"Room A" "nickname":"Anchor A" "#,
            r#""https://pull.example.com/live/a_hd.flv" "#,
            r#""https://pull.example.com/live/a_sd.flv" "#,
            r#""https://pull.example.com/live/a_hd.m3u8"</html>"#,
        );
        let descriptor = DirectUrlStrategy.extract(body).unwrap();
        assert_eq!(descriptor.stream_url, "https://pull.example.com/live/a_hd.flv");
        assert_eq!(descriptor.title, "Room A");
        assert_eq!(descriptor.author, "Anchor A");
        assert!(descriptor.is_live);
        assert_eq!(
            descriptor.qualities.get("hd"),
            Some(&"https://pull.example.com/live/a_hd.flv".to_string())
        );
        assert_eq!(
            descriptor.qualities.get("sd"),
            Some(&"https://pull.example.com/live/a_sd.flv".to_string())
        );
    }

    #[test]
    fn direct_url_falls_back_to_hls_and_best_quality() {
        let body = r#"<html>"https://pull.example.com/live/plain.m3u8"</html>"#;
        let descriptor = DirectUrlStrategy.extract(body).unwrap();
        assert_eq!(descriptor.stream_url, "https://pull.example.com/live/plain.m3u8");
        assert_eq!(descriptor.title, FALLBACK_TITLE);
        assert_eq!(descriptor.author, FALLBACK_AUTHOR);
        assert_eq!(
            descriptor.qualities.get("best"),
            Some(&"https://pull.example.com/live/plain.m3u8".to_string())
        );
    }

    #[test]
    fn direct_url_ignores_streamless_pages() {
        assert!(DirectUrlStrategy.extract("<html>no media here</html>").is_none());
        assert!(!DirectUrlStrategy.applies("<html>no media here</html>"));
    }

    #[test]
    fn wrapper_strategy_reads_hydration_state() {
        let payload = serde_json::json!(["$", "$L12", null, {"state": state_json(2)}]).to_string();
        let body = pace_body(&payload);
        assert!(StateWrapperStrategy.applies(&body));

        let descriptor = StateWrapperStrategy.extract(&body).unwrap();
        assert_eq!(
            descriptor.stream_url,
            "https://pull.example.com/live/room_origin.flv"
        );
        assert_eq!(descriptor.title, "Midnight Room");
        assert_eq!(descriptor.author, "Shenxin");
        assert!(descriptor.is_live);
        assert_eq!(descriptor.qualities.len(), 2);
        assert!(!descriptor.qualities.contains_key("empty"));
    }

    #[test]
    fn legacy_strategy_reads_unwrapped_state() {
        let payload = serde_json::json!([{"state": state_json(2)}]).to_string();
        let body = pace_body(&payload);
        let descriptor = LegacyStateStrategy.extract(&body).unwrap();
        assert_eq!(
            descriptor.stream_url,
            "https://pull.example.com/live/room_origin.flv"
        );
    }

    #[test]
    fn offline_room_is_reported_not_live() {
        let payload = serde_json::json!([{"state": state_json(4)}]).to_string();
        let body = pace_body(&payload);
        let descriptor = LegacyStateStrategy.extract(&body).unwrap();
        assert!(!descriptor.is_live);
    }

    #[test]
    fn state_without_stream_data_is_skipped() {
        let payload = r#"[{"state":{"roomStore":{},"streamStore":{}}}]"#;
        let body = pace_body(payload);
        assert!(LegacyStateStrategy.extract(&body).is_none());
    }

    #[test]
    fn payload_prefix_and_escapes_are_stripped() {
        let unescaped = unescape_payload(r#"d:[\"$\",\"x\"]"#);
        assert_eq!(unescaped, r#"["$","x"]"#);
    }
}
