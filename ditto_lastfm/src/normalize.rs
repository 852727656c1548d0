use chrono::{DateTime, Utc};
use ditto_core::{
    normalize::{non_empty, parse_unix, raw_json, typed},
    FetchError,
};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default, rename = "#text")]
    text: String,
    /// Present instead of `#text` in extended responses.
    #[serde(default)]
    name: String,
    #[serde(default)]
    mbid: String,
}

impl Named {
    fn name(&self) -> &str {
        if self.text.is_empty() {
            &self.name
        } else {
            &self.text
        }
    }
}

#[derive(Debug, Deserialize)]
struct Date {
    uts: String,
}

#[derive(Debug, Deserialize)]
struct NowPlaying {
    #[serde(default)]
    nowplaying: String,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    name: String,
    #[serde(default)]
    mbid: String,
    #[serde(default)]
    url: String,
    artist: Named,
    #[serde(default)]
    album: Named,
    date: Option<Date>,
    #[serde(rename = "@attr")]
    attr: Option<NowPlaying>,
}

/// An artist, album or track as stored alongside a scrobble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub mbid: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrobbleData {
    pub artist: Entity,
    pub album: Option<Entity>,
    pub track: Entity,
    pub raw: String,
    pub post_time: DateTime<Utc>,
}

/// Map one `track` entry. Returns `Ok(None)` for the track playing right now,
/// which has no scrobble time yet.
pub fn scrobble(value: &Value) -> Result<Option<ScrobbleData>, FetchError> {
    let t: RawTrack = typed(value)?;
    let now_playing = t.attr.as_ref().map_or(false, |a| a.nowplaying == "true");
    let date = match t.date {
        Some(date) if !now_playing => date,
        _ => return Ok(None),
    };
    if t.artist.name().is_empty() || t.name.is_empty() {
        return Err(FetchError::unknown_data(format!(
            "scrobble without artist or track name at {}",
            date.uts
        )));
    }

    let track_url = non_empty(&t.url);
    let artist_url = track_url.as_deref().and_then(artist_permalink);
    let album = non_empty(t.album.name()).map(|name| Entity {
        permalink: artist_url.as_deref().and_then(|a| album_permalink(a, &name)),
        mbid: non_empty(&t.album.mbid),
        name,
    });
    Ok(Some(ScrobbleData {
        artist: Entity {
            name: t.artist.name().to_string(),
            mbid: non_empty(&t.artist.mbid),
            permalink: artist_url,
        },
        album,
        track: Entity {
            name: t.name,
            mbid: non_empty(&t.mbid),
            permalink: track_url,
        },
        raw: raw_json(value),
        post_time: parse_unix(&date.uts)?,
    }))
}

/// `https://www.last.fm/music/Artist/_/Track` -> `https://www.last.fm/music/Artist`
fn artist_permalink(track_url: &str) -> Option<String> {
    track_url
        .split_once("/_/")
        .map(|(artist, _)| artist.to_string())
}

fn album_permalink(artist_url: &str, album: &str) -> Option<String> {
    let mut url = Url::parse(artist_url).ok()?;
    url.path_segments_mut().ok()?.push(album);
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_track_entry() {
        let value = json!({
            "artist": {"mbid": "a-mbid", "#text": "Sigur Rós"},
            "album": {"mbid": "", "#text": "Ágætis byrjun"},
            "name": "Svefn-g-englar",
            "mbid": "",
            "url": "https://www.last.fm/music/Sigur+R%C3%B3s/_/Svefn-g-englar",
            "date": {"uts": "1700000000", "#text": "14 Nov 2023, 22:13"}
        });
        let s = scrobble(&value).unwrap().unwrap();
        assert_eq!(s.artist.name, "Sigur Rós");
        assert_eq!(s.artist.mbid.as_deref(), Some("a-mbid"));
        assert_eq!(
            s.artist.permalink.as_deref(),
            Some("https://www.last.fm/music/Sigur+R%C3%B3s")
        );
        let album = s.album.unwrap();
        assert_eq!(album.mbid, None);
        assert_eq!(
            album.permalink.as_deref(),
            Some("https://www.last.fm/music/Sigur+R%C3%B3s/%C3%81g%C3%A6tis%20byrjun")
        );
        assert_eq!(s.track.mbid, None);
        assert_eq!(s.post_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn now_playing_is_dropped() {
        let playing = json!({
            "artist": {"#text": "A"},
            "name": "T",
            "url": "https://www.last.fm/music/A/_/T",
            "@attr": {"nowplaying": "true"}
        });
        assert_eq!(scrobble(&playing).unwrap(), None);
    }

    #[test]
    fn missing_album_and_extended_artist() {
        let value = json!({
            "artist": {"name": "A", "url": "https://www.last.fm/music/A"},
            "album": {"#text": ""},
            "name": "T",
            "date": {"uts": "1700000000"}
        });
        let s = scrobble(&value).unwrap().unwrap();
        assert_eq!(s.artist.name, "A");
        assert_eq!(s.album, None);
        assert_eq!(s.track.permalink, None);
    }
}
