// YouTube catalog client
// Lists playlist items (paginated) and searches videos through the YouTube Data API,
// normalizing both into plain Tracks

use reqwest::Url;
use serde::Deserialize;
use std::future::Future;

use crate::error::CatalogError;
use crate::player::playlist::Track;

pub const PLAYLIST_PAGE_SIZE: u32 = 50;
pub const SEARCH_RESULT_CAP: u32 = 20;

// ==========================================
// WIRE TYPES
// ==========================================
// Everything is optional: items missing an id or a title are dropped, not fatal.

#[derive(Debug, Default, Deserialize)]
pub struct PlaylistItemsPage {
    #[serde(default)]
    items: Option<Vec<PlaylistItem>>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(default, rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default, rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<SearchItemId>,
    #[serde(default)]
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(default, rename = "videoId")]
    video_id: Option<String>,
}

fn track_from_parts(id: Option<String>, title: Option<String>) -> Option<Track> {
    match (id, title) {
        (Some(id), Some(title)) if !id.is_empty() && !title.is_empty() => {
            Some(Track::new(id, title))
        }
        _ => None,
    }
}

impl PlaylistItem {
    fn into_track(self) -> Option<Track> {
        track_from_parts(
            self.content_details.and_then(|d| d.video_id),
            self.snippet.and_then(|s| s.title),
        )
    }
}

impl SearchItem {
    fn into_track(self) -> Option<Track> {
        track_from_parts(
            self.id.and_then(|i| i.video_id),
            self.snippet.and_then(|s| s.title),
        )
    }
}

// ==========================================
// INPUT NORMALIZATION
// ==========================================

// Accepts either a bare playlist id or a YouTube URL carrying `list=`.
// Anything that does not parse falls back to the trimmed input.
pub fn resolve_playlist_id(raw: &str) -> String {
    let value = raw.trim();
    if !(value.contains("youtube.com") || value.contains("youtu.be")) {
        return value.to_string();
    }

    // "youtube.com/playlist?list=.." without a scheme is common when pasting
    let parsed = Url::parse(value).or_else(|_| Url::parse(&format!("https://{}", value)));
    match parsed {
        Ok(url) => url
            .query_pairs()
            .find(|(key, v)| key == "list" && !v.is_empty())
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| value.to_string()),
        Err(_) => value.to_string(),
    }
}

// ==========================================
// PAGINATION
// ==========================================

// Drives the page loop. `fetch_page` gets the token of the page to request
// (None for the first one). The loop ends when a page has no next token, or
// when a page carries no `items` array at all (API error bodies look like that).
pub async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Track>, CatalogError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PlaylistItemsPage, CatalogError>>,
{
    let mut collected = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = fetch_page(page_token.take()).await?;
        let Some(items) = page.items else {
            tracing::debug!("playlist page without items, stopping");
            break;
        };
        collected.extend(items.into_iter().filter_map(PlaylistItem::into_track));

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(collected)
}

fn tracks_from_search(response: SearchResponse) -> Result<Vec<Track>, CatalogError> {
    let items = response.items.unwrap_or_default();
    if items.is_empty() {
        return Err(CatalogError::NoResults);
    }

    let tracks: Vec<Track> = items.into_iter().filter_map(SearchItem::into_track).collect();
    if tracks.is_empty() {
        return Err(CatalogError::NoPlayableResults);
    }
    Ok(tracks)
}

// ==========================================
// CLIENT
// ==========================================

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    api_base: String,
}

impl CatalogClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        CatalogClient {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    // Fetches every page of a playlist. Callers only invoke this with a
    // non-empty id and credential.
    pub async fn fetch_playlist(
        &self,
        raw_id_or_url: &str,
        credential: &str,
    ) -> Result<Vec<Track>, CatalogError> {
        let playlist_id = resolve_playlist_id(raw_id_or_url);
        tracing::info!(playlist_id = %playlist_id, "fetching playlist");

        let tracks = collect_pages(|page_token| {
            let playlist_id = playlist_id.clone();
            async move { self.fetch_playlist_page(&playlist_id, credential, page_token).await }
        })
        .await?;

        tracing::info!(count = tracks.len(), "playlist fetched");
        Ok(tracks)
    }

    async fn fetch_playlist_page(
        &self,
        playlist_id: &str,
        credential: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemsPage, CatalogError> {
        let page_size = PLAYLIST_PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet,contentDetails"),
            ("maxResults", page_size.as_str()),
            ("playlistId", playlist_id),
            ("key", credential),
        ];
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let body = self
            .http
            .get(format!("{}/playlistItems", self.api_base))
            .query(&params)
            .send()
            .await?
            .text()
            .await?;

        Ok(serde_json::from_str(&body)?)
    }

    // Single request, capped at SEARCH_RESULT_CAP results
    pub async fn search(&self, query: &str, credential: &str) -> Result<Vec<Track>, CatalogError> {
        tracing::info!(query = %query, "searching videos");
        let cap = SEARCH_RESULT_CAP.to_string();

        let body = self
            .http
            .get(format!("{}/search", self.api_base))
            .query(&[
                ("part", "snippet"),
                ("maxResults", cap.as_str()),
                ("q", query),
                ("type", "video"),
                ("key", credential),
            ])
            .send()
            .await?
            .text()
            .await?;

        let response: SearchResponse = serde_json::from_str(&body)?;
        tracks_from_search(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    fn playlist_item(id: Option<&str>, title: Option<&str>) -> Value {
        json!({
            "snippet": { "title": title },
            "contentDetails": { "videoId": id },
        })
    }

    fn page(items: Vec<Value>, next: Option<&str>) -> PlaylistItemsPage {
        let mut body = json!({ "items": items });
        if let Some(token) = next {
            body["nextPageToken"] = json!(token);
        }
        serde_json::from_value(body).unwrap()
    }

    // Serves canned pages in order and records the tokens it was asked for
    async fn run_pages(pages: Vec<PlaylistItemsPage>) -> (Vec<Track>, Vec<Option<String>>) {
        let mut pages: VecDeque<_> = pages.into();
        let mut tokens = Vec::new();
        let tracks = collect_pages(|token| {
            tokens.push(token);
            let next = pages.pop_front().unwrap_or_default();
            async move { Ok(next) }
        })
        .await
        .unwrap();
        (tracks, tokens)
    }

    #[test]
    fn resolves_list_parameter_from_url() {
        assert_eq!(
            resolve_playlist_id("https://www.youtube.com/playlist?list=PL123abc"),
            "PL123abc"
        );
        assert_eq!(
            resolve_playlist_id("  https://www.youtube.com/watch?v=xyz&list=PLmix&index=3 "),
            "PLmix"
        );
        assert_eq!(resolve_playlist_id("youtube.com/playlist?list=PLbare"), "PLbare");
    }

    #[test]
    fn bare_identifier_is_trimmed_verbatim() {
        assert_eq!(resolve_playlist_id("  PL987  "), "PL987");
    }

    #[test]
    fn url_without_list_falls_back_to_input() {
        assert_eq!(
            resolve_playlist_id("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[tokio::test]
    async fn two_page_playlist_keeps_order_and_drops_incomplete_items() {
        let mut first: Vec<Value> = (0..50)
            .map(|i| playlist_item(Some(&format!("a{}", i)), Some(&format!("A {}", i))))
            .collect();
        first[7] = playlist_item(Some("a7"), None);
        let second: Vec<Value> = (0..10)
            .map(|i| playlist_item(Some(&format!("b{}", i)), Some(&format!("B {}", i))))
            .collect();

        let (tracks, tokens) =
            run_pages(vec![page(first, Some("PAGE2")), page(second, None)]).await;

        assert_eq!(tracks.len(), 59);
        assert_eq!(tokens, vec![None, Some("PAGE2".to_string())]);
        assert_eq!(tracks[0].id, "a0");
        assert_eq!(tracks[7].id, "a8");
        assert_eq!(tracks[48].id, "a49");
        assert_eq!(tracks[49].id, "b0");
        assert_eq!(tracks[58].id, "b9");
    }

    #[tokio::test]
    async fn items_missing_id_are_skipped_and_duplicates_kept() {
        let items = vec![
            playlist_item(None, Some("no id")),
            playlist_item(Some("x"), Some("X")),
            playlist_item(Some(""), Some("empty id")),
            playlist_item(Some("x"), Some("X again")),
        ];
        let (tracks, _) = run_pages(vec![page(items, None)]).await;
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "x"]);
    }

    #[tokio::test]
    async fn page_without_items_ends_the_loop() {
        let error_body: PlaylistItemsPage =
            serde_json::from_value(json!({ "error": { "code": 400 } })).unwrap();
        let (tracks, tokens) = run_pages(vec![
            page(vec![playlist_item(Some("a"), Some("A"))], Some("NEXT")),
            error_body,
        ])
        .await;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn page_failure_aborts_the_fetch() {
        let result = collect_pages(|token| async move {
            match token {
                None => Ok(page(vec![playlist_item(Some("a"), Some("A"))], Some("NEXT"))),
                Some(_) => Err(CatalogError::Parse(
                    serde_json::from_str::<Value>("not json").unwrap_err(),
                )),
            }
        })
        .await;
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    fn search_response(body: Value) -> SearchResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn search_without_items_is_no_results() {
        let empty = tracks_from_search(search_response(json!({ "items": [] })));
        assert!(matches!(empty, Err(CatalogError::NoResults)));

        let missing = tracks_from_search(search_response(json!({})));
        assert!(matches!(missing, Err(CatalogError::NoResults)));
    }

    #[test]
    fn search_with_only_unusable_items_is_no_playable_results() {
        let response = search_response(json!({
            "items": [
                { "id": { "kind": "youtube#channel" }, "snippet": { "title": "A channel" } },
                { "id": { "videoId": "v1" }, "snippet": {} },
            ]
        }));
        assert!(matches!(
            tracks_from_search(response),
            Err(CatalogError::NoPlayableResults)
        ));
    }

    #[test]
    fn search_keeps_valid_items_in_order() {
        let response = search_response(json!({
            "items": [
                { "id": { "videoId": "v1" }, "snippet": { "title": "One" } },
                { "id": {}, "snippet": { "title": "skipped" } },
                { "id": { "videoId": "v2" }, "snippet": { "title": "Two" } },
            ]
        }));
        let tracks = tracks_from_search(response).unwrap();
        assert_eq!(tracks, vec![Track::new("v1", "One"), Track::new("v2", "Two")]);
    }
}
