use crate::catalog::embed_url;
use crate::error::{AppError, Result};
use crate::models::{ContentKind, ContentRef, Document, HistoryEntry};
use chrono::{DateTime, Utc};

/// Most recent entries kept per user.
pub const MAX_HISTORY_ITEMS: usize = 20;

/// Adds or removes `content_id` from the user's favorites; returns true when
/// it is now a favorite. Test accounts keep favorites like clients do.
pub fn toggle_favorite(doc: &mut Document, username: &str, content_id: &str) -> Result<bool> {
    let exists = doc.find_content(content_id).is_some();
    let account = doc
        .find_any_account_mut(username)
        .ok_or_else(|| AppError::NotFound(format!("account {}", username)))?;

    if let Some(pos) = account.favorites.iter().position(|f| f == content_id) {
        account.favorites.remove(pos);
        return Ok(false);
    }
    if !exists {
        return Err(AppError::NotFound(format!("content {}", content_id)));
    }
    account.favorites.push(content_id.to_string());
    Ok(true)
}

pub fn is_favorite(doc: &Document, username: &str, content_id: &str) -> bool {
    doc.find_any_account(username)
        .map(|a| a.favorites.iter().any(|f| f == content_id))
        .unwrap_or(false)
}

/// Favorites that still resolve to catalog items, in the order added.
pub fn favorites<'a>(doc: &'a Document, username: &str) -> Vec<ContentRef<'a>> {
    let Some(account) = doc.find_any_account(username) else {
        return Vec::new();
    };
    account
        .favorites
        .iter()
        .filter_map(|id| doc.find_content(id))
        .collect()
}

/// Moves `id` to the front of the history, dropping older duplicates and
/// anything past `MAX_HISTORY_ITEMS`.
pub fn record_history(entries: &mut Vec<HistoryEntry>, id: &str, kind: ContentKind, now: DateTime<Utc>) {
    entries.retain(|e| e.id != id);
    entries.insert(
        0,
        HistoryEntry {
            id: id.to_string(),
            kind,
            timestamp: now,
        },
    );
    entries.truncate(MAX_HISTORY_ITEMS);
}

/// History entries paired with their items; dangling ids are skipped.
pub fn resolve_history<'a>(doc: &'a Document, entries: &[HistoryEntry]) -> Vec<(DateTime<Utc>, ContentRef<'a>)> {
    entries
        .iter()
        .filter_map(|e| doc.find_content(&e.id).map(|item| (e.timestamp, item)))
        .collect()
}

/// What the player shows for one request.
#[derive(Debug, Clone)]
pub struct Playback<'a> {
    pub item: ContentRef<'a>,
    /// Season and episode numbers; `None` for movies.
    pub position: Option<(u32, u32)>,
    pub link: String,
    /// `None` when the link has no embeddable form.
    pub embed: Option<String>,
    pub prev: Option<(u32, u32)>,
    pub next: Option<(u32, u32)>,
}

/// Picks the movie link, or the requested episode of a show (first season
/// and first episode by default).
pub fn playback<'a>(doc: &'a Document, id: &str, season: Option<u32>, episode: Option<u32>) -> Result<Playback<'a>> {
    let item = doc
        .find_content(id)
        .ok_or_else(|| AppError::NotFound(format!("content {}", id)))?;

    let show = match item {
        ContentRef::Movie(movie) => {
            return Ok(Playback {
                item,
                position: None,
                link: movie.link.clone(),
                embed: embed_url(&movie.link),
                prev: None,
                next: None,
            })
        }
        ContentRef::Show(_, show) => show,
    };

    // Flattened episode order across seasons drives prev/next.
    let order: Vec<(u32, u32, &str)> = show
        .seasons
        .iter()
        .flat_map(|s| {
            s.episodes
                .iter()
                .map(move |e| (s.season_number, e.episode_number, e.link.as_str()))
        })
        .collect();

    if order.is_empty() {
        return Err(AppError::NotFound(format!("{} has no episodes", show.name)));
    }

    let index = match (season, episode) {
        (None, None) => 0,
        (season, episode) => {
            let season = season.unwrap_or(order[0].0);
            order
                .iter()
                .position(|(s, e, _)| *s == season && episode.map_or(true, |ep| *e == ep))
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "season {} episode {} of {}",
                        season,
                        episode.map(|e| e.to_string()).unwrap_or_default(),
                        show.name
                    ))
                })?
        }
    };

    let (s, e, link) = order[index];
    Ok(Playback {
        item,
        position: Some((s, e)),
        link: link.to_string(),
        embed: embed_url(link),
        prev: index.checked_sub(1).map(|i| (order[i].0, order[i].1)),
        next: order.get(index + 1).map(|(s, e, _)| (*s, *e)),
    })
}
