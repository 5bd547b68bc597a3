use crate::error::{AppError, Result};
use crate::models::{ContentKind, ContentRef, Document, Episode, Movie, Season, Show};
use crate::search::matches_any;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Url;

/// Category keys and display names shared by every content kind.
pub const MEDIA_CATEGORIES: [(&str, &str); 16] = [
    ("acao", "Ação"),
    ("aventura", "Aventura"),
    ("comedia", "Comédia"),
    ("drama", "Drama"),
    ("ficcao", "Ficção"),
    ("crime", "Crime"),
    ("misterio", "Mistério"),
    ("familia", "Família"),
    ("romance", "Romance"),
    ("fantasia", "Fantasia"),
    ("historia", "História"),
    ("guerra", "Guerra"),
    ("faroeste", "Faroeste"),
    ("terror", "Terror"),
    ("documentario", "Documentário"),
    ("outros", "Outros"),
];

/// Hosts video links may point at (matched as substrings of the hostname).
pub const ALLOWED_LINK_DOMAINS: [&str; 9] = [
    "drive.google.com",
    "dropbox.com",
    "archive.org",
    "pixeldrain.com",
    "youtube.com",
    "youtu.be",
    "terabox.com",
    "vidlii.com",
    "bitchute.com",
];

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn category_name(key: &str) -> Option<&'static str> {
    MEDIA_CATEGORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

/// `<prefix><epoch millis><9 base-36 chars>`, e.g. `movie_1700000000000k3j9x0a1b`.
pub fn generate_content_id<R: Rng>(kind: ContentKind, now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}{}", kind.id_prefix(), now.timestamp_millis(), suffix)
}

pub fn is_valid_link(link: &str) -> bool {
    match Url::parse(link.trim()) {
        Ok(url) => url
            .host_str()
            .map(|host| ALLOWED_LINK_DOMAINS.iter().any(|d| host.contains(d)))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Rewrites a watch link into something an `<iframe>` can load. Hosts
/// without a known embed form are returned unchanged.
pub fn embed_url(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let Ok(url) = Url::parse(link) else {
        return Some(link.to_string());
    };
    let host = url.host_str().unwrap_or_default();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let query = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if host.contains("youtube.com") || host.contains("youtu.be") {
        let video_id = if host.contains("youtu.be") {
            segments.last().map(|s| s.to_string())
        } else if segments.first() == Some(&"embed") {
            segments.get(1).map(|s| s.to_string())
        } else {
            query("v")
        };
        return video_id.map(|id| format!("https://www.youtube.com/embed/{}", id));
    }

    if host.contains("drive.google.com") {
        if let Some(pos) = segments.iter().position(|s| *s == "d") {
            if let Some(file_id) = segments.get(pos + 1) {
                return Some(format!("https://drive.google.com/file/d/{}/preview", file_id));
            }
        }
    }

    if host.contains("bitchute.com") && segments.first() == Some(&"video") {
        if let Some(video_id) = segments.get(1) {
            return Some(format!("https://www.bitchute.com/embed/{}/", video_id));
        }
    }

    if host.contains("vidlii.com") && url.path() == "/watch" {
        if let Some(video_id) = query("v") {
            return Some(format!("https://www.vidlii.com/embed?v={}", video_id));
        }
    }

    Some(link.to_string())
}

/// Converts an uploaded image into a `data:` URL for the `cover` field.
pub fn cover_data_url(content_type: &str, bytes: &[u8], max_size: usize) -> Result<String> {
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(
            "Please select an image file".to_string(),
        ));
    }
    if bytes.len() > max_size {
        return Err(AppError::BadRequest(format!(
            "The image must not exceed {} KB",
            max_size / 1024
        )));
    }
    Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(bytes)))
}

/// Parses the season editor text: seasons are blocks separated by blank
/// lines, each line one episode link. Numbering follows order.
pub fn parse_seasons(text: &str) -> Result<Vec<Season>> {
    let mut seasons: Vec<Season> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    let flush = |current: &mut Vec<String>, seasons: &mut Vec<Season>| {
        if current.is_empty() {
            return;
        }
        let season_number = seasons.len() as u32 + 1;
        let episodes = current
            .drain(..)
            .enumerate()
            .map(|(i, link)| Episode {
                episode_number: i as u32 + 1,
                link,
            })
            .collect();
        seasons.push(Season {
            season_number,
            episodes,
        });
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current, &mut seasons);
        } else {
            current.push(line.to_string());
        }
    }
    flush(&mut current, &mut seasons);

    for season in &seasons {
        for episode in &season.episodes {
            if !is_valid_link(&episode.link) {
                return Err(AppError::BadRequest(format!(
                    "Invalid link in episode {} of season {}. Use only the allowed sites.",
                    episode.episode_number, season.season_number
                )));
            }
        }
    }

    Ok(seasons)
}

/// Inverse of `parse_seasons`, used to prefill the edit form.
pub fn format_seasons(seasons: &[Season]) -> String {
    seasons
        .iter()
        .map(|s| {
            s.episodes
                .iter()
                .map(|e| e.link.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Submitted content form, before validation.
#[derive(Debug, Clone, Default)]
pub struct ContentDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub release_year: String,
    /// Already converted to a data URL; `None` keeps the existing cover.
    pub cover: Option<String>,
    pub link: String,
    pub seasons: String,
}

struct ValidDraft {
    name: String,
    description: String,
    category: String,
    release_year: Option<i32>,
    cover: Option<String>,
    link: String,
    seasons: Vec<Season>,
}

fn validate(kind: ContentKind, draft: ContentDraft, creating: bool) -> Result<ValidDraft> {
    let name = draft.name.trim().to_string();
    let description = draft.description.trim().to_string();
    if name.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest(
            "Name and description are required".to_string(),
        ));
    }

    let category = draft.category.trim().to_string();
    if category_name(&category).is_none() {
        return Err(AppError::BadRequest("Please select a category".to_string()));
    }

    let year = draft.release_year.trim();
    let release_year = if year.is_empty() {
        None
    } else if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok()
    } else {
        return Err(AppError::BadRequest(
            "Enter a valid 4-digit year".to_string(),
        ));
    };

    if creating && draft.cover.is_none() {
        return Err(AppError::BadRequest("A cover image is required".to_string()));
    }

    let link = draft.link.trim().to_string();
    let seasons = if kind.has_seasons() {
        parse_seasons(&draft.seasons)?
    } else {
        if !is_valid_link(&link) {
            return Err(AppError::BadRequest(
                "Invalid link. Use only the allowed sites.".to_string(),
            ));
        }
        Vec::new()
    };

    Ok(ValidDraft {
        name,
        description,
        category,
        release_year,
        cover: draft.cover,
        link,
        seasons,
    })
}

/// Validates and appends a new item; returns its id.
pub fn add_content<R: Rng>(
    doc: &mut Document,
    kind: ContentKind,
    draft: ContentDraft,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<String> {
    let valid = validate(kind, draft, true)?;
    let id = generate_content_id(kind, now, rng);
    let cover = valid.cover.unwrap_or_default();

    match kind {
        ContentKind::Movie => doc.movies.push(Movie {
            id: id.clone(),
            name: valid.name,
            description: valid.description,
            cover,
            category: valid.category,
            release_year: valid.release_year,
            created_at: Some(now),
            link: valid.link,
        }),
        _ => doc.shows_mut(kind).push(Show {
            id: id.clone(),
            name: valid.name,
            description: valid.description,
            cover,
            category: valid.category,
            release_year: valid.release_year,
            created_at: Some(now),
            seasons: valid.seasons,
        }),
    }

    tracing::info!("Added {:?} {}", kind, id);
    Ok(id)
}

/// Replaces the editable fields of an existing item, keeping id and
/// creation time. A missing cover keeps the old one.
pub fn update_content(doc: &mut Document, kind: ContentKind, id: &str, draft: ContentDraft) -> Result<()> {
    let valid = validate(kind, draft, false)?;
    let not_found = || AppError::NotFound(format!("{:?} {}", kind, id));

    match kind {
        ContentKind::Movie => {
            let movie = doc.movies.iter_mut().find(|m| m.id == id).ok_or_else(not_found)?;
            movie.name = valid.name;
            movie.description = valid.description;
            movie.category = valid.category;
            movie.release_year = valid.release_year;
            movie.link = valid.link;
            if let Some(cover) = valid.cover {
                movie.cover = cover;
            }
        }
        _ => {
            let show = doc
                .shows_mut(kind)
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(not_found)?;
            show.name = valid.name;
            show.description = valid.description;
            show.category = valid.category;
            show.release_year = valid.release_year;
            show.seasons = valid.seasons;
            if let Some(cover) = valid.cover {
                show.cover = cover;
            }
        }
    }
    Ok(())
}

/// Removes an item. Favorites that reference it are left alone and filtered
/// out wherever they are rendered.
pub fn delete_content(doc: &mut Document, kind: ContentKind, id: &str) -> Result<()> {
    let removed = match kind {
        ContentKind::Movie => {
            let before = doc.movies.len();
            doc.movies.retain(|m| m.id != id);
            before != doc.movies.len()
        }
        _ => {
            let shows = doc.shows_mut(kind);
            let before = shows.len();
            shows.retain(|s| s.id != id);
            before != shows.len()
        }
    };

    if !removed {
        return Err(AppError::NotFound(format!("{:?} {}", kind, id)));
    }
    tracing::info!("Deleted {:?} {}", kind, id);
    Ok(())
}

/// Items of one kind matching a search term and optional category.
pub fn filter_content<'a>(doc: &'a Document, kind: ContentKind, term: &str, category: Option<&str>) -> Vec<ContentRef<'a>> {
    doc.content(kind)
        .into_iter()
        .filter(|item| matches_any(term, &[item.name()]))
        .filter(|item| match category {
            Some(cat) if !cat.is_empty() => item.category() == cat,
            _ => true,
        })
        .collect()
}
