//! Page builders: pure functions from a document snapshot to template data.

use crate::accounts::{self, ACTIVATION_DURATIONS};
use crate::auth::{Role, Session};
use crate::catalog::{self, category_name, ALLOWED_LINK_DOMAINS, MEDIA_CATEGORIES};
use crate::error::{AppError, Result};
use crate::models::{Account, AccountKind, AccountStatus, ContentKind, ContentRef, Document, HistoryEntry};
use crate::search::{matches_any, paginate, Page};
use crate::templates::*;
use crate::watch::{self, Playback};
use chrono::{DateTime, Utc};

pub const ADMIN_PAGE_SIZE: usize = 10;
pub const CATALOG_PAGE_SIZE: usize = 24;
pub const HISTORY_PAGE_SIZE: usize = 12;
pub const HISTORY_MAX_PAGES: usize = 2;

/// Search, category and page parameters of a list screen.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub q: String,
    pub category: String,
    pub page: usize,
}

pub fn layout(doc: &Document, title: &str, session: Option<&Session>) -> Layout {
    Layout {
        title: title.to_string(),
        site_name: doc.config.site_name.clone(),
        username: session.map(|s| s.username.clone()).unwrap_or_default(),
        admin: session.map(|s| s.role == Role::Admin).unwrap_or(false),
        logged_in: session.is_some(),
        notice: None,
        error: None,
    }
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y").to_string()
}

fn format_datetime(ts: DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %H:%M").to_string()
}

fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn page_href(base: &str, params: &[(&str, &str)], page: usize) -> String {
    let page = page.to_string();
    let mut all = params.to_vec();
    all.push(("page", page.as_str()));
    format!("{}?{}", base, query_string(&all))
}

/// Links for a page of results; `params` are carried on every link.
pub fn pager<T>(page: &Page<T>, base: &str, params: &[(&str, &str)]) -> Pager {
    Pager {
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
        prev_href: page
            .has_prev()
            .then(|| page_href(base, params, page.page - 1)),
        next_href: page
            .has_next()
            .then(|| page_href(base, params, page.page + 1)),
        links: (1..=page.total_pages)
            .map(|n| PageLink {
                number: n,
                href: page_href(base, params, n),
                current: n == page.page,
            })
            .collect(),
    }
}

fn category_options(selected: &str) -> Vec<SelectOption> {
    MEDIA_CATEGORIES
        .iter()
        .map(|(key, label)| SelectOption {
            value: key.to_string(),
            label: label.to_string(),
            selected: *key == selected,
        })
        .collect()
}

fn category_label(key: &str) -> String {
    category_name(key).unwrap_or(key).to_string()
}

fn year_label(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_default()
}

pub fn account_row(account: &Account, now: DateTime<Utc>) -> AccountRow {
    let (status_label, status_class) = accounts::status_label(account, now);
    let contact = [&account.name, &account.whatsapp, &account.email]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" · ");

    AccountRow {
        username: account.username.clone(),
        password: account.password.clone(),
        description: account.description.clone(),
        created: format_date(account.created_at),
        expires: format_date(account.expires_at),
        status_label,
        status_class: status_class.to_string(),
        remaining: accounts::remaining_time(account, now),
        blocked: account.status == AccountStatus::Blocked,
        contact,
    }
}

pub fn login(layout: Layout) -> LoginTemplate {
    LoginTemplate { layout }
}

pub fn dashboard(doc: &Document, layout: Layout, default_password: bool, now: DateTime<Utc>) -> DashboardTemplate {
    let active_clients = doc
        .users
        .clients
        .iter()
        .filter(|a| accounts::effective_status(a, now) == AccountStatus::Active)
        .count();

    let mut expiring: Vec<&Account> = doc
        .users
        .clients
        .iter()
        .filter(|a| accounts::status_label(a, now).1 == "pending")
        .collect();
    expiring.sort_by_key(|a| a.expires_at);

    DashboardTemplate {
        layout,
        clients: doc.users.clients.len(),
        active_clients,
        tests: doc.users.tests.len(),
        movies: doc.movies.len(),
        series: doc.series.len(),
        animes: doc.animes.len(),
        expiring: expiring.into_iter().map(|a| account_row(a, now)).collect(),
        default_password,
    }
}

/// The generate screen, showing the credentials of a just-created account.
pub fn generate(doc: &Document, layout: Layout, kind: AccountKind, created: Option<&str>, now: DateTime<Utc>) -> GenerateTemplate {
    let duration_days = match kind {
        AccountKind::Client => doc.config.expiration_days,
        AccountKind::Test => doc.config.test_duration_days,
    };
    GenerateTemplate {
        layout,
        kind_label: kind.label().to_string(),
        segment: kind.segment().to_string(),
        duration_days,
        created: created
            .and_then(|u| doc.find_account(kind, u))
            .map(|a| account_row(a, now)),
    }
}

pub fn accounts(doc: &Document, layout: Layout, kind: AccountKind, list: &ListQuery, now: DateTime<Utc>) -> AccountsTemplate {
    let matching: Vec<&Account> = doc
        .accounts(kind)
        .iter()
        .filter(|a| {
            matches_any(
                &list.q,
                &[
                    a.username.as_str(),
                    a.description.as_str(),
                    a.name.as_deref().unwrap_or_default(),
                    a.email.as_deref().unwrap_or_default(),
                    a.whatsapp.as_deref().unwrap_or_default(),
                ],
            )
        })
        .collect();

    let page = paginate(matching, list.page, ADMIN_PAGE_SIZE, None);
    let base = format!("/admin/{}", kind.segment());

    AccountsTemplate {
        layout,
        kind_label: kind.label().to_string(),
        segment: kind.segment().to_string(),
        is_test: kind == AccountKind::Test,
        q: list.q.clone(),
        pager: pager(&page, &base, &[("q", list.q.as_str())]),
        rows: page.items.iter().map(|a| account_row(a, now)).collect(),
        activation_days: ACTIVATION_DURATIONS.to_vec(),
    }
}

fn content_row(item: &ContentRef<'_>) -> ContentRow {
    let episodes = match item {
        ContentRef::Movie(_) => 0,
        ContentRef::Show(_, show) => show.seasons.iter().map(|s| s.episodes.len()).sum(),
    };
    ContentRow {
        id: item.id().to_string(),
        name: item.name().to_string(),
        cover: item.cover().to_string(),
        category: category_label(item.category()),
        release_year: year_label(item.release_year()),
        episodes,
        edit_href: format!("/admin/{}/{}", item.kind().segment(), item.id()),
    }
}

/// Admin list of one content kind with its add form, or the edit form for
/// `editing`.
pub fn content(doc: &Document, layout: Layout, kind: ContentKind, list: &ListQuery, editing: Option<&str>) -> Result<ContentTemplate> {
    let form = match editing {
        None => ContentForm {
            action: format!("/admin/content/{}", kind.segment()),
            categories: category_options(""),
            ..ContentForm::default()
        },
        Some(id) => {
            let item = doc
                .content(kind)
                .into_iter()
                .find(|c| c.id() == id)
                .ok_or_else(|| AppError::NotFound(format!("{:?} {}", kind, id)))?;
            let (link, seasons) = match item {
                ContentRef::Movie(movie) => (movie.link.clone(), String::new()),
                ContentRef::Show(_, show) => (String::new(), catalog::format_seasons(&show.seasons)),
            };
            ContentForm {
                action: format!("/admin/content/{}/{}", kind.segment(), id),
                editing: true,
                name: item.name().to_string(),
                description: item.description().to_string(),
                release_year: year_label(item.release_year()),
                cover: item.cover().to_string(),
                link,
                seasons,
                categories: category_options(item.category()),
            }
        }
    };

    let matching = catalog::filter_content(doc, kind, &list.q, None);
    let page = paginate(matching, list.page, ADMIN_PAGE_SIZE, None);
    let base = format!("/admin/{}", kind.segment());

    Ok(ContentTemplate {
        layout,
        kind_label: kind.label().to_string(),
        segment: kind.segment().to_string(),
        has_seasons: kind.has_seasons(),
        q: list.q.clone(),
        pager: pager(&page, &base, &[("q", list.q.as_str())]),
        rows: page.items.iter().map(content_row).collect(),
        form,
        allowed_domains: ALLOWED_LINK_DOMAINS.join(", "),
    })
}

pub fn backup(layout: Layout, publish_target: String, saved_token: bool, bootstrap_enabled: bool) -> BackupTemplate {
    BackupTemplate {
        layout,
        publish_target,
        saved_token,
        bootstrap_enabled,
    }
}

pub fn settings(doc: &Document, layout: Layout) -> SettingsTemplate {
    SettingsTemplate {
        layout,
        expiration_days: doc.config.expiration_days,
        test_duration_days: doc.config.test_duration_days,
        site_name: doc.config.site_name.clone(),
    }
}

/// Client navigation; `active` is the segment of the current screen.
pub fn client_tabs(active: &str) -> Vec<NavTab> {
    let mut tabs: Vec<NavTab> = ContentKind::ALL
        .iter()
        .map(|k| NavTab {
            label: k.label().to_string(),
            href: format!("/catalog/{}", k.segment()),
            active: k.segment() == active,
        })
        .collect();
    for (segment, label) in [("favorites", "Favorites"), ("history", "History")] {
        tabs.push(NavTab {
            label: label.to_string(),
            href: format!("/catalog/{}", segment),
            active: segment == active,
        });
    }
    tabs
}

fn card(doc: &Document, username: &str, item: &ContentRef<'_>) -> CardView {
    CardView {
        id: item.id().to_string(),
        name: item.name().to_string(),
        cover: item.cover().to_string(),
        category: category_label(item.category()),
        release_year: year_label(item.release_year()),
        href: format!("/catalog/{}/{}", item.kind().segment(), item.id()),
        favorite: watch::is_favorite(doc, username, item.id()),
    }
}

pub fn catalog(doc: &Document, layout: Layout, username: &str, kind: ContentKind, list: &ListQuery) -> CatalogTemplate {
    let category = (!list.category.is_empty()).then_some(list.category.as_str());
    let matching = catalog::filter_content(doc, kind, &list.q, category);
    let page = paginate(matching, list.page, CATALOG_PAGE_SIZE, None);
    let base = format!("/catalog/{}", kind.segment());

    CatalogTemplate {
        layout,
        tabs: client_tabs(kind.segment()),
        kind_label: kind.label().to_string(),
        segment: kind.segment().to_string(),
        q: list.q.clone(),
        categories: category_options(&list.category),
        pager: pager(&page, &base, &[("q", list.q.as_str()), ("category", list.category.as_str())]),
        cards: page.items.iter().map(|item| card(doc, username, item)).collect(),
    }
}

pub fn favorites(doc: &Document, layout: Layout, username: &str) -> FavoritesTemplate {
    FavoritesTemplate {
        layout,
        tabs: client_tabs("favorites"),
        cards: watch::favorites(doc, username)
            .iter()
            .map(|item| card(doc, username, item))
            .collect(),
    }
}

pub fn history(doc: &Document, layout: Layout, username: &str, entries: &[HistoryEntry], page: usize) -> HistoryTemplate {
    let resolved = watch::resolve_history(doc, entries);
    let page = paginate(resolved, page, HISTORY_PAGE_SIZE, Some(HISTORY_MAX_PAGES));

    HistoryTemplate {
        layout,
        tabs: client_tabs("history"),
        pager: pager(&page, "/catalog/history", &[]),
        entries: page
            .items
            .iter()
            .map(|(ts, item)| HistoryView {
                card: card(doc, username, item),
                watched_at: format_datetime(*ts),
            })
            .collect(),
    }
}

fn episode_href(id: &str, (season, episode): (u32, u32)) -> String {
    format!(
        "/player?id={}&season={}&episode={}",
        urlencoding::encode(id),
        season,
        episode
    )
}

pub fn player(doc: &Document, layout: Layout, username: &str, playback: &Playback<'_>) -> PlayerTemplate {
    let item = &playback.item;
    let id = item.id();

    let seasons = match item {
        ContentRef::Movie(_) => Vec::new(),
        ContentRef::Show(_, show) => show
            .seasons
            .iter()
            .map(|s| SeasonView {
                number: s.season_number,
                episodes: s
                    .episodes
                    .iter()
                    .map(|e| EpisodeLink {
                        number: e.episode_number,
                        href: episode_href(id, (s.season_number, e.episode_number)),
                        current: playback.position == Some((s.season_number, e.episode_number)),
                    })
                    .collect(),
            })
            .collect(),
    };

    PlayerTemplate {
        layout,
        tabs: client_tabs(item.kind().segment()),
        item: card(doc, username, item),
        description: item.description().to_string(),
        position: playback
            .position
            .map(|(s, e)| format!("Season {} · Episode {}", s, e)),
        embed: playback.embed.clone(),
        link: playback.link.clone(),
        seasons,
        prev_href: playback.prev.map(|p| episode_href(id, p)),
        next_href: playback.next.map(|p| episode_href(id, p)),
    }
}
