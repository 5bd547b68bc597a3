use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Lowercases and strips diacritics so "Ação" matches "acao".
pub fn normalize(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// True when `term` is empty or occurs in any of `fields`, accent-insensitively.
pub fn matches_any(term: &str, fields: &[&str]) -> bool {
    let term = normalize(term.trim());
    term.is_empty() || fields.iter().any(|f| normalize(f).contains(&term))
}

/// One page of a slice, with the page number clamped into range.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slices `items` into pages of `per_page`, optionally capped at `max_pages`.
/// Pages are 1-based; out-of-range requests land on the nearest page.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize, max_pages: Option<usize>) -> Page<T> {
    let per_page = per_page.max(1);
    let mut total_pages = items.len().div_ceil(per_page);
    if let Some(max) = max_pages {
        total_pages = total_pages.min(max);
    }
    let total_items = items.len().min(total_pages * per_page);
    let page = page.clamp(1, total_pages.max(1));

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}
