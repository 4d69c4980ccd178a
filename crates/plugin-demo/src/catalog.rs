//! Static catalog data bundled with the plugin.

use serde::Deserialize;

use tvbox_plugin_sdk::prelude::*;

const CATALOG_JSON: &str = include_str!("../data/catalog.json");

/// The full catalog, grouped by category.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    categories: Vec<CatalogCategory>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogCategory {
    id: String,
    name: String,
    items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogItem {
    id: String,
    title: String,
    #[serde(default)]
    year: Option<u16>,
    #[serde(default)]
    cover_url: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    episodes: Vec<String>,
}

impl CatalogItem {
    fn card(&self) -> MediaCard {
        let subtitle = match (self.year, self.episodes.len()) {
            (Some(year), n) if n > 1 => Some(format!("{year} · {n} episodes")),
            (Some(year), _) => Some(year.to_string()),
            (None, n) if n > 1 => Some(format!("{n} episodes")),
            (None, _) => None,
        };
        MediaCard {
            id: self.id.clone(),
            title: self.title.clone(),
            subtitle,
            cover_url: self.cover_url.clone(),
        }
    }
}

impl Catalog {
    /// Parses the catalog compiled into the library.
    pub fn bundled() -> Result<Self, String> {
        Self::from_json(CATALOG_JSON)
    }

    /// Parses a catalog document.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid catalog: {e}"))
    }

    /// Number of items across all categories.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One row per category holding its first `per_row` items.
    pub fn rows(&self, per_row: usize) -> Vec<MediaRow> {
        self.categories
            .iter()
            .filter(|c| !c.items.is_empty())
            .map(|c| MediaRow {
                title: c.name.clone(),
                items: c.items.iter().take(per_row).map(CatalogItem::card).collect(),
            })
            .collect()
    }

    /// Category list in display order.
    pub fn categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .map(|c| Category {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    /// Detail page of `media_id`.
    pub fn detail(&self, media_id: &str) -> Option<MediaDetail> {
        let item = self.items().find(|item| item.id == media_id)?;
        Some(MediaDetail {
            card: item.card(),
            description: item.description.clone(),
            episodes: item
                .episodes
                .iter()
                .enumerate()
                .map(|(i, title)| Episode {
                    id: format!("{}:{}", item.id, i + 1),
                    title: title.clone(),
                })
                .collect(),
        })
    }

    /// Case-insensitive title search, paged.
    pub fn search(&self, keyword: &str, page: u32, page_size: usize) -> SearchPage {
        let keyword = keyword.trim().to_lowercase();
        let matches: Vec<MediaCard> = self
            .items()
            .filter(|item| !keyword.is_empty() && item.title.to_lowercase().contains(&keyword))
            .map(CatalogItem::card)
            .collect();
        let (items, has_next) = paginate(matches, page, page_size);
        SearchPage { items, has_next }
    }

    /// Page `page` of `category`, or `None` for an unknown category.
    pub fn page(&self, category: &str, page: u32, page_size: usize) -> Option<CatalogPage> {
        let category = self.categories.iter().find(|c| c.id == category)?;
        let cards = category.items.iter().map(CatalogItem::card).collect();
        let (items, has_next) = paginate(cards, page, page_size);
        Some(CatalogPage {
            items,
            page,
            has_next,
        })
    }

    fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }
}

/// Slices 1-based page `page` out of `cards`. Page 0 is treated as page 1.
fn paginate(cards: Vec<MediaCard>, page: u32, page_size: usize) -> (Vec<MediaCard>, bool) {
    let page_size = page_size.max(1);
    let start = (page.max(1) as usize - 1).saturating_mul(page_size);
    let has_next = cards.len() > start.saturating_add(page_size);
    let items = cards.into_iter().skip(start).take(page_size).collect();
    (items, has_next)
}
