//! Detail page extraction rules.
//!
//! Each [`MediaKind`] supplies its own name rule and date rule. Dates are
//! taken from the first `YYYY-MM-DD` substring in the date element's text,
//! so trailing qualifiers such as release regions are discarded.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{MediaDetails, MediaKind};

/// Label text preceding a game's expected release date.
const GAME_RELEASE_LABEL: &str = "预计上市时间:";

/// Where the release date lives on a page.
#[derive(Debug, Clone, Copy)]
enum DateRule {
    /// Text of the first element matching the selector.
    Element(&'static str),
    /// Text of the first `sibling` element following a `label` element
    /// whose text contains `marker`.
    AfterLabel {
        label: &'static str,
        marker: &'static str,
        sibling: &'static str,
    },
}

/// Name and date rules for one kind of page.
#[derive(Debug, Clone, Copy)]
struct ExtractionRule {
    name: &'static str,
    date: DateRule,
}

impl ExtractionRule {
    fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Film => Self {
                name: r#"span[property="v:itemreviewed"]"#,
                date: DateRule::Element(r#"span[property="v:initialReleaseDate"]"#),
            },
            MediaKind::Game => Self {
                name: "title",
                date: DateRule::AfterLabel {
                    label: "dt",
                    marker: GAME_RELEASE_LABEL,
                    sibling: "dd",
                },
            },
        }
    }
}

/// Extracts [`MediaDetails`] from detail page HTML.
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    date_pattern: Regex,
}

impl MediaExtractor {
    /// Create a new extractor.
    pub fn new() -> Result<Self> {
        let date_pattern = Regex::new(r"\d{4}-\d{2}-\d{2}")
            .map_err(|e| AppError::validation(format!("date pattern: {e}")))?;
        Ok(Self { date_pattern })
    }

    /// Extract the name and release date for a page of the given kind.
    ///
    /// Missing elements yield the `Unknown` name or a null date; a page
    /// without an announced date is not an error.
    pub fn extract(&self, kind: MediaKind, html: &str) -> Result<MediaDetails> {
        let document = Html::parse_document(html);
        let rule = ExtractionRule::for_kind(kind);

        let name = Self::first_text(&document, rule.name)?
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| MediaDetails::unknown().name);

        let date_text = match rule.date {
            DateRule::Element(selector) => Self::first_text(&document, selector)?,
            DateRule::AfterLabel {
                label,
                marker,
                sibling,
            } => Self::text_after_label(&document, label, marker, sibling)?,
        };

        let release_date = date_text.as_deref().and_then(|text| self.find_date(text));
        if release_date.is_none() {
            log::debug!("No release date on {:?} page for '{}'", kind, name);
        }

        Ok(MediaDetails { name, release_date })
    }

    /// First `YYYY-MM-DD` substring of `text`.
    pub fn find_date(&self, text: &str) -> Option<String> {
        self.date_pattern
            .find(text)
            .map(|m| m.as_str().to_string())
    }

    fn first_text(document: &Html, selector: &str) -> Result<Option<String>> {
        let selector = parse_selector(selector)?;
        Ok(document.select(&selector).next().map(element_text))
    }

    fn text_after_label(
        document: &Html,
        label: &str,
        marker: &str,
        sibling: &str,
    ) -> Result<Option<String>> {
        let label_sel = parse_selector(label)?;
        let found = document
            .select(&label_sel)
            .find(|el| el.text().collect::<String>().contains(marker))
            .and_then(|el| {
                el.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|next| next.value().name() == sibling)
            })
            .map(element_text);
        Ok(found)
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILM_PAGE: &str = r#"
        <html><head><title>沙丘2 (豆瓣)</title></head><body>
          <h1><span property="v:itemreviewed">沙丘2 Dune: Part Two</span></h1>
          <div id="info">
            <span property="v:initialReleaseDate" content="2024-03-08(中国大陆)">2024-03-08(中国大陆)</span> /
            <span property="v:initialReleaseDate" content="2024-03-01(美国)">2024-03-01(美国)</span>
          </div>
        </body></html>
    "#;

    const GAME_PAGE: &str = r#"
        <html><head><title> 空洞骑士：丝之歌 </title></head><body>
          <dl class="game-attr">
            <dt>平台:</dt><dd>PC</dd>
            <dt>预计上市时间:</dt>
            <dd>2025-09-04 全球</dd>
          </dl>
        </body></html>
    "#;

    fn extractor() -> MediaExtractor {
        MediaExtractor::new().unwrap()
    }

    #[test]
    fn test_film_page() {
        let details = extractor().extract(MediaKind::Film, FILM_PAGE).unwrap();
        assert_eq!(details.name, "沙丘2 Dune: Part Two");
        assert_eq!(details.release_date.as_deref(), Some("2024-03-08"));
    }

    #[test]
    fn test_game_page_uses_sibling_after_label() {
        let details = extractor().extract(MediaKind::Game, GAME_PAGE).unwrap();
        assert_eq!(details.name, "空洞骑士：丝之歌");
        assert_eq!(details.release_date.as_deref(), Some("2025-09-04"));
    }

    #[test]
    fn test_unannounced_date_is_none() {
        let html = r#"<span property="v:itemreviewed">Untitled</span>
                      <span property="v:initialReleaseDate">2026(待定)</span>"#;
        let details = extractor().extract(MediaKind::Film, html).unwrap();
        assert_eq!(details.name, "Untitled");
        assert_eq!(details.release_date, None);
    }

    #[test]
    fn test_missing_elements_yield_unknown() {
        let details = extractor()
            .extract(MediaKind::Film, "<html><body><p>blocked</p></body></html>")
            .unwrap();
        assert!(details.is_unknown());
        assert_eq!(details.release_date, None);
    }

    #[test]
    fn test_game_without_label() {
        let html = "<html><head><title>Some Game</title></head><body><dl><dt>平台:</dt><dd>2024-01-01</dd></dl></body></html>";
        let details = extractor().extract(MediaKind::Game, html).unwrap();
        assert_eq!(details.name, "Some Game");
        assert_eq!(details.release_date, None);
    }

    #[test]
    fn test_find_date_takes_first_match() {
        let ex = extractor();
        assert_eq!(
            ex.find_date("2023-11-02(东京国际电影节) / 2024-01-05"),
            Some("2023-11-02".to_string())
        );
        assert_eq!(ex.find_date("2024年"), None);
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }
}
