//! HTML extraction. Pure functions over a parsed document.

use std::collections::BTreeMap;

use agora_core::scrape::{ScrapedPage, Table};
use chrono::Utc;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];

/// Substrings that disqualify a link.
const EXCLUDED_LINK_PARTS: &[&str] = &["javascript:", "mailto:", "#", "pdf", "download"];

/// Parse `html` fetched from `url` into a [`ScrapedPage`].
pub fn extract_page(url: &str, html: &str, link_limit: usize) -> ScrapedPage {
    let document = Html::parse_document(html);
    ScrapedPage {
        url: url.to_string(),
        text: extract_text(&document),
        tables: extract_tables(&document),
        links: extract_links(&document, url, link_limit),
        metadata: extract_metadata(&document),
        scraped_at: Utc::now(),
    }
}

fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_in<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text of an element with each fragment trimmed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(text.to_string()),
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Readable page text with boilerplate elements removed and whitespace collapsed.
pub fn extract_text(document: &Html) -> String {
    let mut fragments = Vec::new();
    collect_text(document.root_element(), &mut fragments);
    fragments
        .iter()
        .flat_map(|f| f.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute http(s) links, at most `limit`.
pub fn extract_links(document: &Html, base_url: &str, limit: usize) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    select(document, "a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
        .filter(|url| {
            let lower = url.to_lowercase();
            !EXCLUDED_LINK_PARTS.iter().any(|part| lower.contains(part))
        })
        .take(limit)
        .collect()
}

/// Tables with at least one data row; the first row supplies headers.
pub fn extract_tables(document: &Html) -> Vec<Table> {
    select(document, "table")
        .into_iter()
        .filter_map(|table| {
            let rows = select_in(table, "tr");
            let (header_row, data_rows) = rows.split_first()?;

            let headers = select_in(*header_row, "th, td")
                .into_iter()
                .map(element_text)
                .collect();

            let rows: Vec<Vec<String>> = data_rows
                .iter()
                .map(|row| {
                    select_in(*row, "td, th")
                        .into_iter()
                        .map(element_text)
                        .collect::<Vec<_>>()
                })
                .filter(|cells| !cells.is_empty())
                .collect();

            (!rows.is_empty()).then_some(Table { headers, rows })
        })
        .collect()
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    select(document, css)
        .into_iter()
        .find_map(|m| m.value().attr("content").map(str::to_string))
}

/// Title, description, author and publication date when present.
pub fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    let title = select(document, "title")
        .into_iter()
        .chain(select(document, "h1"))
        .map(element_text)
        .find(|t| !t.is_empty());
    if let Some(title) = title {
        metadata.insert("title".into(), title);
    }

    if let Some(description) = meta_content(document, r#"meta[name="description"]"#) {
        metadata.insert("description".into(), description);
    }

    let author = meta_content(document, r#"meta[name="author"]"#)
        .or_else(|| meta_content(document, r#"meta[property="article:author"]"#));
    if let Some(author) = author {
        metadata.insert("author".into(), author);
    }

    let date = meta_content(document, r#"meta[property="article:published_time"]"#).or_else(|| {
        select(document, "time").into_iter().next().map(|time| {
            time.value()
                .attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| element_text(time))
        })
    });
    if let Some(date) = date {
        metadata.insert("date".into(), date);
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Gene Editing Advances</title>
  <meta name="description" content="A survey of CRISPR results">
  <meta property="article:author" content="J. Doe">
  <meta property="article:published_time" content="2024-05-01">
  <style>body { color: red; }</style>
  <script>var tracking = true;</script>
</head>
<body>
  <header>Site Header</header>
  <nav><a href="/home">Home</a></nav>
  <h1>CRISPR in 2024</h1>
  <p>Base editing   shows
     promise in trials.</p>
  <table>
    <tr><th>Trial</th><th>Patients</th></tr>
    <tr><td>A</td><td>12</td></tr>
    <tr><td>B</td><td>30</td></tr>
  </table>
  <table><tr><th>Empty</th></tr></table>
  <a href="/papers/one">Paper one</a>
  <a href="https://other.org/two">Paper two</a>
  <a href="mailto:someone@example.org">Mail</a>
  <a href="/files/report.pdf">PDF</a>
  <a href="javascript:void(0)">JS</a>
  <a href="/page#section">Anchor</a>
  <a href="ftp://example.org/data">FTP</a>
  <footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn text_skips_boilerplate_and_collapses_whitespace() {
        let doc = Html::parse_document(ARTICLE);
        let text = extract_text(&doc);
        assert!(text.contains("Base editing shows promise in trials."));
        assert!(text.contains("CRISPR in 2024"));
        assert!(!text.contains("Site Header"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn links_are_absolute_and_filtered() {
        let doc = Html::parse_document(ARTICLE);
        let links = extract_links(&doc, "https://example.org/articles/1", 10);
        assert_eq!(
            links,
            vec![
                "https://example.org/home".to_string(),
                "https://example.org/papers/one".to_string(),
                "https://other.org/two".to_string(),
            ]
        );
    }

    #[test]
    fn links_respect_limit() {
        let doc = Html::parse_document(ARTICLE);
        assert_eq!(extract_links(&doc, "https://example.org/", 1).len(), 1);
        assert!(extract_links(&doc, "not a url", 10).is_empty());
    }

    #[test]
    fn tables_use_first_row_as_headers() {
        let doc = Html::parse_document(ARTICLE);
        let tables = extract_tables(&doc);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["Trial", "Patients"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].column("Patients"), vec!["12", "30"]);
    }

    #[test]
    fn metadata_prefers_title_and_meta_tags() {
        let doc = Html::parse_document(ARTICLE);
        let meta = extract_metadata(&doc);
        assert_eq!(meta["title"], "Gene Editing Advances");
        assert_eq!(meta["description"], "A survey of CRISPR results");
        assert_eq!(meta["author"], "J. Doe");
        assert_eq!(meta["date"], "2024-05-01");
    }

    #[test]
    fn metadata_falls_back_to_h1_and_time() {
        let html = r#"<html><body><h1>Fallback Title</h1>
            <time datetime="2023-02-03">Feb 3</time></body></html>"#;
        let meta = extract_metadata(&Html::parse_document(html));
        assert_eq!(meta["title"], "Fallback Title");
        assert_eq!(meta["date"], "2023-02-03");
        assert!(!meta.contains_key("author"));
    }

    #[test]
    fn extract_page_assembles_everything() {
        let page = extract_page("https://example.org/a", ARTICLE, 2);
        assert_eq!(page.url, "https://example.org/a");
        assert_eq!(page.links.len(), 2);
        assert_eq!(page.tables.len(), 1);
        assert!(page.metadata.contains_key("title"));
    }
}
