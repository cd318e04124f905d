use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Parsed snapshot of one rendered page.
///
/// Extractors only ever read from a snapshot, never from the live tab, so
/// they can be exercised against fixture HTML.
pub struct ListingPage {
    url: String,
    source: String,
    document: Html,
}

impl ListingPage {
    pub fn parse(url: impl Into<String>, html: impl Into<String>) -> Self {
        let source = html.into();
        let document = Html::parse_document(&source);
        Self {
            url: url.into(),
            source,
            document,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// All elements matching a CSS selector; an invalid selector matches nothing
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        self.select_all(css).into_iter().next()
    }

    /// Text of the first element matching any of the selectors, in order
    pub fn first_text(&self, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|css| {
            self.select_first(css)
                .map(|el| element_text(&el))
                .filter(|text| !text.trim().is_empty())
        })
    }

    /// Whole-document visible text, one text node per line
    pub fn body_text(&self) -> String {
        let root = self
            .select_first("body")
            .unwrap_or_else(|| self.document.root_element());
        element_text(&root)
    }

    /// Listing links (`/item/` hrefs) resolved against the page URL,
    /// deduplicated in first-seen order
    pub fn listing_links(&self) -> Vec<String> {
        let base = Url::parse(&self.url).ok();
        let mut links: Vec<String> = Vec::new();

        for anchor in self.select_all(r#"a[href*="/item/"]"#) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let absolute = match &base {
                Some(base) => match base.join(href) {
                    Ok(resolved) => resolved.to_string(),
                    Err(_) => continue,
                },
                None => href.to_string(),
            };
            if !links.contains(&absolute) {
                links.push(absolute);
            }
        }

        links
    }
}

/// Visible text of an element. Text nodes are trimmed and joined with
/// newlines so block structure survives, and `&nbsp;` becomes a space.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(|t| t.replace('\u{a0}', " "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text from an element's direct text children only
pub fn own_text(element: &ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(text.replace('\u{a0}', " ")),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_links_resolved_and_deduplicated() {
        let html = r#"
            <html><body>
                <a href="/item/honda-cbr-1">one</a>
                <a href="https://es.wallapop.com/item/yamaha-mt07-2">two</a>
                <a href="/item/honda-cbr-1">one again</a>
                <a href="/user/other">profile</a>
            </body></html>
        "#;
        let page = ListingPage::parse("https://es.wallapop.com/user/motick-432763398", html);
        assert_eq!(
            page.listing_links(),
            vec![
                "https://es.wallapop.com/item/honda-cbr-1".to_string(),
                "https://es.wallapop.com/item/yamaha-mt07-2".to_string(),
            ]
        );
    }

    #[test]
    fn test_text_helpers() {
        let html = "<html><body><div id=\"d\">12\u{a0}500 <b>km</b>\n</div></body></html>";
        let page = ListingPage::parse("https://example.com", html);
        let div = page.select_first("#d").unwrap();
        assert_eq!(own_text(&div), "12 500");
        assert_eq!(element_text(&div), "12 500\nkm");
        assert!(page.select_all("[[[").is_empty());
    }
}
