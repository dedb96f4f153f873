use std::collections::BTreeMap;

use crate::browser::{selectors, Renderer};
use crate::crawler::record::{Link, Metadata, HEADING_LEVELS};
use crate::crawler::url::{normalize, resolve};
use crate::error::RenderError;

/// Everything derived from one rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub metadata: Metadata,
    pub links: Vec<Link>,
    pub content_text: String,
    pub content_html: String,
}

/// Read the renderer's current DOM into structured form.
///
/// `base_domain` is the seed's `host[:port]`; links are internal only when
/// their host matches it exactly. Reads renderer state only.
pub async fn extract<R: Renderer>(
    renderer: &R,
    base_domain: &str,
    current_url: &str,
) -> Result<Extraction, RenderError> {
    let links = extract_links(renderer, base_domain, current_url).await?;
    let metadata = extract_metadata(renderer).await?;

    let content_text = match renderer.query_elements(selectors::BODY).await?.first() {
        Some(body) => renderer.element_text(body).await?.trim().to_string(),
        None => String::new(),
    };
    let content_html = renderer.serialized_markup().await?;

    Ok(Extraction {
        metadata,
        links,
        content_text,
        content_html,
    })
}

pub async fn extract_metadata<R: Renderer>(renderer: &R) -> Result<Metadata, RenderError> {
    let title = renderer.current_title().await?;

    let mut meta_tags = BTreeMap::new();
    for meta in renderer.query_elements(selectors::META).await? {
        let content = match renderer.element_attribute(&meta, "content").await? {
            Some(content) if !content.is_empty() => content,
            _ => continue,
        };

        let name = match renderer.element_attribute(&meta, "name").await? {
            Some(name) if !name.is_empty() => Some(name),
            _ => renderer
                .element_attribute(&meta, "property")
                .await?
                .filter(|property| !property.is_empty()),
        };

        if let Some(name) = name {
            meta_tags.insert(name, content);
        }
    }

    let mut headers = BTreeMap::new();
    for level in HEADING_LEVELS {
        let mut texts = Vec::new();
        for heading in renderer.query_elements(level).await? {
            let text = renderer.element_text(&heading).await?;
            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }
        }
        headers.insert(level.to_string(), texts);
    }

    Ok(Metadata {
        title,
        meta_tags,
        headers,
    })
}

pub async fn extract_links<R: Renderer>(
    renderer: &R,
    base_domain: &str,
    current_url: &str,
) -> Result<Vec<Link>, RenderError> {
    let mut links = Vec::new();

    for anchor in renderer.query_elements(selectors::ANCHOR).await? {
        let Some(href) = renderer.element_attribute(&anchor, "href").await? else {
            continue;
        };

        let url = normalize(&resolve(current_url, &href));
        let is_internal = url.host_key().as_deref() == Some(base_domain);
        let anchor_text = renderer.element_text(&anchor).await?.trim().to_string();

        links.push(Link {
            url,
            anchor_text,
            is_internal,
        });
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakeRenderer;
    use std::time::Duration;

    const HOME: &str = r#"<html>
        <head>
            <title>Example</title>
            <meta name="description" content="An example site">
            <meta property="og:title" content="Example OG">
            <meta name="robots">
            <meta content="orphan content">
            <meta name="empty" content="">
            <meta charset="utf-8">
        </head>
        <body>
            <h1> Welcome </h1>
            <h2>First</h2>
            <h2>   </h2>
            <h2>Second</h2>
            <a href="/about">About</a>
            <a href="https://other.com/x?utm=1">Elsewhere</a>
            <a name="anchor-without-href">Nowhere</a>
            <a href="contact#form"> Contact </a>
            <a href="https://blog.example.com/">Blog</a>
        </body>
    </html>"#;

    async fn loaded(url: &str, html: &str) -> FakeRenderer {
        let mut renderer = FakeRenderer::new().page(url, html);
        renderer.navigate(url).await.unwrap();
        renderer.wait_until_loaded(Duration::from_secs(1)).await.unwrap();
        renderer
    }

    #[tokio::test]
    async fn test_metadata() {
        let renderer = loaded("https://example.com/", HOME).await;
        let metadata = extract_metadata(&renderer).await.unwrap();

        assert_eq!(metadata.title, "Example");
        assert_eq!(metadata.meta_tags.len(), 2);
        assert_eq!(metadata.meta_tags["description"], "An example site");
        assert_eq!(metadata.meta_tags["og:title"], "Example OG");

        assert_eq!(metadata.headers["h1"], vec!["Welcome"]);
        assert_eq!(metadata.headers["h2"], vec!["First", "Second"]);
        assert!(metadata.headers["h6"].is_empty());
        assert_eq!(metadata.headers.len(), 6);
    }

    #[tokio::test]
    async fn test_link_classification() {
        let renderer = loaded("https://example.com/", HOME).await;
        let links = extract_links(&renderer, "example.com", "https://example.com/")
            .await
            .unwrap();

        let summary: Vec<(&str, &str, bool)> = links
            .iter()
            .map(|link| (link.url.as_str(), link.anchor_text.as_str(), link.is_internal))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("https://example.com/about", "About", true),
                ("https://other.com/x", "Elsewhere", false),
                ("https://example.com/contact", "Contact", true),
                ("https://blog.example.com/", "Blog", false),
            ]
        );
    }

    #[tokio::test]
    async fn test_extraction_is_deterministic() {
        let renderer = loaded("https://example.com/", HOME).await;

        let first = extract(&renderer, "example.com", "https://example.com/").await.unwrap();
        let second = extract(&renderer, "example.com", "https://example.com/").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.content_html, HOME);
        assert!(first.content_text.starts_with("Welcome First Second About"));
    }

    #[tokio::test]
    async fn test_unloaded_page_fails() {
        let renderer = FakeRenderer::new();
        assert!(extract(&renderer, "example.com", "https://example.com/").await.is_err());
    }
}
