use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Pure markdown to safe HTML conversion.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Markdown renderer that never lets author-supplied HTML or script URLs
/// through. Headings get slug ids.
#[derive(Debug, Clone, Default)]
pub struct SanitizingRenderer;

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:", "file:"];

impl SanitizingRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for SanitizingRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, Self::options())
            .map(sanitize_event)
            .collect();

        assign_heading_ids(&mut events);

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        // Raw HTML is shown, not interpreted
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut index = 0;

    while index < events.len() {
        let is_unlabelled_heading = matches!(
            &events[index],
            Event::Start(Tag::Heading { id: None, .. })
        );
        if !is_unlabelled_heading {
            index += 1;
            continue;
        }

        let mut text = String::new();
        for event in &events[index + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
        }

        let base = slugify(&text);
        if !base.is_empty() {
            let mut slug = base.clone();
            let mut suffix = 1;
            while seen.contains(&slug) {
                slug = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            seen.insert(slug.clone());

            if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
                *id = Some(CowStr::from(slug));
            }
        }
        index += 1;
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Markdown paired with the HTML a renderer produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    markdown: String,
    html: String,
}

impl RenderedContent {
    pub fn new(renderer: &dyn MarkdownRenderer, markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let html = renderer.render(&markdown);
        Self { markdown, html }
    }

    pub fn into_parts(self) -> (String, String) {
        (self.markdown, self.html)
    }
}
