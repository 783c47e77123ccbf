use ego_tree::{NodeId, NodeRef};
use recdoc_logging::{engine_debug, engine_warn};
use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::links::resolve_reference;

/// Never walked for content. Structured metadata is read before this applies.
const ALWAYS_SKIP: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Elements whose text joins the surrounding paragraph instead of starting a block.
const INLINE_TAGS: &[&str] = &[
    "a", "span", "strong", "em", "b", "i", "u", "s", "small", "sup", "sub", "mark", "abbr",
    "time", "code", "var", "kbd",
];

const RECOMMENDED_EXCLUDES: &[&str] = &[
    "header",
    "footer",
    "nav",
    ".cookie",
    ".newsletter",
    "[class*='breadcrumb']",
    "[class*='wishlist']",
    "[class*='simplesearch']",
    "[id*='gallery']",
    "[class*='usp']",
    "[class*='feefo']",
    "[class*='associated-blogs']",
    "[class*='popular']",
    "[class*='searchpage-content']",
    ".lmd-map-modal-create.js-lmd-map-modal-map",
];

const RECOMMENDED_NOISE: &[&str] = &[
    "google tag manager",
    "loading results",
    "load more",
    "updating results",
    "something went wrong",
    "apply filters",
    "sort by",
    "to collect end-user usage analytics",
    "place this code immediately before the closing",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionOptions {
    /// CSS selectors whose subtrees are removed before anything is collected.
    pub exclude_selectors: Vec<String>,
    /// Drop everything that precedes the first h1-h6.
    pub strip_before_first_heading: bool,
    /// Append ` (target)` after link text inside paragraphs.
    pub annotate_links: bool,
    /// Case-insensitive substrings that mark a paragraph as UI noise.
    pub noise_phrases: Vec<String>,
}

impl ExtractionOptions {
    /// Site-chrome exclusions and noise phrases that suit typical marketing pages.
    pub fn recommended() -> Self {
        Self {
            exclude_selectors: RECOMMENDED_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            noise_phrases: RECOMMENDED_NOISE.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Always within 1..=6.
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    pub src: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading(Heading),
    Paragraph(String),
    Image(ImageRef),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedContent {
    /// Headings, paragraphs and images in document order.
    pub blocks: Vec<ContentBlock>,
    /// First JSON-LD block of the page, if it parsed.
    pub metadata: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Text of the first surviving h1.
    pub page_name: Option<String>,
}

impl ExtractedContent {
    pub fn headings(&self) -> impl Iterator<Item = &Heading> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::Heading(heading) => Some(heading),
            _ => None,
        })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::Paragraph(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::Image(image) => Some(image),
            _ => None,
        })
    }
}

pub trait Extractor: Send + Sync {
    /// `base_url` resolves relative link targets when links are annotated.
    fn extract(&self, html: &str, base_url: Option<&str>, options: &ExtractionOptions)
        -> ExtractedContent;
}

/// Rule-based extractor over the parsed DOM:
/// - structured metadata, `<title>` and meta description are read from the whole page
/// - excluded subtrees are detached, then (optionally) everything before the first heading
/// - the remaining body is walked in document order into headings, paragraphs and images.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralExtractor;

impl Extractor for StructuralExtractor {
    fn extract(
        &self,
        html: &str,
        base_url: Option<&str>,
        options: &ExtractionOptions,
    ) -> ExtractedContent {
        let mut doc = Html::parse_document(html);
        let metadata = first_structured_metadata(&doc);
        let title = first_text(&doc, "head > title");
        let description = meta_description(&doc);

        remove_excluded(&mut doc, &options.exclude_selectors);

        let mut blocks = Vec::new();
        if let Some(scope) = content_root(&doc) {
            if options.strip_before_first_heading {
                strip_before_first_heading(&mut doc, scope);
            }
            let base = base_url.and_then(|b| Url::parse(b).ok());
            let mut walker = BlockWalker::new(options, base);
            if let Some(root) = doc.tree.get(scope).and_then(ElementRef::wrap) {
                walker.walk_container(root);
            }
            blocks = walker.blocks;
        }

        let page_name = blocks.iter().find_map(|block| match block {
            ContentBlock::Heading(heading) if heading.level == 1 => Some(heading.text.clone()),
            _ => None,
        });
        engine_debug!(
            "extracted {} blocks, metadata: {}",
            blocks.len(),
            metadata.is_some()
        );

        ExtractedContent {
            blocks,
            metadata,
            title,
            description,
            page_name,
        }
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn meta_description(doc: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;
    doc.select(&selector)
        .filter(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .find_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|text| !text.is_empty())
}

/// The first non-empty JSON-LD script wins; if it does not parse there is no metadata.
fn first_structured_metadata(doc: &Html) -> Option<Value> {
    let selector = Selector::parse("script[type]").ok()?;
    let raw = doc
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("type")
                .is_some_and(|t| t.to_ascii_lowercase().contains("ld+json"))
        })
        .map(|el| el.text().collect::<String>())
        .find(|raw| !raw.trim().is_empty())?;

    match serde_json::from_str(raw.trim()) {
        Ok(value) => Some(value),
        Err(err) => {
            engine_warn!("ignoring malformed JSON-LD block: {}", err);
            None
        }
    }
}

fn remove_excluded(doc: &mut Html, selectors: &[String]) {
    let mut doomed: Vec<NodeId> = Vec::new();
    for raw in selectors.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match Selector::parse(raw) {
            Ok(selector) => doomed.extend(doc.select(&selector).map(|el| el.id())),
            Err(err) => engine_warn!("skipping exclude selector {:?}: {:?}", raw, err),
        }
    }
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// `<body>` when it survived exclusion, else the document element.
fn content_root(doc: &Html) -> Option<NodeId> {
    let html = doc.tree.root().children().find(|n| n.value().is_element())?;
    let body = html.children().find(|n| {
        n.value()
            .as_element()
            .is_some_and(|el| el.name() == "body")
    });
    Some(body.unwrap_or(html).id())
}

/// Detaches every preceding sibling of the first heading and of each of its
/// ancestors below `scope`.
fn strip_before_first_heading(doc: &mut Html, scope: NodeId) {
    let Some(root) = doc.tree.get(scope) else {
        return;
    };
    let heading = root.descendants().find(|n| {
        n.value()
            .as_element()
            .is_some_and(|el| heading_level(el.name()).is_some())
    });
    let Some(heading) = heading else {
        return;
    };

    let mut doomed = Vec::new();
    let mut current = Some(heading);
    while let Some(node) = current {
        if node.id() == scope {
            break;
        }
        doomed.extend(node.prev_siblings().map(|sibling| sibling.id()));
        current = node.parent();
    }
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn image_ref(el: &Element) -> ImageRef {
    ImageRef {
        alt: collapse_whitespace(el.attr("alt").unwrap_or_default()),
        src: el
            .attr("src")
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string),
    }
}

/// Text and images gathered from inside one block-level element.
#[derive(Default)]
struct Gathered<'a> {
    text: String,
    images: Vec<ImageRef>,
    nested_lists: Vec<ElementRef<'a>>,
}

/// How inline content below a block is collected.
#[derive(Debug, Clone, Copy)]
struct Gather {
    annotate: bool,
    /// Lists inside a list item are deferred until the item's own text is out.
    defer_lists: bool,
    /// Headings and paragraphs below the block start blocks of their own.
    split_blocks: bool,
}

impl Gather {
    fn heading() -> Self {
        Self {
            annotate: false,
            defer_lists: false,
            split_blocks: false,
        }
    }

    fn text(annotate: bool) -> Self {
        Self {
            annotate,
            defer_lists: false,
            split_blocks: true,
        }
    }

    fn list_item(annotate: bool) -> Self {
        Self {
            defer_lists: true,
            ..Self::text(annotate)
        }
    }
}

fn starts_block(name: &str) -> bool {
    name == "p" || heading_level(name).is_some()
}

fn holds_block(node: NodeRef<'_, Node>) -> bool {
    node.descendants().skip(1).any(|n| {
        n.value()
            .as_element()
            .is_some_and(|el| starts_block(el.name()))
    })
}

struct BlockWalker<'o> {
    options: &'o ExtractionOptions,
    noise: Vec<String>,
    base: Option<Url>,
    blocks: Vec<ContentBlock>,
}

impl<'o> BlockWalker<'o> {
    fn new(options: &'o ExtractionOptions, base: Option<Url>) -> Self {
        let noise = options
            .noise_phrases
            .iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self {
            options,
            noise,
            base,
            blocks: Vec::new(),
        }
    }

    /// Bare text and inline children accumulate into one paragraph that is
    /// flushed at every block boundary.
    fn walk_container(&mut self, element: ElementRef<'_>) {
        let mode = Gather::text(self.options.annotate_links);
        let mut pending = Gathered::default();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => pending.text.push_str(text),
                Node::Element(el) if INLINE_TAGS.contains(&el.name()) => {
                    self.gather_node(child, &mut pending, mode);
                }
                Node::Element(el) if el.name() == "br" => self.flush(&mut pending),
                Node::Element(el) if el.name() == "img" => {
                    self.flush(&mut pending);
                    self.push(ContentBlock::Image(image_ref(el)));
                }
                Node::Element(_) => {
                    self.flush(&mut pending);
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit_element(el);
                    }
                }
                _ => {}
            }
        }
        self.flush(&mut pending);
    }

    fn visit_element(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        if ALWAYS_SKIP.contains(&name) {
            return;
        }
        if let Some(level) = heading_level(name) {
            let mut gathered = Gathered::default();
            self.gather(*el, &mut gathered, Gather::heading());
            let text = collapse_whitespace(&gathered.text);
            if !text.is_empty() {
                self.push(ContentBlock::Heading(Heading { level, text }));
            }
            for image in gathered.images {
                self.push(ContentBlock::Image(image));
            }
            return;
        }
        match name {
            "p" => {
                let mut gathered = Gathered::default();
                self.gather(*el, &mut gathered, Gather::text(self.options.annotate_links));
                self.flush(&mut gathered);
            }
            "ul" | "ol" => {
                for child in el.children().filter_map(ElementRef::wrap) {
                    if child.value().name() == "li" {
                        self.visit_list_item(child);
                    } else {
                        self.visit_element(child);
                    }
                }
            }
            "li" => self.visit_list_item(el),
            "img" => self.push(ContentBlock::Image(image_ref(el.value()))),
            _ => self.walk_container(el),
        }
    }

    /// A list item becomes one paragraph; lists nested inside it follow it.
    fn visit_list_item(&mut self, li: ElementRef<'_>) {
        let mut gathered = Gathered::default();
        self.gather(*li, &mut gathered, Gather::list_item(self.options.annotate_links));
        let nested = std::mem::take(&mut gathered.nested_lists);
        self.flush(&mut gathered);
        for list in nested {
            self.visit_element(list);
        }
    }

    fn gather<'a>(&mut self, node: NodeRef<'a, Node>, out: &mut Gathered<'a>, mode: Gather) {
        for child in node.children() {
            self.gather_node(child, out, mode);
        }
    }

    fn gather_node<'a>(&mut self, node: NodeRef<'a, Node>, out: &mut Gathered<'a>, mode: Gather) {
        match node.value() {
            Node::Text(text) => out.text.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if ALWAYS_SKIP.contains(&name) {
                    return;
                }
                let deferred_list = mode.defer_lists && matches!(name, "ul" | "ol");
                if mode.split_blocks && !deferred_list && (starts_block(name) || holds_block(node))
                {
                    // Text gathered so far ends before the block.
                    self.flush(out);
                    if let Some(block) = ElementRef::wrap(node) {
                        if starts_block(name) {
                            self.visit_element(block);
                        } else {
                            self.walk_container(block);
                        }
                    }
                    return;
                }
                match name {
                    "br" => out.text.push(' '),
                    "img" => out.images.push(image_ref(el)),
                    "ul" | "ol" if deferred_list => {
                        if let Some(list) = ElementRef::wrap(node) {
                            out.nested_lists.push(list);
                        }
                    }
                    "a" => self.gather_anchor(node, el, out, mode),
                    _ if INLINE_TAGS.contains(&name) => self.gather(node, out, mode),
                    _ => {
                        out.text.push(' ');
                        self.gather(node, out, mode);
                        out.text.push(' ');
                    }
                }
            }
            _ => {}
        }
    }

    fn gather_anchor<'a>(
        &mut self,
        node: NodeRef<'a, Node>,
        el: &Element,
        out: &mut Gathered<'a>,
        mode: Gather,
    ) {
        let mut inner = Gathered::default();
        self.gather(node, &mut inner, Gather { annotate: false, ..mode });
        out.text.push_str(&collapse_whitespace(&inner.text));
        out.images.extend(inner.images);
        out.nested_lists.extend(inner.nested_lists);

        if !mode.annotate {
            return;
        }
        if let Some(target) = el
            .attr("href")
            .and_then(|href| resolve_reference(href, self.base.as_ref()))
        {
            out.text.push_str(" (");
            out.text.push_str(&target);
            out.text.push(')');
        }
    }

    /// Emits pending text and images; deferred lists stay with the caller.
    fn flush(&mut self, pending: &mut Gathered<'_>) {
        let text = std::mem::take(&mut pending.text);
        self.push_paragraph(&text);
        for image in std::mem::take(&mut pending.images) {
            self.push(ContentBlock::Image(image));
        }
    }

    fn push_paragraph(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return;
        }
        let lower = text.to_lowercase();
        if self.noise.iter().any(|phrase| lower.contains(phrase.as_str())) {
            engine_debug!("dropping noise paragraph: {}", text);
            return;
        }
        self.push(ContentBlock::Paragraph(text));
    }

    /// Adjacent duplicates collapse into one block.
    fn push(&mut self, block: ContentBlock) {
        if self.blocks.last() != Some(&block) {
            self.blocks.push(block);
        }
    }
}
