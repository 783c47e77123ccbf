use pretty_assertions::assert_eq;
use recdoc_engine::{
    ContentBlock, ExtractedContent, ExtractionOptions, Extractor, Heading, ImageRef,
    StructuralExtractor,
};
use serde_json::json;

fn run(html: &str, options: &ExtractionOptions) -> ExtractedContent {
    StructuralExtractor.extract(html, Some("https://example.com/shop/"), options)
}

fn heading(level: u8, text: &str) -> ContentBlock {
    ContentBlock::Heading(Heading {
        level,
        text: text.to_string(),
    })
}

fn para(text: &str) -> ContentBlock {
    ContentBlock::Paragraph(text.to_string())
}

#[test]
fn annotated_link_lands_after_its_text() {
    let options = ExtractionOptions {
        annotate_links: true,
        ..ExtractionOptions::default()
    };
    let content = run(
        r#"<h1>Title</h1><p>Hello <a href="https://x.com">world</a></p>"#,
        &options,
    );
    assert_eq!(
        content.blocks,
        vec![heading(1, "Title"), para("Hello world (https://x.com)")]
    );
    assert_eq!(content.page_name.as_deref(), Some("Title"));
}

#[test]
fn links_are_plain_text_without_annotation() {
    let content = run(
        r#"<p>See <a href="/about">our   story</a>.</p>"#,
        &ExtractionOptions::default(),
    );
    assert_eq!(content.blocks, vec![para("See our story.")]);
}

#[test]
fn relative_links_resolve_against_the_page() {
    let options = ExtractionOptions {
        annotate_links: true,
        ..ExtractionOptions::default()
    };
    let content = run(
        r##"<p><a href="boots">Boots</a> and <a href="#top">top</a></p>"##,
        &options,
    );
    assert_eq!(
        content.blocks,
        vec![para("Boots (https://example.com/shop/boots) and top")]
    );
}

#[test]
fn headings_keep_document_order_and_levels() {
    let html = r#"
        <h2>Second level first</h2>
        <section><h1>Main</h1><div><h6>Deep</h6></div></section>
        <h3>  Spaced
             out </h3>"#;
    let content = run(html, &ExtractionOptions::default());
    let headings: Vec<(u8, &str)> = content
        .headings()
        .map(|h| (h.level, h.text.as_str()))
        .collect();
    assert_eq!(
        headings,
        vec![
            (2, "Second level first"),
            (1, "Main"),
            (6, "Deep"),
            (3, "Spaced out")
        ]
    );
    assert!(content.headings().all(|h| (1..=6).contains(&h.level)));
}

#[test]
fn excluding_the_body_yields_nothing() {
    let options = ExtractionOptions {
        exclude_selectors: vec!["body".to_string()],
        ..ExtractionOptions::default()
    };
    let content = run(
        r#"<h1>Gone</h1><p>Also gone</p><img alt="x" src="x.png">"#,
        &options,
    );
    assert_eq!(content.headings().count(), 0);
    assert_eq!(content.paragraphs().count(), 0);
    assert_eq!(content.images().count(), 0);
}

#[test]
fn excluded_regions_contribute_nothing() {
    let options = ExtractionOptions {
        exclude_selectors: vec!["nav".to_string(), ".promo".to_string()],
        ..ExtractionOptions::default()
    };
    let html = r#"
        <nav><h2>Menu</h2><p>Home</p></nav>
        <div class="promo"><p>50% off</p><img alt="banner"></div>
        <h1>Shoes</h1><p>Real content</p>"#;
    let content = run(html, &options);
    assert_eq!(content.blocks, vec![heading(1, "Shoes"), para("Real content")]);
}

#[test]
fn invalid_selectors_are_skipped() {
    let options = ExtractionOptions {
        exclude_selectors: vec!["[[[".to_string(), "aside".to_string()],
        ..ExtractionOptions::default()
    };
    let content = run("<aside><p>side</p></aside><p>main</p>", &options);
    assert_eq!(content.blocks, vec![para("main")]);
}

#[test]
fn strip_without_headings_is_a_no_op() {
    let html = "<p>One</p><div><p>Two</p></div>";
    let stripped = run(
        html,
        &ExtractionOptions {
            strip_before_first_heading: true,
            ..ExtractionOptions::default()
        },
    );
    assert_eq!(stripped, run(html, &ExtractionOptions::default()));
    assert_eq!(stripped.blocks, vec![para("One"), para("Two")]);
}

#[test]
fn strip_drops_everything_before_the_first_heading() {
    let html = r#"
        <p>Cookie banner</p>
        <main>
          <div class="crumbs"><p>Home / Shoes</p></div>
          <article><img alt="hero"><h2>Red shoes</h2><p>Body</p></article>
          <p>After</p>
        </main>"#;
    let options = ExtractionOptions {
        strip_before_first_heading: true,
        ..ExtractionOptions::default()
    };
    let content = run(html, &options);
    assert_eq!(
        content.blocks,
        vec![heading(2, "Red shoes"), para("Body"), para("After")]
    );
}

#[test]
fn strip_targets_the_first_surviving_heading() {
    let html = r#"<header><h1>Site name</h1></header><p>Intro</p><h1>Article</h1><p>Text</p>"#;
    let options = ExtractionOptions {
        exclude_selectors: vec!["header".to_string()],
        strip_before_first_heading: true,
        ..ExtractionOptions::default()
    };
    let content = run(html, &options);
    assert_eq!(content.blocks, vec![heading(1, "Article"), para("Text")]);
}

#[test]
fn extraction_is_idempotent() {
    let html = r#"<h1>A</h1><p>B <a href="c">c</a></p><ul><li>x</li></ul>
        <script type="application/ld+json">{"a": 1}</script>"#;
    let options = ExtractionOptions {
        annotate_links: true,
        strip_before_first_heading: true,
        ..ExtractionOptions::recommended()
    };
    assert_eq!(run(html, &options), run(html, &options));
}

#[test]
fn images_carry_alt_and_optional_source() {
    let html = r#"<p>Look <img src="/a.png" alt=" A  shoe "> here</p><img alt="No source">"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(
        content.blocks,
        vec![
            para("Look here"),
            ContentBlock::Image(ImageRef {
                alt: "A shoe".to_string(),
                src: Some("/a.png".to_string()),
            }),
            ContentBlock::Image(ImageRef {
                alt: "No source".to_string(),
                src: None,
            }),
        ]
    );
}

#[test]
fn empty_elements_contribute_nothing() {
    let content = run("<h2>  </h2><p> \n </p><div></div><p>Kept</p>", &ExtractionOptions::default());
    assert_eq!(content.blocks, vec![para("Kept")]);
}

#[test]
fn list_items_become_paragraphs_with_nested_lists_after() {
    let html = r#"<ul><li>Sizes<ul><li>Small</li><li>Large</li></ul></li><li>Colours</li></ul>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(
        content.blocks,
        vec![para("Sizes"), para("Small"), para("Large"), para("Colours")]
    );
}

#[test]
fn loose_text_in_containers_becomes_paragraphs() {
    let html = r#"<div>Free <strong>text</strong><br>Next line<div>Inner block</div>tail</div>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(
        content.blocks,
        vec![
            para("Free text"),
            para("Next line"),
            para("Inner block"),
            para("tail")
        ]
    );
}

#[test]
fn scripts_styles_and_duplicates_are_dropped() {
    let html = r#"<style>p{}</style><p>Same</p><p>Same</p><script>var x;</script><noscript>JS</noscript>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(content.blocks, vec![para("Same")]);
}

#[test]
fn noise_phrases_drop_matching_paragraphs() {
    let html = "<p>Load more</p><p>Sort by price</p><p>Real copy</p>";
    let content = run(html, &ExtractionOptions::recommended());
    assert_eq!(content.blocks, vec![para("Real copy")]);
}

#[test]
fn recommended_options_remove_site_chrome() {
    let html = r#"<header><p>Logo</p></header><nav><p>Menu</p></nav>
        <div class="page-breadcrumbs"><p>Home</p></div>
        <h1>Shoes</h1><footer><p>Copyright</p></footer>"#;
    let content = run(html, &ExtractionOptions::recommended());
    assert_eq!(content.blocks, vec![heading(1, "Shoes")]);
}

#[test]
fn first_metadata_block_wins() {
    let html = r#"<html><head>
        <script type="application/ld+json">{"@type": "Product", "name": "Shoe"}</script>
        <script type="application/ld+json">{"@type": "Organization"}</script>
        </head><body><p>x</p></body></html>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(
        content.metadata,
        Some(json!({"@type": "Product", "name": "Shoe"}))
    );
}

#[test]
fn malformed_metadata_is_omitted_without_failing() {
    let html = r#"<script type="application/ld+json">{"broken": </script>
        <script type="application/ld+json">{"ok": true}</script><p>Still here</p>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(content.metadata, None);
    assert_eq!(content.blocks, vec![para("Still here")]);
}

#[test]
fn metadata_is_read_before_exclusions() {
    let html = r#"<footer><script type="application/ld+json">{"a": 1}</script></footer><p>x</p>"#;
    let options = ExtractionOptions {
        exclude_selectors: vec!["footer".to_string()],
        ..ExtractionOptions::default()
    };
    let content = run(html, &options);
    assert_eq!(content.metadata, Some(json!({"a": 1})));
}

#[test]
fn title_and_description_are_collected() {
    let html = r#"<html><head><title> Red
        Shoes </title><meta name="Description" content=" Buy red shoes. "></head><body></body></html>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(content.title.as_deref(), Some("Red Shoes"));
    assert_eq!(content.description.as_deref(), Some("Buy red shoes."));
    assert_eq!(content.page_name, None);
    assert!(content.blocks.is_empty());
}

#[test]
fn headings_wrapped_in_links_and_list_items_stay_headings() {
    let html = r#"<h1>Top</h1><div><a href="/a"><h2>Card</h2></a></div><ul><li><h3>Item head</h3></li></ul>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(
        content.blocks,
        vec![heading(1, "Top"), heading(2, "Card"), heading(3, "Item head")]
    );
}

#[test]
fn text_around_a_nested_heading_keeps_its_order() {
    let options = ExtractionOptions {
        annotate_links: true,
        ..ExtractionOptions::default()
    };
    let html = r#"<ul><li>Intro <a href="/deal"><h3>Deal</h3><span>Save 10%</span></a> after</li></ul>"#;
    let content = run(html, &options);
    assert_eq!(
        content.blocks,
        vec![
            para("Intro"),
            heading(3, "Deal"),
            para("Save 10%"),
            para("after")
        ]
    );
}

#[test]
fn svg_titles_are_not_the_page_title() {
    let html = r#"<html><head></head><body><svg><title>Icon</title></svg><p>Body</p></body></html>"#;
    let content = run(html, &ExtractionOptions::default());
    assert_eq!(content.title, None);
}
