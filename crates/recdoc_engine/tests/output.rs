use pretty_assertions::assert_eq;
use recdoc_engine::{
    format_keywords, output_filename, page_name_from_url, render_fields, render_metadata,
    DocumentContext, ExtractedContent, ExtractionOptions, Extractor, Keyword, KeywordParseError,
    StructuralExtractor, PLACEHOLDER_NAMES,
};
use serde_json::json;

fn extract(html: &str) -> ExtractedContent {
    StructuralExtractor.extract(
        html,
        Some("https://shop.example.com/red-shoes"),
        &ExtractionOptions::default(),
    )
}

#[test]
fn filename_carries_page_and_client() {
    assert_eq!(
        output_filename("Red Shoes", None),
        "Red Shoes - Content Recommendations.docx"
    );
    assert_eq!(
        output_filename("Red Shoes", Some("Acme")),
        "Red Shoes - Content Recommendations_Acme.docx"
    );
    assert_eq!(
        output_filename("Red Shoes", Some("  ")),
        "Red Shoes - Content Recommendations.docx"
    );
}

#[test]
fn filename_is_deterministic_and_windows_safe() {
    let name = output_filename("Shoes: 50% off? <Now> / \"today\" & more!", Some("A|B"));
    assert_eq!(name, output_filename("Shoes: 50% off? <Now> / \"today\" & more!", Some("A|B")));
    for forbidden in ['\\', '/', ':', '*', '?', '"', '<', '>', '|', '&', '!'] {
        assert!(!name.contains(forbidden), "{name} contains {forbidden}");
    }
    assert_eq!(name, "Shoes 50% off Now today more - Content Recommendations_AB.docx");
}

#[test]
fn page_name_comes_from_the_last_path_segment() {
    assert_eq!(page_name_from_url("https://example.com/guides/red-shoes/"), "Red Shoes");
    assert_eq!(page_name_from_url("https://example.com/about_us.html"), "About Us");
    assert_eq!(page_name_from_url("https://example.com/"), "Example.com");
    assert_eq!(page_name_from_url("not a url"), "Page");
}

#[test]
fn keywords_sort_by_volume() {
    let keywords: Vec<Keyword> = ["red shoes=1.2k", "shoes=40,000", "cheap shoes=90"]
        .iter()
        .map(|raw| raw.parse().unwrap())
        .collect();
    assert_eq!(
        format_keywords(&keywords),
        "shoes (40000), red shoes (1200), cheap shoes (90)"
    );
}

#[test]
fn keyword_parse_errors_are_specific() {
    assert_eq!(
        "shoes".parse::<Keyword>(),
        Err(KeywordParseError::MissingVolume("shoes".into()))
    );
    assert_eq!("=10".parse::<Keyword>(), Err(KeywordParseError::EmptyTerm));
    assert_eq!(
        "shoes=many".parse::<Keyword>(),
        Err(KeywordParseError::BadVolume("many".into()))
    );
}

#[test]
fn headings_indent_by_level() {
    let content = extract("<h1>Shoes</h1><h2>Red</h2><h3>Sizes</h3><h2>Blue</h2>");
    let fields = render_fields(&content, "https://x.com", &DocumentContext::default());
    assert_eq!(fields.get("headings"), Some("Shoes\n  Red\n    Sizes\n  Blue"));
}

#[test]
fn paragraphs_and_images_render_one_per_entry() {
    let content = extract(
        r#"<p>One</p><p>Two</p><img alt="Red shoe" src="/a.png"><img src="/b.png">"#,
    );
    let plain = render_fields(&content, "https://x.com", &DocumentContext::default());
    assert_eq!(plain.get("paragraphs"), Some("One\n\nTwo"));
    assert_eq!(plain.get("images"), Some("Red shoe\n"));

    let ctx = DocumentContext {
        include_image_sources: true,
        ..DocumentContext::default()
    };
    let with_sources = render_fields(&content, "https://x.com", &ctx);
    assert_eq!(with_sources.get("images"), Some("Red shoe (/a.png)\n (/b.png)"));
}

#[test]
fn body_is_signposted_in_document_order() {
    let content = extract(
        r#"<h1>Shoes</h1><p>Intro</p><img alt="Shoe" src="s.png"><h2>Care</h2><p>Brush</p>"#,
    );
    let ctx = DocumentContext {
        include_image_sources: true,
        ..DocumentContext::default()
    };
    let fields = render_fields(&content, "https://x.com", &ctx);
    assert_eq!(
        fields.get("body"),
        Some("<h1> Shoes\n<p> Intro\n<img alt=\"Shoe\" src=\"s.png\">\n\n<h2> Care\n<p> Brush")
    );
}

#[test]
fn quotes_in_image_attributes_are_escaped() {
    let content = extract(r#"<img alt='The "red" shoe' src='/a"b.png'>"#);
    let ctx = DocumentContext {
        include_image_sources: true,
        ..DocumentContext::default()
    };
    let fields = render_fields(&content, "https://x.com", &ctx);
    assert_eq!(
        fields.get("body"),
        Some(r#"<img alt="The \"red\" shoe" src="/a\"b.png">"#)
    );
}

#[test]
fn page_facts_and_context_are_rendered() {
    let html = r#"<html><head><title>Red Shoes | Shop</title>
        <meta name="description" content="All the red shoes."></head>
        <body><p>No heading here</p></body></html>"#;
    let content = extract(html);
    let ctx = DocumentContext {
        date: "19/10/2026".into(),
        client: "Acme".into(),
        agency: "Agency".into(),
        keywords: vec![Keyword {
            term: "red shoes".into(),
            volume: 10,
        }],
        ..DocumentContext::default()
    };
    let fields = render_fields(&content, "https://shop.example.com/red-shoes", &ctx);
    assert_eq!(fields.get("title"), Some("Red Shoes | Shop"));
    assert_eq!(fields.get("title_length"), Some("16"));
    assert_eq!(fields.get("description"), Some("All the red shoes."));
    assert_eq!(fields.get("description_length"), Some("18"));
    assert_eq!(fields.get("page"), Some("Red Shoes"));
    assert_eq!(fields.get("url"), Some("https://shop.example.com/red-shoes"));
    assert_eq!(fields.get("date"), Some("19/10/2026"));
    assert_eq!(fields.get("client"), Some("Acme"));
    assert_eq!(fields.get("agency"), Some("Agency"));
    assert_eq!(fields.get("keywords"), Some("red shoes (10)"));
}

#[test]
fn every_known_placeholder_is_rendered_even_when_empty() {
    let content = extract("");
    let fields = render_fields(&content, "https://x.com", &DocumentContext::default());
    for name in PLACEHOLDER_NAMES {
        assert!(fields.contains(name), "missing {name}");
    }
    assert_eq!(fields.get("headings"), Some(""));
    assert_eq!(fields.get("metadata"), Some(""));
    assert_eq!(fields.iter().count(), PLACEHOLDER_NAMES.len());
}

#[test]
fn metadata_flattens_to_paths() {
    let value = json!({
        "@type": "Product",
        "offers": {"price": 10, "inStock": true},
        "image": ["a.png", "b.png"]
    });
    assert_eq!(
        render_metadata(&value),
        "@type: Product\nimage[0]: a.png\nimage[1]: b.png\noffers.inStock: true\noffers.price: 10"
    );
}

#[test]
fn metadata_can_be_switched_off() {
    let html = r#"<script type="application/ld+json">{"name": "Shoe"}</script><p>x</p>"#;
    let content = extract(html);
    let on = render_fields(&content, "https://x.com", &DocumentContext::default());
    assert_eq!(on.get("metadata"), Some("name: Shoe"));

    let ctx = DocumentContext {
        include_metadata: false,
        ..DocumentContext::default()
    };
    let off = render_fields(&content, "https://x.com", &ctx);
    assert_eq!(off.get("metadata"), Some(""));
}
