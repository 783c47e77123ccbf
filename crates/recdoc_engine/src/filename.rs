use url::Url;

/// Applied to the page name and the client separately, so the suffix always survives.
const MAX_PART_CHARS: usize = 120;
const SUFFIX: &str = " - Content Recommendations";

/// `{page} - Content Recommendations[_{client}].docx`, safe to create on Windows.
pub fn output_filename(page_name: &str, client: Option<&str>) -> String {
    let mut stem = sanitize_stem(page_name);
    stem.push_str(SUFFIX);
    if let Some(client) = client.map(clean_part).filter(|c| !c.is_empty()) {
        stem.push('_');
        stem.push_str(&client);
    }
    format!("{stem}.docx")
}

/// Title-cased last path segment, e.g. `/guides/red-shoes/` becomes `Red Shoes`.
/// Falls back to the host, then to `Page`.
pub fn page_name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return "Page".to_string();
    };
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.to_string());
    let raw = match segment {
        Some(segment) => {
            let without_ext = segment
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .filter(|stem| !stem.is_empty())
                .unwrap_or(segment);
            without_ext.replace(['-', '_'], " ")
        }
        None => parsed.host_str().unwrap_or_default().to_string(),
    };
    let titled = title_case(&raw);
    if titled.is_empty() {
        "Page".to_string()
    } else {
        titled
    }
}

fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_part(input: &str) -> String {
    let cleaned: String = input.chars().filter(|c| !is_forbidden(*c)).collect();
    let name = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = name.chars().take(MAX_PART_CHARS).collect();
    capped.trim_end_matches(['.', ' ']).to_string()
}

fn sanitize_stem(input: &str) -> String {
    let mut name = clean_part(input);
    if name.is_empty() {
        name = "document".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ',' | '£' | '#' | '@' | '!'
            | '^' | '&' | '+' | '=' | '(' | ')' | '[' | ']' | '{' | '}' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::{output_filename, sanitize_stem};

    #[test]
    fn reserved_names_get_a_suffix() {
        assert_eq!(sanitize_stem("con"), "con_");
    }

    #[test]
    fn empty_after_cleaning_falls_back() {
        assert_eq!(sanitize_stem("<>?*"), "document");
    }

    #[test]
    fn long_names_are_cut_on_char_boundaries() {
        let long = "é".repeat(300);
        assert_eq!(sanitize_stem(&long).chars().count(), 120);
    }

    #[test]
    fn long_page_names_keep_the_suffix_and_client() {
        let name = output_filename(&"Word ".repeat(40), Some("Acme"));
        assert!(name.ends_with(" - Content Recommendations_Acme.docx"), "{name}");
        let page = name.trim_end_matches(" - Content Recommendations_Acme.docx");
        assert_eq!(page.chars().count(), 119);
        assert!(page.starts_with("Word Word"));
    }
}
