// Text normalization for scraped Hungarian catalog listings.
// Everything here is a pure function of its input; the parsers and the
// matching engine both build on these.

/// Collapse all whitespace runs to single spaces and trim.
pub fn sanitize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased, diacritic-insensitive comparison key: non-alphanumeric runs
/// collapse to single spaces. `"A keresztapa"` and `"a-keresztapa"` produce
/// the same key.
pub fn comparison_key(value: &str) -> String {
    let folded: String = value
        .to_lowercase()
        .chars()
        .map(|c| {
            let c = fold_diacritic(c);
            if c.is_alphanumeric() { c } else { ' ' }
        })
        .collect();
    sanitize(&folded)
}

/// Map accented Latin letters to their base letter. Covers the Hungarian
/// alphabet plus the common Latin-1 accents that show up in imported titles.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'ő' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ű' => 'u',
        'ý' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        'ß' => 's',
        _ => c,
    }
}

/// Strip listing-page noise from a title: a leading rank number ("88 Marty
/// Supreme"), a leading percentage score ("97% ..."), a leading NA / N/A
/// rating placeholder, and a trailing parenthesized year.
pub fn strip_title_noise(value: &str) -> String {
    let mut text = sanitize(value);

    for prefix in ["NA ", "N/A "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.to_string();
            break;
        }
    }

    if let Some((head, rest)) = text.split_once(' ') {
        let digits = head.strip_suffix('%').unwrap_or(head);
        let is_rank = !digits.is_empty()
            && digits.len() <= 3
            && digits.chars().all(|c| c.is_ascii_digit());
        if is_rank && rest.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            text = rest.to_string();
        }
    }

    if let Some(idx) = text.rfind(" (") {
        let tail = &text[idx + 2..];
        if let Some(year) = tail.strip_suffix(')') {
            if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
                text.truncate(idx);
            }
        }
    }

    text.trim().to_string()
}

/// First plausible release year in the text: a standalone 4-digit run in
/// 1880..=2100.
pub fn extract_year(value: &str) -> Option<i32> {
    let mut run = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            run.push(c);
            let next_is_digit = chars.peek().is_some_and(|n| n.is_ascii_digit());
            if !next_is_digit {
                if run.len() == 4 {
                    if let Ok(year) = run.parse::<i32>() {
                        if (1880..=2100).contains(&year) {
                            return Some(year);
                        }
                    }
                }
                run.clear();
            }
        } else {
            run.clear();
        }
    }
    None
}

/// Build a human-readable title from the detail URL's slug segment:
/// `/movies/a-keresztapa-2551.html` → `"A Keresztapa"`. The trailing numeric
/// id token is dropped; a slug with no letters at all yields `""` (such a
/// record survives only if anchor text supplies a title).
pub fn title_from_slug(detail_url: &str) -> String {
    let segment = detail_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    let segment = segment.split(['?', '#']).next().unwrap_or(segment);
    let segment = segment.strip_suffix(".html").unwrap_or(segment);

    let mut words: Vec<&str> = segment.split('-').filter(|w| !w.is_empty()).collect();
    if words
        .last()
        .is_some_and(|w| w.chars().all(|c| c.is_ascii_digit()))
    {
        words.pop();
    }
    if !words
        .iter()
        .any(|w| w.chars().any(|c| c.is_alphabetic()))
    {
        return String::new();
    }

    words
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
