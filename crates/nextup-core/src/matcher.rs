//! Resolve a media-server series title to a library series.
//!
//! Media servers and library managers rarely agree on titles exactly: one
//! carries a year suffix, the other a leading article. Matching is tried from
//! strictest to loosest and the first hit wins.

use crate::types::SeriesSummary;

pub fn match_series<'a>(title: &str, library: &'a [SeriesSummary]) -> Option<&'a SeriesSummary> {
    let wanted = title.trim();
    if wanted.is_empty() {
        return None;
    }

    if let Some(hit) = library.iter().find(|s| s.title.eq_ignore_ascii_case(wanted)) {
        return Some(hit);
    }

    let bare = strip_year(wanted);
    if let Some(hit) = library
        .iter()
        .find(|s| strip_year(&s.title).eq_ignore_ascii_case(bare))
    {
        return Some(hit);
    }

    let loose = loosen(bare);
    library.iter().find(|s| loosen(strip_year(&s.title)) == loose)
}

/// "Doctor Who (2005)" -> "Doctor Who"
fn strip_year(title: &str) -> &str {
    match title.find('(') {
        Some(idx) if idx > 0 => title[..idx].trim_end(),
        _ => title,
    }
}

/// Lowercase, drop a leading "the " and every non-alphanumeric character.
fn loosen(title: &str) -> String {
    let lower = title.to_lowercase();
    let without_article = lower.strip_prefix("the ").unwrap_or(&lower);
    without_article
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Vec<SeriesSummary> {
        [
            (1, "Doctor Who (2005)"),
            (2, "Doctor Who"),
            (3, "The Office (US)"),
            (4, "Marvel's Agents of S.H.I.E.L.D."),
            (5, "Severance"),
        ]
        .into_iter()
        .map(|(id, title)| SeriesSummary {
            id,
            title: title.to_string(),
            tags: Vec::new(),
        })
        .collect()
    }

    #[test]
    fn exact_match_wins_over_year_stripped() {
        let lib = library();
        assert_eq!(match_series("Doctor Who", &lib).unwrap().id, 2);
        assert_eq!(match_series("doctor who (2005)", &lib).unwrap().id, 1);
    }

    #[test]
    fn year_suffix_is_ignored() {
        let lib = library();
        assert_eq!(match_series("Severance (2022)", &lib).unwrap().id, 5);
        assert_eq!(match_series("The Office", &lib).unwrap().id, 3);
    }

    #[test]
    fn loose_match_ignores_article_and_punctuation() {
        let lib = library();
        assert_eq!(match_series("Office", &lib).unwrap().id, 3);
        assert_eq!(
            match_series("Marvels Agents of SHIELD", &lib).unwrap().id,
            4
        );
    }

    #[test]
    fn unknown_or_blank_title_is_none() {
        let lib = library();
        assert!(match_series("Andor", &lib).is_none());
        assert!(match_series("   ", &lib).is_none());
    }
}
