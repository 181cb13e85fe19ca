//! Publication date parsing for scraped date text.
//!
//! Configured strftime formats are tried first, in order. Localized month
//! and weekday names are translated to English beforehand so chrono's
//! `%B`/`%b`/`%A`/`%a` specifiers can read them. After that, common feed
//! formats are attempted.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::{Captures, Regex};

/// Localized month and weekday names, lowercased and mapped to English.
const FRENCH: &[(&str, &str)] = &[
    ("janvier", "January"),
    ("février", "February"),
    ("fevrier", "February"),
    ("mars", "March"),
    ("avril", "April"),
    ("mai", "May"),
    ("juin", "June"),
    ("juillet", "July"),
    ("août", "August"),
    ("aout", "August"),
    ("septembre", "September"),
    ("octobre", "October"),
    ("novembre", "November"),
    ("décembre", "December"),
    ("decembre", "December"),
    ("janv", "Jan"),
    ("févr", "Feb"),
    ("fevr", "Feb"),
    ("avr", "Apr"),
    ("juil", "Jul"),
    ("sept", "Sep"),
    ("oct", "Oct"),
    ("nov", "Nov"),
    ("déc", "Dec"),
    ("dec", "Dec"),
    ("lundi", "Monday"),
    ("mardi", "Tuesday"),
    ("mercredi", "Wednesday"),
    ("jeudi", "Thursday"),
    ("vendredi", "Friday"),
    ("samedi", "Saturday"),
    ("dimanche", "Sunday"),
];

const GERMAN: &[(&str, &str)] = &[
    ("januar", "January"),
    ("jänner", "January"),
    ("februar", "February"),
    ("märz", "March"),
    ("maerz", "March"),
    ("april", "April"),
    ("mai", "May"),
    ("juni", "June"),
    ("juli", "July"),
    ("august", "August"),
    ("september", "September"),
    ("oktober", "October"),
    ("november", "November"),
    ("dezember", "December"),
    ("jan", "Jan"),
    ("feb", "Feb"),
    ("mär", "Mar"),
    ("apr", "Apr"),
    ("jun", "Jun"),
    ("jul", "Jul"),
    ("aug", "Aug"),
    ("sep", "Sep"),
    ("okt", "Oct"),
    ("nov", "Nov"),
    ("dez", "Dec"),
    ("montag", "Monday"),
    ("dienstag", "Tuesday"),
    ("mittwoch", "Wednesday"),
    ("donnerstag", "Thursday"),
    ("freitag", "Friday"),
    ("samstag", "Saturday"),
    ("sonntag", "Sunday"),
];

const SPANISH: &[(&str, &str)] = &[
    ("enero", "January"),
    ("febrero", "February"),
    ("marzo", "March"),
    ("abril", "April"),
    ("mayo", "May"),
    ("junio", "June"),
    ("julio", "July"),
    ("agosto", "August"),
    ("septiembre", "September"),
    ("setiembre", "September"),
    ("octubre", "October"),
    ("noviembre", "November"),
    ("diciembre", "December"),
    ("ene", "Jan"),
    ("abr", "Apr"),
    ("ago", "Aug"),
    ("dic", "Dec"),
    ("lunes", "Monday"),
    ("martes", "Tuesday"),
    ("miércoles", "Wednesday"),
    ("miercoles", "Wednesday"),
    ("jueves", "Thursday"),
    ("viernes", "Friday"),
    ("sábado", "Saturday"),
    ("sabado", "Saturday"),
    ("domingo", "Sunday"),
];

const ITALIAN: &[(&str, &str)] = &[
    ("gennaio", "January"),
    ("febbraio", "February"),
    ("marzo", "March"),
    ("aprile", "April"),
    ("maggio", "May"),
    ("giugno", "June"),
    ("luglio", "July"),
    ("agosto", "August"),
    ("settembre", "September"),
    ("ottobre", "October"),
    ("novembre", "November"),
    ("dicembre", "December"),
    ("gen", "Jan"),
    ("mag", "May"),
    ("giu", "Jun"),
    ("lug", "Jul"),
    ("ago", "Aug"),
    ("set", "Sep"),
    ("ott", "Oct"),
    ("dic", "Dec"),
    ("lunedì", "Monday"),
    ("lunedi", "Monday"),
    ("martedì", "Tuesday"),
    ("martedi", "Tuesday"),
    ("mercoledì", "Wednesday"),
    ("mercoledi", "Wednesday"),
    ("giovedì", "Thursday"),
    ("giovedi", "Thursday"),
    ("venerdì", "Friday"),
    ("venerdi", "Friday"),
    ("sabato", "Saturday"),
    ("domenica", "Sunday"),
];

const PORTUGUESE: &[(&str, &str)] = &[
    ("janeiro", "January"),
    ("fevereiro", "February"),
    ("março", "March"),
    ("marco", "March"),
    ("abril", "April"),
    ("maio", "May"),
    ("junho", "June"),
    ("julho", "July"),
    ("agosto", "August"),
    ("setembro", "September"),
    ("outubro", "October"),
    ("novembro", "November"),
    ("dezembro", "December"),
    ("fev", "Feb"),
    ("abr", "Apr"),
    ("mai", "May"),
    ("ago", "Aug"),
    ("set", "Sep"),
    ("out", "Oct"),
    ("dez", "Dec"),
    ("segunda-feira", "Monday"),
    ("terça-feira", "Tuesday"),
    ("terca-feira", "Tuesday"),
    ("quarta-feira", "Wednesday"),
    ("quinta-feira", "Thursday"),
    ("sexta-feira", "Friday"),
    ("sábado", "Saturday"),
    ("sabado", "Saturday"),
    ("domingo", "Sunday"),
];

const DUTCH: &[(&str, &str)] = &[
    ("januari", "January"),
    ("februari", "February"),
    ("maart", "March"),
    ("april", "April"),
    ("mei", "May"),
    ("juni", "June"),
    ("juli", "July"),
    ("augustus", "August"),
    ("september", "September"),
    ("oktober", "October"),
    ("november", "November"),
    ("december", "December"),
    ("mrt", "Mar"),
    ("okt", "Oct"),
    ("maandag", "Monday"),
    ("dinsdag", "Tuesday"),
    ("woensdag", "Wednesday"),
    ("donderdag", "Thursday"),
    ("vrijdag", "Friday"),
    ("zaterdag", "Saturday"),
    ("zondag", "Sunday"),
];

fn names_for(locale: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let language: String = locale
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase();

    match language.as_str() {
        "fr" => Some(FRENCH),
        "de" => Some(GERMAN),
        "es" => Some(SPANISH),
        "it" => Some(ITALIAN),
        "pt" => Some(PORTUGUESE),
        "nl" => Some(DUTCH),
        _ => None,
    }
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}]+(?:-[\p{L}]+)?\.?").expect("word pattern"))
}

/// Translate localized month and weekday names to English.
///
/// Whole words only; a trailing abbreviation dot is dropped. Unknown
/// locales leave the text untouched.
pub fn normalize_localized(text: &str, locale: Option<&str>) -> String {
    translate_names(text, locale, false)
}

fn translate_names(text: &str, locale: Option<&str>, keep_dot: bool) -> String {
    let Some(names) = locale.and_then(names_for) else {
        return text.to_string();
    };

    word_re()
        .replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            let bare = word.trim_end_matches('.');
            let dot = if keep_dot && bare.len() < word.len() { "." } else { "" };
            let lowered = bare.to_lowercase();
            names
                .iter()
                .find(|(local, _)| *local == lowered)
                .map(|(_, english)| format!("{}{}", english, dot))
                .unwrap_or_else(|| word.to_string())
        })
        .into_owned()
}

/// Try one strftime format with, then without, a zone.
fn parse_with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Common machine and feed formats, tried when configured formats miss.
pub fn parse_common(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const ZONED: &[&str] = &[
        "%a, %d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    const NAIVE: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d %b %Y %H:%M",
        "%B %d, %Y %H:%M",
    ];
    const DATES: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%A, %B %d, %Y",
        "%A %d %B %Y",
        "%d.%m.%Y",
    ];

    ZONED
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NAIVE
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|| {
            DATES
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

/// Parse scraped date text. First configured format that matches wins.
pub fn parse_date(text: &str, formats: &[String], locale: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let candidate = collapse_spaces(&normalize_localized(text, locale));
    // Formats such as "%d %b. %Y" expect the abbreviation dot.
    let dotted = collapse_spaces(&translate_names(text, locale, true));

    formats
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .find_map(|format| {
            parse_with_format(&candidate, format).or_else(|| {
                if dotted != candidate {
                    parse_with_format(&dotted, format)
                } else {
                    None
                }
            })
        })
        .or_else(|| parse_common(&candidate))
}

/// Parse date text, falling back to the current time.
pub fn published_or_now(
    text: Option<&str>,
    formats: &[String],
    locale: Option<&str>,
) -> DateTime<Utc> {
    text.and_then(|t| {
        let parsed = parse_date(t, formats, locale);
        if parsed.is_none() {
            tracing::debug!(text = t, "unparseable date, using current time");
        }
        parsed
    })
    .unwrap_or_else(Utc::now)
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn formats(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_configured_formats_in_order() {
        // Ambiguous day/month: first format wins.
        let parsed = parse_date("03/04/2024", &formats(&["%d/%m/%Y", "%m/%d/%Y"]), None).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (4, 3));

        let parsed = parse_date("03/04/2024", &formats(&["%m/%d/%Y", "%d/%m/%Y"]), None).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (3, 4));
    }

    #[test]
    fn test_localized_month_names() {
        let parsed = parse_date("12 janvier 2024", &formats(&["%d %B %Y"]), Some("fr_FR")).unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 1, 12));

        let parsed = parse_date("5. März 2023", &formats(&["%d. %B %Y"]), Some("de")).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (3, 5));

        let parsed =
            parse_date("martes, 7 de mayo de 2024", &formats(&["%A, %d de %B de %Y"]), Some("es"))
                .unwrap();
        assert_eq!((parsed.month(), parsed.day()), (5, 7));
    }

    #[test]
    fn test_normalize_ignores_unknown_locale() {
        assert_eq!(normalize_localized("12 janvier 2024", Some("xx")), "12 janvier 2024");
        assert_eq!(normalize_localized("12 janvier 2024", None), "12 janvier 2024");
        assert_eq!(normalize_localized("12 janv. 2024", Some("fr")), "12 Jan 2024");
    }

    #[test]
    fn test_abbreviation_dot_kept_when_format_expects_it() {
        let parsed = parse_date("12 janv. 2024", &formats(&["%d %b. %Y"]), Some("fr")).unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 1, 12));

        let parsed = parse_date("12 janv. 2024", &formats(&["%d %b %Y"]), Some("fr")).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (1, 12));

        assert_eq!(translate_names("12 janv. 2024", Some("fr"), true), "12 Jan. 2024");
    }

    #[test]
    fn test_common_fallbacks() {
        let parsed = parse_date("2024-03-01T10:30:00Z", &[], None).unwrap();
        assert_eq!(parsed.hour(), 10);

        let parsed = parse_date("Thu, 28 Dec 2023 00:00:00 +0000", &[], None).unwrap();
        assert_eq!((parsed.year(), parsed.month()), (2023, 12));

        let parsed = parse_date("March 5, 2024", &[], None).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (3, 5));

        assert!(parse_date("yesterday-ish", &[], None).is_none());
    }

    #[test]
    fn test_published_or_now_falls_back() {
        let before = Utc::now();
        let published = published_or_now(Some("not a date"), &[], None);
        assert!(published >= before);

        let published = published_or_now(None, &[], None);
        assert!(published >= before);
    }
}
