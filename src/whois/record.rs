use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

static REGISTRAR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(?im)^\s*Registrar:[ \t]*(.+)$",
        r"(?im)^\s*Registrar Name:[ \t]*(.+)$",
        r"(?im)^\s*Sponsoring Registrar:[ \t]*(.+)$",
    ])
});

static EXPIRATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(?im)^\s*Registry Expiry Date:[ \t]*(.+)$",
        r"(?im)^\s*Registrar Registration Expiration Date:[ \t]*(.+)$",
        r"(?im)^\s*Expir(?:y|ation) Date:[ \t]*(.+)$",
        r"(?im)^\s*Expires On:[ \t]*(.+)$",
        r"(?im)^\s*Expires:[ \t]*(.+)$",
        r"(?im)^\s*paid-till:[ \t]*(.+)$",
    ])
});

static STATUS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(?im)^\s*Domain Status:[ \t]*(.+)$",
        r"(?im)^\s*Status:[ \t]*(.+)$",
        r"(?im)^\s*state:[ \t]*(.+)$",
    ])
});

static NAMESERVER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(?im)^\s*Name Server:[ \t]*(.+)$",
        r"(?im)^\s*nserver:[ \t]*(.+)$",
    ])
});

static REFERRAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"(?im)^\s*Registrar WHOIS Server:[ \t]*(.+)$",
        r"(?im)^\s*refer:[ \t]*(.+)$",
        r"(?im)^\s*whois:[ \t]*(.+)$",
    ])
});

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// Parsed registration data for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub domain: String,
    pub registrar: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Status codes in response order, without their ICANN reference URLs.
    pub status: Vec<String>,
    pub nameservers: Vec<String>,
    pub whois_server: String,
}

impl RegistrationRecord {
    /// Parses a raw WHOIS response. Unknown or garbled fields are left empty.
    #[must_use]
    pub fn parse(domain: &str, whois_server: &str, raw: &str) -> Self {
        Self {
            domain: domain.to_string(),
            registrar: first_match(&REGISTRAR, raw),
            expiration_date: first_match(&EXPIRATION, raw).and_then(|s| parse_date(&s)),
            status: all_matches(&STATUS, raw, |s| {
                s.split_whitespace().next().unwrap_or_default().to_string()
            }),
            nameservers: all_matches(&NAMESERVER, raw, |s| s.trim().to_lowercase()),
            whois_server: whois_server.to_string(),
        }
    }
}

/// Extracts the WHOIS server a response refers to, if any.
pub(crate) fn referral(raw: &str) -> Option<String> {
    first_match(&REFERRAL, raw)
        .map(|server| {
            let server = server.to_lowercase();
            server
                .strip_prefix("whois://")
                .unwrap_or(&server)
                .trim_end_matches('/')
                .to_string()
        })
        .filter(|server| server.contains('.'))
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("redacted"))
    })
}

fn all_matches(patterns: &[Regex], text: &str, clean: impl Fn(&str) -> String) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let value = clean(m.as_str());
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
        // Fall through to looser patterns only when the stricter ones found nothing
        if !values.is_empty() {
            break;
        }
    }
    values
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d-%b-%Y", "%d-%B-%Y", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y",
        "%b %d %Y",
    ];

    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = value
        .trim_end_matches(" UTC")
        .trim_end_matches(" (UTC)")
        .trim_end_matches(" +0000")
        .trim_end_matches('Z');

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc())
}
