/// Root server, consulted for TLDs missing from the table below.
pub const IANA_SERVER: &str = "whois.iana.org";

/// Returns the registry WHOIS server for a known TLD.
pub fn server_for(tld: &str) -> Option<&'static str> {
    let server = match tld {
        "com" | "net" => "whois.verisign-grs.com",
        "cc" => "ccwhois.verisign-grs.com",
        "tv" => "tvwhois.verisign-grs.com",
        "org" => "whois.publicinterestregistry.org",
        "info" | "mobi" | "pro" => "whois.identity.digital",
        "biz" => "whois.nic.biz",
        "io" => "whois.nic.io",
        "co" => "whois.registry.co",
        "me" => "whois.nic.me",
        "app" | "dev" | "page" => "whois.nic.google",
        "xyz" => "whois.nic.xyz",
        "de" => "whois.denic.de",
        "uk" => "whois.nic.uk",
        "fr" => "whois.nic.fr",
        "nl" => "whois.domain-registry.nl",
        "eu" => "whois.eu",
        "ca" => "whois.cira.ca",
        "au" => "whois.auda.org.au",
        "us" => "whois.nic.us",
        "ch" | "li" => "whois.nic.ch",
        "se" => "whois.iis.se",
        "jp" => "whois.jprs.jp",
        _ => return None,
    };
    Some(server)
}

/// Last label of a normalized domain name.
pub fn tld(domain: &str) -> Option<&str> {
    domain.rsplit_once('.').map(|(_, tld)| tld).filter(|tld| !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tld() {
        assert_eq!(tld("example.com"), Some("com"));
        assert_eq!(tld("example.co.uk"), Some("uk"));
        assert_eq!(tld("example."), None);
        assert_eq!(tld("localhost"), None);
    }

    #[test]
    fn test_known_and_unknown_servers() {
        assert_eq!(server_for("com"), Some("whois.verisign-grs.com"));
        assert_eq!(server_for("dev"), Some("whois.nic.google"));
        assert_eq!(server_for("zz"), None);
    }
}
