use crate::diff::Change;

/// Text sent when a domain crosses an expiration threshold.
#[must_use]
pub fn threshold(domain: &str, days_left: i64) -> String {
    match days_left {
        1 => format!("`{domain}` expires in 1 day."),
        -1 => format!("`{domain}` expired 1 day ago."),
        n if n < 0 => format!("`{domain}` expired {} days ago.", -n),
        n => format!("`{domain}` expires in {n} days."),
    }
}

/// Text sent when the registry status list of a domain changes.
#[must_use]
pub fn status_changed(domain: &str, changes: &[Change]) -> String {
    let mut msg = format!("`{domain}` status changed:");
    for change in changes {
        msg.push('\n');
        msg.push_str(&change.to_string());
    }
    msg
}
