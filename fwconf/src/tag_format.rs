// Longest first, so `IPSec` wins over `IP`.
const ACRONYMS: &[&str] = &["IPSec", "HTTPS", "FQDN", "DHCP", "VLAN", "VPN", "MAC", "DNS", "IP"];

/// Turn a PascalCase or acronym-heavy tag into a display label.
///
/// `IPHost` becomes `IP Host`, `VPNIPSecConnection` becomes
/// `VPN IPSec Connection`. Underscores and hyphens become spaces. Never empty
/// for a non-empty tag.
pub fn format_tag_name(tag: &str) -> String {
    let chars: Vec<char> = tag.chars().collect();
    let mut out = String::with_capacity(tag.len() + 4);
    let mut after_acronym = false;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        if ch == '_' || ch == '-' {
            push_break(&mut out);
            after_acronym = false;
            idx += 1;
            continue;
        }

        let prev = idx.checked_sub(1).map(|p| chars[p]);
        let at_boundary =
            prev.map_or(true, |p| p.is_lowercase() || p.is_ascii_digit() || p == '_' || p == '-');
        if ch.is_uppercase() && (at_boundary || after_acronym) {
            if let Some(acronym) = acronym_at(&chars[idx..]) {
                push_break(&mut out);
                out.push_str(acronym);
                after_acronym = true;
                idx += acronym.chars().count();
                continue;
            }
        }

        if let Some(prev) = prev {
            // Two lowercase letters follow: `Trunk` in `SIPTrunk`, but not `v4` in `IPv4`.
            let starts_word = chars.get(idx + 1).is_some_and(|c| c.is_lowercase())
                && chars.get(idx + 2).is_some_and(|c| c.is_lowercase());
            let breaks = after_acronym
                || prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && starts_word);
            if ch.is_uppercase() && breaks {
                push_break(&mut out);
            }
        }
        out.push(ch);
        after_acronym = false;
        idx += 1;
    }

    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        tag.to_string()
    } else {
        trimmed.to_string()
    }
}

// A table acronym counts only when the next character starts a new word.
fn acronym_at(rest: &[char]) -> Option<&'static str> {
    ACRONYMS.iter().copied().find(|acronym| {
        let len = acronym.chars().count();
        rest.len() >= len
            && rest[..len].iter().copied().eq(acronym.chars())
            && rest
                .get(len)
                .map_or(true, |next| next.is_uppercase() || *next == '_' || *next == '-')
    })
}

fn push_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}
