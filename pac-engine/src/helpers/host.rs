//! Hostname predicates: domain suffixes, domain levels and shell globs

use wildmatch::WildMatch;

/// `dnsDomainIs`: plain suffix match of `domain` against `host`
pub fn dns_domain_is(host: &str, domain: &str) -> bool {
    if host.is_empty() || domain.is_empty() {
        return false;
    }
    host.ends_with(domain)
}

/// `dnsDomainLevels`: number of dots in the hostname
pub fn dns_domain_levels(host: &str) -> i32 {
    host.matches('.').count() as i32
}

/// `isPlainHostName`: true if the hostname has no domain part
pub fn is_plain_host_name(host: &str) -> bool {
    !host.contains('.')
}

/// `localHostOrDomainIs`: exact match, or an unqualified host matching the
/// first label of `fqdn`
pub fn local_host_or_domain_is(host: &str, fqdn: &str) -> bool {
    if host.is_empty() || fqdn.is_empty() {
        return false;
    }
    if host == fqdn {
        return true;
    }
    is_plain_host_name(host) && fqdn.split('.').next() == Some(host)
}

/// `shExpMatch`: shell glob over the whole string, `*` and `?` only
pub fn sh_exp_match(s: &str, pattern: &str) -> bool {
    WildMatch::new(pattern).matches(s)
}
