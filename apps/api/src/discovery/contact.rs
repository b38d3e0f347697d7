//! Contact Resolver — heuristic organizational mailbox for a company name.
//!
//! The address is a low-confidence placeholder, never a verified contact.
//! Callers must allow it to be overridden.

/// Legal/corporate tokens removed as whole words before building the domain.
const CORPORATE_SUFFIXES: &[&str] = &[
    "pvt",
    "private",
    "ltd",
    "limited",
    "inc",
    "llc",
    "corp",
    "corporation",
    "solutions",
    "technologies",
    "india",
];

/// Used when nothing remains of the company name.
const PLACEHOLDER_NAME: &str = "company";
const MAILBOX_ALIAS: &str = "hr";
const TOP_LEVEL_DOMAIN: &str = "com";

/// Derives `hr@<name>.com` from a company name. Deterministic and total.
pub fn resolve_contact_email(company_name: &str) -> String {
    let lowered = company_name.to_lowercase();
    let mut domain_label: String = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty() && !CORPORATE_SUFFIXES.contains(token))
        .collect();

    if domain_label.is_empty() {
        domain_label = PLACEHOLDER_NAME.to_string();
    }

    format!("{MAILBOX_ALIAS}@{domain_label}.{TOP_LEVEL_DOMAIN}")
}

/// Minimal syntactic check: one `@` with non-empty local part and domain, no whitespace.
pub fn is_plausible_address(address: &str) -> bool {
    let address = address.trim();
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
