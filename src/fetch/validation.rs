//! Content checks applied to every raw fetch before it is accepted.

use crate::fetch::FetchResult;

/// Case-insensitive markers of anti-automation interstitials.
pub const CHALLENGE_SIGNATURES: &[&str] = &[
    "cf-browser-verification",
    "cf-challenge",
    "challenge-platform",
    "just a moment...",
    "checking your browser before accessing",
    "attention required! | cloudflare",
    "ddos-guard",
    "_incapsula_resource",
    "incapsula incident id",
    "px-captcha",
    "perimeterx",
    "captcha-delivery.com",
    "datadome",
    "sucuri website firewall",
    "verify you are human",
    "please enable js and disable any ad blocker",
    "access to this page has been denied",
    "g-recaptcha",
    "h-captcha",
];

/// Returns the first challenge signature found in the payload.
pub fn find_challenge(html: &str) -> Option<&'static str> {
    let lowered = html.to_lowercase();
    CHALLENGE_SIGNATURES
        .iter()
        .copied()
        .find(|signature| lowered.contains(signature))
}

/// Accept or reject a raw result, returning the rejection reason.
pub fn check(result: &FetchResult, min_content_length: usize) -> Result<(), String> {
    if !result.success {
        return Err(result.error_text());
    }

    let html = match result.html.as_deref() {
        Some(html) => html,
        None => return Err("empty response".to_string()),
    };

    if html.len() < min_content_length {
        return Err(format!(
            "content too short ({} bytes, need {})",
            html.len(),
            min_content_length
        ));
    }

    if let Some(signature) = find_challenge(html) {
        return Err(format!("bot challenge detected ({})", signature));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<html><body>{}{}</body></html>", body, "x".repeat(600))
    }

    #[test]
    fn test_accepts_normal_page() {
        let result = FetchResult::ok("https://e.com", page("<article>News</article>"));
        assert!(check(&result, 500).is_ok());
    }

    #[test]
    fn test_rejects_short_payload() {
        let result = FetchResult::ok("https://e.com", "<html></html>".to_string());
        let reason = check(&result, 500).unwrap_err();
        assert!(reason.contains("too short"));
    }

    #[test]
    fn test_rejects_challenge_case_insensitive() {
        let result = FetchResult::ok("https://e.com", page("<title>Just a moment...</title>"));
        let reason = check(&result, 500).unwrap_err();
        assert!(reason.contains("just a moment"));

        let result = FetchResult::ok("https://e.com", page("<div id=\"PX-Captcha\"></div>"));
        assert!(check(&result, 500).is_err());
    }

    #[test]
    fn test_rejects_transport_failure() {
        let result = FetchResult::failed("https://e.com", "connection refused");
        assert_eq!(check(&result, 500).unwrap_err(), "connection refused");
    }

    #[test]
    fn test_find_challenge_none() {
        assert_eq!(find_challenge("<p>regular content</p>"), None);
    }
}
