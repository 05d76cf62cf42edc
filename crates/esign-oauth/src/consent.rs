//! Consent (authorization request) link construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::ClientConfig;
use crate::environment::Endpoints;

/// Characters left untouched by a browser's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the URL a user visits to grant the configured scopes.
///
/// Parameter order is fixed: `response_type`, `scope`, `client_id`,
/// `redirect_uri`, then `state` when configured. Only `scope` is
/// percent-encoded; the remaining values are emitted verbatim, which is what
/// the provider's registered redirect matching expects.
pub fn consent_link(config: &ClientConfig, endpoints: &Endpoints) -> String {
    let mut url = endpoints.authorize_url();
    url.push_str("?response_type=");
    url.push_str(config.response_type.as_str());
    url.push_str("&scope=");
    url.extend(utf8_percent_encode(&config.scope(), COMPONENT));
    url.push_str("&client_id=");
    url.push_str(&config.client_id);
    url.push_str("&redirect_uri=");
    url.push_str(&config.redirect_uri);
    if let Some(state) = config.state.as_deref().filter(|s| !s.is_empty()) {
        url.push_str("&state=");
        url.push_str(state);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use smol_str::SmolStr;

    fn config(scopes: &[&str], state: Option<&str>) -> ClientConfig {
        ClientConfig::builder()
            .client_id("X")
            .scopes(scopes.iter().map(|s| SmolStr::new(s)).collect())
            .redirect_uri("http://localhost:3000/ds-callback")
            .maybe_state(state)
            .build()
    }

    fn query_param<'a>(link: &'a str, name: &str) -> Option<&'a str> {
        let (_, query) = link.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == name).then_some(v)
        })
    }

    #[test]
    fn sandbox_link_matches_expected_wire_format() {
        let link = consent_link(&config(&["signature"], None), &Environment::Sandbox.endpoints());
        assert_eq!(
            link,
            "https://account-d.docusign.com/oauth/auth?response_type=code&scope=signature&client_id=X&redirect_uri=http://localhost:3000/ds-callback"
        );
    }

    #[test]
    fn production_link_uses_production_host() {
        let link = consent_link(
            &config(&["signature"], None),
            &Environment::Production.endpoints(),
        );
        assert!(link.starts_with("https://account.docusign.com/oauth/auth?"));
    }

    #[test]
    fn scope_is_encoded_and_ordered() {
        let scopes = ["signature", "impersonation", "extended"];
        let link = consent_link(&config(&scopes, None), &Environment::Sandbox.endpoints());
        assert_eq!(
            query_param(&link, "scope"),
            Some("signature%20impersonation%20extended")
        );
    }

    #[test]
    fn scope_encoding_matches_component_rules() {
        let link = consent_link(
            &config(&["a/b", "c:d", "e-f_g.h~i*j'k(l)m!"], None),
            &Environment::Sandbox.endpoints(),
        );
        assert_eq!(
            query_param(&link, "scope"),
            Some("a%2Fb%20c%3Ad%20e-f_g.h~i*j'k(l)m!")
        );
    }

    #[test]
    fn state_only_changes_trailing_segment() {
        let endpoints = Environment::Sandbox.endpoints();
        let without = consent_link(&config(&["signature"], None), &endpoints);
        let with = consent_link(&config(&["signature"], Some("xyz")), &endpoints);
        assert_eq!(with, format!("{without}&state=xyz"));
    }

    #[test]
    fn empty_state_is_omitted() {
        let endpoints = Environment::Sandbox.endpoints();
        let link = consent_link(&config(&["signature"], Some("")), &endpoints);
        assert!(!link.contains("state="));
    }
}
