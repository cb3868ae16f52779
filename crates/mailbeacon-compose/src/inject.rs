// crates/mailbeacon-compose/src/inject.rs
// ============================================================================
// Module: Tracking Injector
// Description: Marker insertion and hyperlink rewriting for message bodies.
// Purpose: Embed open and click detection artifacts exactly once per message.
// Dependencies: mailbeacon-core, mailbeacon-config, rand, url
// ============================================================================

//! ## Overview
//! Markers are two `img` elements pointing at `<marker-url>/<identity>`:
//! a primary appended at the end of the body and a backup placed before a
//! randomly chosen top-level text segment (appended when there is none).
//! Both are tagged with `data-email-id` so a second pass finds them and does
//! nothing.
//!
//! Every `a` element not tagged `data-tracked` is rewritten to the redirect
//! endpoint with `url` and `emailId` query parameters. The original
//! destination is kept in `data-original-href`. Links that already point at
//! the redirect endpoint are skipped. A failing link is reported on its own
//! and never stops the remaining links.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mailbeacon_config::ConfigError;
use mailbeacon_config::MailBeaconConfig;
use mailbeacon_core::MessageIdentity;
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;
use url::Url;

use crate::body::BodyNode;
use crate::body::Element;
use crate::body::MessageBody;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Attribute tagging markers with their identity.
pub const MARKER_IDENTITY_ATTR: &str = "data-email-id";
/// Attribute naming the marker role (`primary` or `backup`).
pub const MARKER_ROLE_ATTR: &str = "data-marker-role";
/// Attribute tagging rewritten links.
pub const TRACKED_ATTR: &str = "data-tracked";
/// Attribute holding a rewritten link's original destination.
pub const ORIGINAL_HREF_ATTR: &str = "data-original-href";
/// Inline style of the primary marker.
const PRIMARY_MARKER_STYLE: &str =
    "width:1px;height:1px;position:fixed;bottom:0;right:0;opacity:0.1;pointer-events:none;";
/// Inline style of the backup marker.
const BACKUP_MARKER_STYLE: &str =
    "width:1px;height:1px;display:inline;opacity:0.1;pointer-events:none;";
/// Maximum href length rewritten.
pub const MAX_HREF_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Result of marker injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// A marker for the identity was already present.
    AlreadyPresent,
    /// Primary and backup markers were inserted.
    Inserted {
        /// Whether the backup sits next to a text segment.
        backup_beside_text: bool,
    },
}

/// Result of link rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRewriteReport {
    /// Links rewritten in this pass.
    pub rewritten: usize,
    /// Links skipped as already tracked, redirect-pointing, or empty.
    pub skipped: usize,
    /// Per-link failures.
    pub failures: Vec<InjectError>,
}

/// Result of a full injection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReport {
    /// Marker outcome.
    pub markers: MarkerOutcome,
    /// Link rewriting outcome.
    pub links: LinkRewriteReport,
}

// ============================================================================
// SECTION: Injector
// ============================================================================

/// Embeds markers and rewrites links.
#[derive(Debug, Clone)]
pub struct TrackingInjector {
    /// Marker endpoint; the identity is appended as a path segment.
    marker_endpoint: Url,
    /// Redirect endpoint.
    redirect_endpoint: Url,
}

impl TrackingInjector {
    /// Creates an injector for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::Endpoint`] when an endpoint cannot take path
    /// segments or query parameters.
    pub fn new(marker_endpoint: Url, redirect_endpoint: Url) -> Result<Self, InjectError> {
        for endpoint in [&marker_endpoint, &redirect_endpoint] {
            if endpoint.cannot_be_a_base() || endpoint.query().is_some() {
                return Err(InjectError::Endpoint(endpoint.to_string()));
            }
        }
        Ok(Self {
            marker_endpoint,
            redirect_endpoint,
        })
    }

    /// Creates an injector from the configured tracker URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoints are invalid.
    pub fn from_config(config: &MailBeaconConfig) -> Result<Self, ConfigError> {
        Self::new(config.marker_url()?, config.redirect_url()?)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Marker URL for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::Endpoint`] when the endpoint cannot take segments.
    pub fn marker_url(&self, identity: &MessageIdentity) -> Result<Url, InjectError> {
        let mut url = self.marker_endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| InjectError::Endpoint(self.marker_endpoint.to_string()))?
            .pop_if_empty()
            .push(identity.as_str());
        Ok(url)
    }

    /// Redirect URL carrying a destination and identity.
    #[must_use]
    pub fn redirect_url(&self, destination: &str, identity: &MessageIdentity) -> Url {
        let mut url = self.redirect_endpoint.clone();
        url.query_pairs_mut().append_pair("url", destination).append_pair("emailId", identity.as_str());
        url
    }

    /// Inserts markers then rewrites links, using the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError`] when markers cannot be built; links are then
    /// left untouched.
    pub fn inject(
        &self,
        body: &mut MessageBody,
        identity: &MessageIdentity,
    ) -> Result<InjectionReport, InjectError> {
        self.inject_with_rng(body, identity, &mut rand::thread_rng())
    }

    /// [`TrackingInjector::inject`] with a caller-provided RNG.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError`] when markers cannot be built.
    pub fn inject_with_rng<R: Rng + ?Sized>(
        &self,
        body: &mut MessageBody,
        identity: &MessageIdentity,
        rng: &mut R,
    ) -> Result<InjectionReport, InjectError> {
        let markers = self.inject_markers(body, identity, rng)?;
        let links = self.rewrite_links(body, identity);
        Ok(InjectionReport {
            markers,
            links,
        })
    }

    /// Inserts the primary and backup markers unless one is already present.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::Endpoint`] when the marker URL cannot be built.
    pub fn inject_markers<R: Rng + ?Sized>(
        &self,
        body: &mut MessageBody,
        identity: &MessageIdentity,
        rng: &mut R,
    ) -> Result<MarkerOutcome, InjectError> {
        if has_marker(body, identity) {
            return Ok(MarkerOutcome::AlreadyPresent);
        }
        let src = self.marker_url(identity)?;
        let root = body.root_mut();
        root.push(marker_element(&src, identity, "primary", PRIMARY_MARKER_STYLE));

        let text_positions: Vec<usize> = root
            .children()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_text())
            .map(|(index, _)| index)
            .collect();
        let backup = marker_element(&src, identity, "backup", BACKUP_MARKER_STYLE);
        let backup_beside_text = match text_positions.choose(rng) {
            Some(&index) => {
                root.insert(index, backup);
                true
            }
            None => {
                root.push(backup);
                false
            }
        };
        Ok(MarkerOutcome::Inserted {
            backup_beside_text,
        })
    }

    /// Rewrites every untracked link in the body.
    pub fn rewrite_links(&self, body: &mut MessageBody, identity: &MessageIdentity) -> LinkRewriteReport {
        let mut report = LinkRewriteReport::default();
        body.root_mut().visit_mut(&mut |element| {
            if !element.tag().eq_ignore_ascii_case("a") {
                return;
            }
            match self.rewrite_link(element, identity) {
                Ok(true) => report.rewritten += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => report.failures.push(err),
            }
        });
        report
    }

    /// Rewrites one link; `Ok(false)` when it is skipped.
    fn rewrite_link(&self, link: &mut Element, identity: &MessageIdentity) -> Result<bool, InjectError> {
        if link.has_attr(TRACKED_ATTR) {
            return Ok(false);
        }
        let Some(href) = link.attr("href").map(str::trim).filter(|href| !href.is_empty()) else {
            return Ok(false);
        };
        if self.points_at_redirect(href) {
            return Ok(false);
        }
        if href.len() > MAX_HREF_BYTES {
            return Err(InjectError::LinkTooLong {
                max_bytes: MAX_HREF_BYTES,
                actual_bytes: href.len(),
            });
        }
        if href.chars().any(char::is_control) {
            return Err(InjectError::InvalidHref(href.chars().take(64).collect()));
        }
        let original = href.to_string();
        let tracked = self.redirect_url(&original, identity);
        link.set_attr("href", tracked.as_str());
        link.set_attr(ORIGINAL_HREF_ATTR, original);
        link.set_attr(TRACKED_ATTR, "true");
        Ok(true)
    }

    /// Whether an href already targets the redirect endpoint.
    fn points_at_redirect(&self, href: &str) -> bool {
        let endpoint = self.redirect_endpoint.as_str();
        href.strip_prefix(endpoint)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('?') || rest.starts_with('#'))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Whether the body already holds a marker for the identity.
#[must_use]
pub fn has_marker(body: &MessageBody, identity: &MessageIdentity) -> bool {
    body.count_elements(|element| is_marker_for(element, identity)) > 0
}

/// Counts markers for an identity with the given role.
#[must_use]
pub fn count_markers(body: &MessageBody, identity: &MessageIdentity, role: &str) -> usize {
    body.count_elements(|element| {
        is_marker_for(element, identity) && element.attr(MARKER_ROLE_ATTR) == Some(role)
    })
}

/// Whether an element is a marker for the identity.
fn is_marker_for(element: &Element, identity: &MessageIdentity) -> bool {
    element.tag().eq_ignore_ascii_case("img")
        && element.attr(MARKER_IDENTITY_ATTR) == Some(identity.as_str())
}

/// Builds one marker element.
fn marker_element(src: &Url, identity: &MessageIdentity, role: &str, style: &str) -> BodyNode {
    Element::new("img")
        .with_attr("src", src.as_str())
        .with_attr("alt", "")
        .with_attr("width", "1")
        .with_attr("height", "1")
        .with_attr("style", style)
        .with_attr(MARKER_IDENTITY_ATTR, identity.as_str())
        .with_attr(MARKER_ROLE_ATTR, role)
        .into()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Injection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// Endpoint URL cannot be used for tracking URLs.
    #[error("unusable tracking endpoint: {0}")]
    Endpoint(String),
    /// Link destination exceeded the size limit.
    #[error("link destination exceeds {max_bytes} bytes ({actual_bytes})")]
    LinkTooLong {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Link destination contained control characters.
    #[error("invalid link destination: {0}")]
    InvalidHref(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn injector() -> TrackingInjector {
        TrackingInjector::new(
            Url::parse("https://tracker.example.com/track/pixel").unwrap(),
            Url::parse("https://tracker.example.com/track/link").unwrap(),
        )
        .unwrap()
    }

    fn sample_body() -> MessageBody {
        MessageBody::from_nodes([
            BodyNode::text("Hello, "),
            Element::new("a")
                .with_attr("href", "https://example.com/report?q=1")
                .with_child(BodyNode::text("report"))
                .into(),
            BodyNode::text(" thanks."),
            Element::new("p")
                .with_child(Element::new("a").with_attr("href", "https://docs.example.com"))
                .into(),
        ])
    }

    #[test]
    fn injection_is_idempotent() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = sample_body();
        let mut rng = StdRng::seed_from_u64(7);
        let first = injector().inject_with_rng(&mut body, &identity, &mut rng).unwrap();
        assert_eq!(first.links.rewritten, 2);
        assert!(matches!(first.markers, MarkerOutcome::Inserted { backup_beside_text: true }));
        let rendered = body.render_html();

        let second = injector().inject_with_rng(&mut body, &identity, &mut rng).unwrap();
        assert_eq!(second.markers, MarkerOutcome::AlreadyPresent);
        assert_eq!(second.links.rewritten, 0);
        assert_eq!(second.links.skipped, 2);
        assert_eq!(body.render_html(), rendered);
        assert_eq!(count_markers(&body, &identity, "primary"), 1);
        assert_eq!(count_markers(&body, &identity, "backup"), 1);
    }

    #[test]
    fn uppercase_marker_counts_as_present() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = MessageBody::from_nodes([
            BodyNode::text("Hi"),
            Element::new("IMG")
                .with_attr("src", "https://tracker.example.com/track/pixel/email_abc")
                .with_attr(MARKER_IDENTITY_ATTR, identity.as_str())
                .with_attr(MARKER_ROLE_ATTR, "primary")
                .into(),
        ]);
        assert!(has_marker(&body, &identity));
        let mut rng = StdRng::seed_from_u64(3);
        let report = injector().inject_with_rng(&mut body, &identity, &mut rng).unwrap();
        assert_eq!(report.markers, MarkerOutcome::AlreadyPresent);
        assert_eq!(body.count_elements(|element| element.tag().eq_ignore_ascii_case("img")), 1);
    }

    #[test]
    fn primary_is_last_and_backup_precedes_a_text_segment() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = sample_body();
        injector().inject_markers(&mut body, &identity, &mut StdRng::seed_from_u64(1)).unwrap();
        let children = body.root().children();
        let last = children.last().and_then(BodyNode::as_element).unwrap();
        assert_eq!(last.attr(MARKER_ROLE_ATTR), Some("primary"));
        assert_eq!(
            last.attr("src"),
            Some("https://tracker.example.com/track/pixel/email_abc")
        );
        let backup_index = children
            .iter()
            .position(|node| {
                node.as_element().and_then(|element| element.attr(MARKER_ROLE_ATTR))
                    == Some("backup")
            })
            .unwrap();
        assert!(children[backup_index + 1].is_text());
    }

    #[test]
    fn backup_is_appended_without_text_segments() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = MessageBody::from_nodes([Element::new("p").into()]);
        let outcome =
            injector().inject_markers(&mut body, &identity, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(outcome, MarkerOutcome::Inserted { backup_beside_text: false });
        assert_eq!(body.root().children().len(), 3);
    }

    #[test]
    fn rewritten_link_carries_destination_and_identity() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = sample_body();
        injector().rewrite_links(&mut body, &identity);
        let links = body.elements_by_tag("a");
        let first = &links[0];
        let href = Url::parse(first.attr("href").unwrap()).unwrap();
        assert_eq!(href.path(), "/track/link");
        let pairs: Vec<(String, String)> = href.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("url".to_string(), "https://example.com/report?q=1".to_string()),
                ("emailId".to_string(), "email_abc".to_string()),
            ]
        );
        assert_eq!(first.attr(ORIGINAL_HREF_ATTR), Some("https://example.com/report?q=1"));
        assert_eq!(first.attr(TRACKED_ATTR), Some("true"));
    }

    #[test]
    fn redirect_links_and_failures_do_not_stop_other_links() {
        let identity = MessageIdentity::new("email_abc");
        let mut body = MessageBody::from_nodes([
            Element::new("a")
                .with_attr("href", "https://tracker.example.com/track/link?url=x&emailId=y")
                .into(),
            Element::new("a").with_attr("href", "x".repeat(MAX_HREF_BYTES + 1)).into(),
            Element::new("a").with_attr("href", "https://ok.example.com").into(),
            Element::new("a").into(),
        ]);
        let report = injector().rewrite_links(&mut body, &identity);
        assert_eq!(report.rewritten, 1);
        assert_eq!(report.skipped, 2);
        assert!(matches!(report.failures.as_slice(), [InjectError::LinkTooLong { .. }]));
    }

    #[test]
    fn endpoints_with_query_are_rejected() {
        let result = TrackingInjector::new(
            Url::parse("https://t.example.com/p?x=1").unwrap(),
            Url::parse("https://t.example.com/l").unwrap(),
        );
        assert!(matches!(result, Err(InjectError::Endpoint(_))));
    }
}
