use serde::{Serialize, Serializer};
use std::fmt;

/// Traffic channel a view is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Facebook,
    PhiAffiliate,
    GoogleMerchantCenter,
    HubSpotEmail,
    Substack,
    Reddit,
    Twitter,
    InstagramPaid,
    Instagram,
    /// Any other `utm_source` value, as written in the identifier.
    Utm(String),
    DirectOther,
}

impl Channel {
    const fn fixed_name(&self) -> Option<&'static str> {
        match self {
            Self::Facebook => Some("Facebook"),
            Self::PhiAffiliate => Some("Phi Affiliate"),
            Self::GoogleMerchantCenter => Some("Google Merchant Center"),
            Self::HubSpotEmail => Some("HubSpot Email Campaign"),
            Self::Substack => Some("Substack"),
            Self::Reddit => Some("Reddit"),
            Self::Twitter => Some("Twitter"),
            Self::InstagramPaid => Some("Instagram (Paid)"),
            Self::Instagram => Some("Instagram"),
            Self::Utm(_) => None,
            Self::DirectOther => Some("Direct/Other"),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.fixed_name()) {
            (Self::Utm(source), _) => write!(f, "UTM: {source}"),
            (_, Some(name)) => f.write_str(name),
            (_, None) => Ok(()),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

const UTM_SOURCE: &str = "utm_source=";

/// Attribute a raw view identifier to a traffic channel.
///
/// Matching is ASCII case-insensitive over the whole identifier and the first
/// matching rule wins. The affiliate rule is a plain `a=` substring test, so
/// it also fires on keys such as `data=` or `utm_media=`; rules below it only
/// see identifiers without that substring.
pub fn classify(identifier: &str) -> Channel {
    let lower = identifier.to_ascii_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("fbclid=") {
        Channel::Facebook
    } else if has("a=") {
        Channel::PhiAffiliate
    } else if has("srsltid=") {
        Channel::GoogleMerchantCenter
    } else if has("hs_email=") {
        Channel::HubSpotEmail
    } else if has("utm_source=substack") {
        Channel::Substack
    } else if has("utm_source=reddit") {
        Channel::Reddit
    } else if has("twclid=") {
        Channel::Twitter
    } else if has("utm_medium=paid") && has("utm_source=ig") {
        Channel::InstagramPaid
    } else if has("utm_source=ig") {
        Channel::Instagram
    } else {
        utm_source_value(identifier, &lower).map_or(Channel::DirectOther, Channel::Utm)
    }
}

/// Value following the first `utm_source=`, up to the next `&`, keeping the
/// identifier's original casing. Empty values do not count.
fn utm_source_value(identifier: &str, lower: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets, so positions in `lower` are valid
    // in `identifier`.
    let start = lower.find(UTM_SOURCE)? + UTM_SOURCE.len();
    let rest = &identifier[start..];
    let value = rest.split('&').next().unwrap_or(rest);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
