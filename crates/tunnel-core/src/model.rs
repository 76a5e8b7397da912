use crate::error::{Result, StorageError};
use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a URL record.
pub type UrlId = u64;
/// Store-assigned identifier of a user.
pub type UserId = u64;

const DEFAULT_SCHEME_PREFIX: &str = "https://";
const MAX_LABEL_LENGTH: usize = 63;

/// A stored short link.
///
/// `original_url` is the dedup key: a store holds at most one record per
/// origin. `short_url` is never changed once assigned and `is_deleted` only
/// ever goes from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub id: UrlId,
    pub short_url: ShortCode,
    pub original_url: String,
    /// Owning user, `0` on the wire when anonymous.
    #[serde(default, with = "owner")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Url {
    /// Whether the record is owned by `user_id` and has not been deleted.
    pub fn is_active_for(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id) && !self.is_deleted
    }
}

/// An anonymous user, identified externally by the UUID of its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub uuid: String,
}

/// The input of [`UrlRepository::create`](crate::UrlRepository::create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrl {
    pub short_url: ShortCode,
    pub original_url: String,
}

impl NewUrl {
    pub fn new(short_url: ShortCode, original_url: impl Into<String>) -> Self {
        Self {
            short_url,
            original_url: original_url.into(),
        }
    }

    /// Returns a copy whose origin has been normalized by [`normalize_origin`].
    pub fn validate(&self) -> Result<NewUrl> {
        Ok(NewUrl {
            short_url: self.short_url.clone(),
            original_url: normalize_origin(&self.original_url)?,
        })
    }

    /// Builds the record a store persists once it has picked an identifier.
    pub fn into_url(self, id: UrlId) -> Url {
        Url {
            id,
            short_url: self.short_url,
            original_url: self.original_url,
            user_id: None,
            is_deleted: false,
        }
    }
}

/// Validates an origin URL and returns the form that is stored.
///
/// Origins without an `http://` or `https://` scheme get `https://`
/// prepended. The result must parse as an absolute URL whose host is a
/// domain name with at least two labels.
pub fn normalize_origin(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let lowered = raw.to_ascii_lowercase();
    let origin = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        raw.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{raw}")
    };

    let parsed = url::Url::parse(&origin)
        .map_err(|e| StorageError::InvalidUrl(format!("{origin}: {e}")))?;

    match parsed.host() {
        Some(url::Host::Domain(domain)) if is_valid_domain(domain) => Ok(origin),
        _ => Err(StorageError::InvalidUrl(format!("invalid host: {origin}"))),
    }
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }

    let tld_ok = if let Some(punycode) = tld.strip_prefix("xn--") {
        !punycode.is_empty()
            && tld.len() <= MAX_LABEL_LENGTH
            && punycode.chars().all(|c| c.is_ascii_alphanumeric())
    } else {
        !tld.is_empty()
            && tld.len() <= MAX_LABEL_LENGTH
            && tld.chars().all(|c| c.is_ascii_alphabetic())
    };

    tld_ok && rest.iter().all(|label| is_valid_label(label))
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LENGTH
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Serializes an optional owner as `0` when absent, the way the log format
/// has always encoded anonymous records.
mod owner {
    use super::UserId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<UserId>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.unwrap_or(0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<UserId>::deserialize(deserializer)?;
        Ok(raw.filter(|id| *id != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_explicit_scheme() {
        assert_eq!(
            normalize_origin("https://yandex.ru/pogoda/saint-petersburg").unwrap(),
            "https://yandex.ru/pogoda/saint-petersburg"
        );
        assert_eq!(
            normalize_origin("http://example.com/a?b=c").unwrap(),
            "http://example.com/a?b=c"
        );
    }

    #[test]
    fn prefixes_https_when_scheme_missing() {
        assert_eq!(
            normalize_origin("example.com/a").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn accepts_port_and_subdomains() {
        assert!(normalize_origin("https://a.b-c.example.org:8443/x").is_ok());
        assert!(normalize_origin("https://xn--e1afmkfd.xn--p1ai/").is_ok());
    }

    #[test]
    fn rejects_invalid_hosts() {
        for raw in [
            "",
            "https://",
            "https://localhost/a",
            "https://127.0.0.1/a",
            "https://-bad.com/",
            "https://exa_mple.com/",
            "https://example.c0m/",
            "not a url at all",
        ] {
            assert!(
                matches!(normalize_origin(raw), Err(StorageError::InvalidUrl(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn anonymous_owner_is_zero_on_the_wire() {
        let url = NewUrl::new(ShortCode::new_unchecked("g1gsHibv"), "https://example.com")
            .into_url(3);
        let json = serde_json::to_value(&url).unwrap();
        assert_eq!(json["user_id"], 0);
        assert_eq!(json["is_deleted"], false);

        let back: Url = serde_json::from_value(json).unwrap();
        assert_eq!(back.user_id, None);
    }

    #[test]
    fn missing_optional_fields_default() {
        let url: Url = serde_json::from_str(
            r#"{"id":4,"short_url":"abcdefgh","original_url":"https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(url.user_id, None);
        assert!(!url.is_deleted);
    }

    #[test]
    fn legacy_user_with_embedded_urls_parses() {
        let user: User = serde_json::from_str(
            r#"{"id":2,"uuid":"353ba025-7285-4790-bfeb-b70c1ef18323","url":[{"id":1},{"id":5}]}"#,
        )
        .unwrap();
        assert_eq!(user.id, 2);
        assert_eq!(user.uuid, "353ba025-7285-4790-bfeb-b70c1ef18323");
    }

    #[test]
    fn active_for_owner() {
        let mut url = NewUrl::new(ShortCode::new_unchecked("abcdefgh"), "https://example.com")
            .into_url(1);
        assert!(!url.is_active_for(7));
        url.user_id = Some(7);
        assert!(url.is_active_for(7));
        url.is_deleted = true;
        assert!(!url.is_active_for(7));
    }
}
