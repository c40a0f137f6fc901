//! Field keys, tags and the [`Epoch`] change counter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain assumed for keys that carry no `domain-` prefix.
pub const DEFAULT_DOMAIN: &str = "domain";

/// Separator between a key's domain prefix and its variable name.
const DOMAIN_SEPARATOR: char = '-';

/// Tag prefix reserved for derivative fields; see [`FieldKey::derivative`].
pub const DERIVATIVE_TAG_PREFIX: &str = "d/d";

/// Identifies a field: a variable name plus an optional tag.
///
/// The tag distinguishes time levels or variants of the same quantity
/// (e.g. `"next"` versus `"current"`). A name may carry a domain prefix,
/// `"column_3-temperature"`, which places the field on the mesh named
/// `column_3`; unprefixed names live on [`DEFAULT_DOMAIN`].
///
/// # Examples
///
/// ```
/// use thaw_core::FieldKey;
///
/// let t = FieldKey::new("column_3-temperature");
/// assert_eq!(t.domain(), "column_3");
/// assert_eq!(t.variable(), "temperature");
///
/// let p = FieldKey::new("pressure").with_tag("next");
/// assert_eq!(p.to_string(), "pressure@next");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

impl FieldKey {
    /// Untagged key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
        }
    }

    /// Key on an explicit domain: `"<domain>-<variable>"`.
    pub fn on_domain(domain: &str, variable: &str) -> Self {
        if domain == DEFAULT_DOMAIN || domain.is_empty() {
            Self::new(variable)
        } else {
            Self::new(format!("{domain}{DOMAIN_SEPARATOR}{variable}"))
        }
    }

    /// Return a copy of this key carrying `tag`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Key of the derivative field `d(of)/d(wrt)`.
    ///
    /// The name follows the `d<of>_d<wrt>` convention on the domain of
    /// `of`. The tag starts with [`DERIVATIVE_TAG_PREFIX`] followed by the
    /// full `wrt` key (domain and tag) and then `of`'s own tag, so distinct
    /// pairs never share a key and no registered field can take one.
    ///
    /// ```
    /// use thaw_core::FieldKey;
    ///
    /// let q = FieldKey::new("q");
    /// let now = FieldKey::derivative(&q, &FieldKey::new("y"));
    /// let next = FieldKey::derivative(&q, &FieldKey::new("y").with_tag("next"));
    /// assert_eq!(now.name(), "dq_dy");
    /// assert_ne!(now, next);
    /// assert!(now.is_derivative());
    /// ```
    pub fn derivative(of: &FieldKey, wrt: &FieldKey) -> Self {
        let variable = format!("d{}_d{}", of.variable(), wrt.variable());
        let tag = match &of.tag {
            Some(t) => format!("{DERIVATIVE_TAG_PREFIX}{wrt}|{t}"),
            None => format!("{DERIVATIVE_TAG_PREFIX}{wrt}"),
        };
        Self {
            name: Self::on_domain(of.domain(), &variable).name,
            tag: Some(tag),
        }
    }

    /// Whether this key names a derivative field.
    pub fn is_derivative(&self) -> bool {
        self.tag
            .as_deref()
            .is_some_and(|t| t.starts_with(DERIVATIVE_TAG_PREFIX))
    }

    /// Full name, including any domain prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Domain (mesh name) this key lives on.
    pub fn domain(&self) -> &str {
        match self.name.split_once(DOMAIN_SEPARATOR) {
            Some((domain, _)) => domain,
            None => DEFAULT_DOMAIN,
        }
    }

    /// Variable name without the domain prefix.
    pub fn variable(&self) -> &str {
        match self.name.split_once(DOMAIN_SEPARATOR) {
            Some((_, var)) => var,
            None => &self.name,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}@{tag}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Monotonically increasing change counter.
///
/// Every write to a primary field draws a fresh epoch from the owning
/// state's counter. A secondary field records the largest epoch among its
/// inputs at the moment it was computed; it is stale as soon as any input
/// reports a larger one. `Epoch(0)` means "never written".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(pub u64);

impl Epoch {
    /// The epoch of a field that has never been written.
    pub const ZERO: Epoch = Epoch(0);

    /// The epoch following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Epoch {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprefixed_key_lives_on_default_domain() {
        let k = FieldKey::new("saturation_liquid");
        assert_eq!(k.domain(), DEFAULT_DOMAIN);
        assert_eq!(k.variable(), "saturation_liquid");
    }

    #[test]
    fn on_domain_roundtrips_through_accessors() {
        let k = FieldKey::on_domain("surface_column_7", "temperature");
        assert_eq!(k.name(), "surface_column_7-temperature");
        assert_eq!(k.domain(), "surface_column_7");
        assert_eq!(k.variable(), "temperature");
        assert_eq!(FieldKey::on_domain(DEFAULT_DOMAIN, "p"), FieldKey::new("p"));
    }

    #[test]
    fn derivative_key_follows_naming_convention() {
        let of = FieldKey::new("water_content").with_tag("next");
        let wrt = FieldKey::new("temperature");
        let d = FieldKey::derivative(&of, &wrt);
        assert_eq!(d.name(), "dwater_content_dtemperature");
        assert_eq!(d.tag(), Some("d/dtemperature|next"));
        assert!(d.is_derivative());
        assert!(!of.is_derivative());

        let col = FieldKey::new("column_2-temperature");
        let d = FieldKey::derivative(&col, &wrt);
        assert_eq!(d.name(), "column_2-dtemperature_dtemperature");
        assert_eq!(d.domain(), "column_2");
    }

    #[test]
    fn derivative_keys_keep_wrt_tag_and_domain() {
        let q = FieldKey::new("q");
        let y = FieldKey::new("y");
        let keys = [
            FieldKey::derivative(&q, &y),
            FieldKey::derivative(&q, &y.clone().with_tag("next")),
            FieldKey::derivative(&q, &FieldKey::new("column_0-y")),
            FieldKey::derivative(&q.clone().with_tag("next"), &y),
        ];
        for (a, ka) in keys.iter().enumerate() {
            for kb in &keys[a + 1..] {
                assert_ne!(ka, kb);
            }
        }
        // A plain field spelled like a derivative is a different key.
        assert_ne!(keys[0], FieldKey::new("dq_dy"));
    }

    #[test]
    fn tags_distinguish_keys() {
        let a = FieldKey::new("pressure");
        let b = FieldKey::new("pressure").with_tag("next");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "pressure");
    }

    #[test]
    fn epoch_ordering() {
        assert!(Epoch::ZERO < Epoch::ZERO.next());
        assert_eq!(Epoch(4).next(), Epoch(5));
    }
}
