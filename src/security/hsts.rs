//! HSTS configuration and header value rendering.
//!
//! # Responsibilities
//! - Hold the install-time HSTS settings
//! - Reject negative max-age at the moment it is assigned
//! - Render the `Strict-Transport-Security` value with escaped custom directives
//!
//! # Design Decisions
//! - Rendering is a pure function run once per layer, never per request
//! - Directive order is insertion order

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::HstsError;

/// Default `max-age`: 365 days.
pub const DEFAULT_HSTS_MAX_AGE: u64 = 365 * 24 * 60 * 60;

/// Non-negative `max-age` in seconds.
///
/// Only constructible through [`MaxAge::try_from`], so a negative value can
/// never reach [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MaxAge(u64);

impl MaxAge {
    pub fn seconds(self) -> u64 {
        self.0
    }
}

impl Default for MaxAge {
    fn default() -> Self {
        Self(DEFAULT_HSTS_MAX_AGE)
    }
}

impl TryFrom<i64> for MaxAge {
    type Error = HstsError;

    fn try_from(seconds: i64) -> Result<Self, Self::Error> {
        u64::try_from(seconds)
            .map(Self)
            .map_err(|_| HstsError::NegativeMaxAge(seconds))
    }
}

impl From<MaxAge> for i64 {
    fn from(max_age: MaxAge) -> Self {
        // Built from an i64, so this never saturates.
        i64::try_from(max_age.0).unwrap_or(i64::MAX)
    }
}

/// A single custom directive. `value: None` renders as a bare name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomDirective {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Ordered name -> optional value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<CustomDirective>", into = "Vec<CustomDirective>")]
pub struct CustomDirectives(Vec<CustomDirective>);

impl CustomDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a directive. An existing name keeps its position and gets the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|d| d.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(CustomDirective { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<CustomDirective> {
        let idx = self.0.iter().position(|d| d.name == name)?;
        Some(self.0.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&CustomDirective> {
        self.0.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomDirective> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CustomDirective>> for CustomDirectives {
    fn from(directives: Vec<CustomDirective>) -> Self {
        let mut out = Self::new();
        for d in directives {
            out.insert(d.name, d.value);
        }
        out
    }
}

impl From<CustomDirectives> for Vec<CustomDirective> {
    fn from(directives: CustomDirectives) -> Self {
        directives.0
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for CustomDirectives
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, value) in iter {
            out.insert(name, value.map(Into::into));
        }
        out
    }
}

/// HSTS settings, fixed once the layer is installed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HstsConfig {
    /// Install the HSTS layer at all.
    pub enabled: bool,

    /// Append the `preload` directive.
    pub preload: bool,

    /// Append the `includeSubDomains` directive.
    pub include_sub_domains: bool,

    max_age_in_seconds: MaxAge,

    /// Extra directives appended after the standard ones.
    pub custom_directives: CustomDirectives,
}

impl Default for HstsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preload: false,
            include_sub_domains: true,
            max_age_in_seconds: MaxAge::default(),
            custom_directives: CustomDirectives::new(),
        }
    }
}

impl HstsConfig {
    pub fn builder() -> HstsConfigBuilder {
        HstsConfigBuilder::new()
    }

    pub fn max_age_in_seconds(&self) -> u64 {
        self.max_age_in_seconds.seconds()
    }

    /// Fails without touching the current value when `seconds` is negative.
    pub fn set_max_age_in_seconds(&mut self, seconds: i64) -> Result<(), HstsError> {
        self.max_age_in_seconds = MaxAge::try_from(seconds)?;
        Ok(())
    }
}

/// Builder for [`HstsConfig`]. Validation happens in [`build`](Self::build).
#[must_use = "builder does nothing until you call build()"]
pub struct HstsConfigBuilder {
    config: HstsConfig,
    max_age_in_seconds: Option<i64>,
}

impl HstsConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HstsConfig::default(),
            max_age_in_seconds: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.config.preload = preload;
        self
    }

    pub fn include_sub_domains(mut self, include: bool) -> Self {
        self.config.include_sub_domains = include;
        self
    }

    pub fn max_age_in_seconds(mut self, seconds: i64) -> Self {
        self.max_age_in_seconds = Some(seconds);
        self
    }

    pub fn directive(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.config
            .custom_directives
            .insert(name, value.map(str::to_owned));
        self
    }

    pub fn build(mut self) -> Result<HstsConfig, HstsError> {
        if let Some(seconds) = self.max_age_in_seconds {
            self.config.set_max_age_in_seconds(seconds)?;
        }
        Ok(self.config)
    }
}

impl Default for HstsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the `Strict-Transport-Security` header value.
pub fn render(config: &HstsConfig) -> String {
    let mut value = format!("max-age={}", config.max_age_in_seconds());

    if config.include_sub_domains {
        value.push_str("; includeSubDomains");
    }
    if config.preload {
        value.push_str("; preload");
    }

    for directive in config.custom_directives.iter() {
        value.push_str("; ");
        value.push_str(&escape_if_needed(&directive.name));
        if let Some(v) = &directive.value {
            value.push('=');
            value.push_str(&escape_if_needed(v));
        }
    }

    value
}

/// RFC 7230 `tchar`.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Leave tokens alone, turn everything else into a quoted-string.
pub fn escape_if_needed(raw: &str) -> Cow<'_, str> {
    if !raw.is_empty() && raw.chars().all(is_token_char) {
        return Cow::Borrowed(raw);
    }

    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
