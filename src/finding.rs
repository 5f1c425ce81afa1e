//! Finding formatter
//!
//! Renders one discovered resource as a single line:
//! `<resource-id> [<state>] <attributes...> <tags...>`.
//! Attribute order is whatever the check pushes, so each check owns a
//! fixed, stable layout.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Attribute {
    Bare(String),
    Keyed(&'static str, String),
}

/// One normalized, human-readable record of a billable resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    resource_id: String,
    state: Option<String>,
    attributes: Vec<Attribute>,
    tags: Vec<(&'static str, String)>,
}

impl Finding {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            state: None,
            attributes: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Bracketed state shown right after the resource id
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Unlabelled attribute (`t3.micro`, `us-east-2a`)
    pub fn field(mut self, value: impl fmt::Display) -> Self {
        self.attributes.push(Attribute::Bare(value.to_string()));
        self
    }

    /// Labelled attribute (`vpc=vpc-123`)
    pub fn attr(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.attributes
            .push(Attribute::Keyed(key, value.to_string()));
        self
    }

    /// Labelled attribute, omitted when the value is absent or empty
    pub fn attr_opt(self, key: &'static str, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    /// Trailing tag suffix (`Name=web`), omitted when absent or empty
    pub fn tag(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.tags.push((key, v.to_string()));
        }
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_id)?;
        if let Some(state) = &self.state {
            write!(f, " [{}]", state)?;
        }
        for attribute in &self.attributes {
            match attribute {
                Attribute::Bare(value) => write!(f, " {}", value)?,
                Attribute::Keyed(key, value) => write!(f, " {}={}", key, value)?,
            }
        }
        for (key, value) in &self.tags {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

impl From<Finding> for String {
    fn from(finding: Finding) -> Self {
        finding.to_string()
    }
}

/// Synthetic finding for a sub-fetch that failed (one cluster, one batch);
/// multi-line diagnostics are folded onto the finding's single line
pub fn item_error(subject: &str, err: impl fmt::Display) -> String {
    let message = err.to_string();
    let message: Vec<&str> = message.split_whitespace().collect();
    format!("{} [ERROR: {}]", subject, message.join(" "))
}
