use std::fmt::{self, Display};

use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// Field level validation failures, at most one per field.
///
/// The first message recorded for a field wins, so a field that breaks
/// several rules reports only the first one checked. Serialises as a JSON
/// object mapping field name to message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        if !self.contains(&field) {
            self.0.push(Violation {
                field,
                message: message.into(),
            });
        }
    }

    pub fn merge(&mut self, other: Violations) {
        for v in other.0 {
            self.add(v.field, v.message);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing was recorded, otherwise hands the violations back as error.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<garde::Report> for Violations {
    fn from(report: garde::Report) -> Self {
        let mut violations = Violations::new();
        for (path, error) in report.iter() {
            violations.add(path.to_string(), error.message());
        }
        violations
    }
}

impl Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl Serialize for Violations {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for v in &self.0 {
            map.serialize_entry(&v.field, &v.message)?;
        }
        map.end()
    }
}
