//!
//! # Field validation errors
//!
//! Validators report problems against a dotted path into the object,
//! e.g. `spec.reference`.
//!
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// dotted path to a field of an object
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<S: Into<String>>(root: S) -> Self {
        Self(vec![root.into()])
    }

    pub fn child<S: Into<String>>(&self, name: S) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// path to element of a list field
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        match segments.last_mut() {
            Some(last) => last.push_str(&format!("[{}]", index)),
            None => segments.push(format!("[{}]", index)),
        }
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    FieldValueRequired,
    FieldValueInvalid,
    FieldValueNotSupported,
    FieldValueDuplicate,
    FieldValueForbidden,
}

impl ErrorType {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::FieldValueRequired => "Required value",
            Self::FieldValueInvalid => "Invalid value",
            Self::FieldValueNotSupported => "Unsupported value",
            Self::FieldValueDuplicate => "Duplicate value",
            Self::FieldValueForbidden => "Forbidden",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub error_type: ErrorType,
    pub field: String,
    pub bad_value: Option<String>,
    pub detail: String,
}

impl FieldError {
    pub fn required<S: Into<String>>(path: &FieldPath, detail: S) -> Self {
        Self {
            error_type: ErrorType::FieldValueRequired,
            field: path.to_string(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn invalid<V: ToString, S: Into<String>>(path: &FieldPath, value: V, detail: S) -> Self {
        Self {
            error_type: ErrorType::FieldValueInvalid,
            field: path.to_string(),
            bad_value: Some(value.to_string()),
            detail: detail.into(),
        }
    }

    pub fn not_supported<V: ToString>(path: &FieldPath, value: V, valid: &[&str]) -> Self {
        let quoted: Vec<String> = valid.iter().map(|v| format!("\"{}\"", v)).collect();
        Self {
            error_type: ErrorType::FieldValueNotSupported,
            field: path.to_string(),
            bad_value: Some(value.to_string()),
            detail: format!("supported values: {}", quoted.join(", ")),
        }
    }

    pub fn duplicate<V: ToString>(path: &FieldPath, value: V) -> Self {
        Self {
            error_type: ErrorType::FieldValueDuplicate,
            field: path.to_string(),
            bad_value: Some(value.to_string()),
            detail: String::new(),
        }
    }

    pub fn forbidden<S: Into<String>>(path: &FieldPath, detail: S) -> Self {
        Self {
            error_type: ErrorType::FieldValueForbidden,
            field: path.to_string(),
            bad_value: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_type.describe())?;
        if let Some(value) = &self.bad_value {
            write!(f, ": \"{}\"", value)?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

/// aggregate of field errors, empty means valid
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrorList(Vec<FieldError>);

impl FieldErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: FieldErrorList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// first error reported against the field
    pub fn find(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl From<Vec<FieldError>> for FieldErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<FieldError> for FieldErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FieldErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for FieldErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.len() {
            0 => Ok(()),
            1 => write!(f, "{}", self.0[0]),
            _ => {
                let errors: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", errors.join(", "))
            }
        }
    }
}
