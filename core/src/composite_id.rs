//! Composite identifiers for entities that only exist inside a worktype.
//!
//! Statuses and flow rules are addressed as `<worktypeId>/<childId>` at the
//! resource surface. Server ids never contain `/`, so the split happens on
//! the first separator.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaskMgmtError};

pub const SEPARATOR: char = '/';

/// Join a worktype id and a child id
pub fn compose(worktype_id: &str, child_id: &str) -> String {
    format!("{worktype_id}{SEPARATOR}{child_id}")
}

/// Split a composite id into `(worktype_id, child_id)`
pub fn split(composite: &str) -> Result<(&str, &str)> {
    match composite.split_once(SEPARATOR) {
        Some((worktype_id, child_id)) if !worktype_id.is_empty() && !child_id.is_empty() => {
            Ok((worktype_id, child_id))
        }
        _ => Err(TaskMgmtError::InvalidCompositeId(composite.to_string())),
    }
}

/// Child part of a reference that may or may not be composite.
///
/// Configuration may point at a status either by its bare id or by the
/// composite id another resource exported.
pub fn child_id(reference: &str) -> &str {
    match reference.split_once(SEPARATOR) {
        Some((_, child)) if !child.is_empty() => child,
        _ => reference,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub worktype_id: String,
    pub child_id: String,
}

impl CompositeId {
    pub fn new(worktype_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            worktype_id: worktype_id.into(),
            child_id: child_id.into(),
        }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.worktype_id, SEPARATOR, self.child_id)
    }
}

impl FromStr for CompositeId {
    type Err = TaskMgmtError;

    fn from_str(s: &str) -> Result<Self> {
        let (worktype_id, child_id) = split(s)?;
        Ok(Self::new(worktype_id, child_id))
    }
}
