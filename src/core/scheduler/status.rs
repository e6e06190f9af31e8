//! Result of running a plugin at an extension point.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Success,
    // Plugin has nothing to do for this pod, the host skips its later extension points.
    Skip,
    // Node can't run the pod and retrying against the same node won't help.
    UnschedulableAndUnresolvable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    code: Code,
    reasons: Vec<String>,
}

impl Status {
    pub fn new(code: Code, reasons: Vec<String>) -> Self {
        Self { code, reasons }
    }

    pub fn success() -> Self {
        Self::new(Code::Success, vec![])
    }

    pub fn skip() -> Self {
        Self::new(Code::Skip, vec![])
    }

    pub fn skip_with_reason(reason: impl Into<String>) -> Self {
        Self::new(Code::Skip, vec![reason.into()])
    }

    pub fn unschedulable_and_unresolvable(reason: impl Into<String>) -> Self {
        Self::new(Code::UnschedulableAndUnresolvable, vec![reason.into()])
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    pub fn is_skip(&self) -> bool {
        self.code == Code::Skip
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reasons.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.reasons.join(", "))
        }
    }
}
