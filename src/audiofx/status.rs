//! Effect status codes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Soft result of an effect call.
///
/// Only returned where a rejection is expected in normal operation, such as
/// toggling an effect from a handle that lost control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectStatus {
    Success,
    Error,
    AlreadyExists,
    NoInit,
    BadValue,
    InvalidOperation,
    NoMemory,
    DeadObject,
}

impl EffectStatus {
    pub fn code(self) -> i32 {
        match self {
            EffectStatus::Success => 0,
            EffectStatus::Error => -1,
            EffectStatus::AlreadyExists => -2,
            EffectStatus::NoInit => -3,
            EffectStatus::BadValue => -4,
            EffectStatus::InvalidOperation => -5,
            EffectStatus::NoMemory => -6,
            EffectStatus::DeadObject => -7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(EffectStatus::Success),
            -1 => Some(EffectStatus::Error),
            -2 => Some(EffectStatus::AlreadyExists),
            -3 => Some(EffectStatus::NoInit),
            -4 => Some(EffectStatus::BadValue),
            -5 => Some(EffectStatus::InvalidOperation),
            -6 => Some(EffectStatus::NoMemory),
            -7 => Some(EffectStatus::DeadObject),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == EffectStatus::Success
    }
}

impl fmt::Display for EffectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectStatus::Success => "SUCCESS",
            EffectStatus::Error => "ERROR",
            EffectStatus::AlreadyExists => "ALREADY_EXISTS",
            EffectStatus::NoInit => "ERROR_NO_INIT",
            EffectStatus::BadValue => "ERROR_BAD_VALUE",
            EffectStatus::InvalidOperation => "ERROR_INVALID_OPERATION",
            EffectStatus::NoMemory => "ERROR_NO_MEMORY",
            EffectStatus::DeadObject => "ERROR_DEAD_OBJECT",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EffectStatus::Success.code(), 0);
        assert_eq!(EffectStatus::InvalidOperation.code(), -5);
        assert_eq!(EffectStatus::from_code(-7), Some(EffectStatus::DeadObject));
        assert_eq!(EffectStatus::from_code(1), None);
        assert_eq!(
            EffectStatus::InvalidOperation.to_string(),
            "ERROR_INVALID_OPERATION (-5)"
        );
    }
}
