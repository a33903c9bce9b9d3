//! Role tags.
//!
//! Every message stores its role explicitly even though the kind implies it.
//! The marker types below make the stored tag fixed at the type level and
//! reject a mismatching tag when decoding.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Conversation role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input sent to the model.
    User,
    /// Output produced by the model.
    Model,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! role_marker {
    ($name:ident, $role:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $name {
            /// The role this marker stands for.
            #[must_use]
            pub fn role(&self) -> Role {
                $role
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($role.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                if value == $role.as_str() {
                    Ok($name)
                } else {
                    Err(de::Error::invalid_value(
                        de::Unexpected::Str(&value),
                        &$role.as_str(),
                    ))
                }
            }
        }
    };
}

role_marker!(UserRole, Role::User, "Role tag fixed to `user`.");
role_marker!(ModelRole, Role::Model, "Role tag fixed to `model`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_serializes_to_role_name() {
        assert_eq!(serde_json::to_string(&UserRole).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&ModelRole).unwrap(), "\"model\"");
    }

    #[test]
    fn test_marker_rejects_wrong_role() {
        assert!(serde_json::from_str::<UserRole>("\"user\"").is_ok());
        assert!(serde_json::from_str::<UserRole>("\"model\"").is_err());
        assert!(serde_json::from_str::<ModelRole>("\"user\"").is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(ModelRole.role(), Role::Model);
    }
}
