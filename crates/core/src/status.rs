//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_states` database table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant, in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.id() == id)
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// OCR job execution state.
    JobState {
        Pending = 1,
        Running = 2,
        Succeeded = 3,
        Failed = 4,
    }
}

impl JobState {
    /// Terminal states are never left once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Client-facing state name reported by the status endpoint.
    pub fn wire_name(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "STARTED",
            JobState::Succeeded => "SUCCESS",
            JobState::Failed => "FAILURE",
        }
    }

    /// Lower-case label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for state in JobState::ALL {
            assert_eq!(JobState::from_id(state.id()), Some(*state));
        }
        assert_eq!(JobState::from_id(0), None);
        assert_eq!(JobState::from_id(5), None);
    }

    #[test]
    fn only_succeeded_and_failed_are_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn wire_names_match_status_endpoint_contract() {
        assert_eq!(JobState::Pending.wire_name(), "PENDING");
        assert_eq!(JobState::Running.wire_name(), "STARTED");
        assert_eq!(JobState::Succeeded.wire_name(), "SUCCESS");
        assert_eq!(JobState::Failed.wire_name(), "FAILURE");
    }
}
