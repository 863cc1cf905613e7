use std::fmt::{Display, Formatter};

macro_rules! dense_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(&self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(
    CellId,
    "Dense, zero-based identifier of an [EntropyCell](crate::cell::EntropyCell) within a field."
);
dense_id!(
    StateId,
    "Globally unique identifier of an [EntropyState](crate::state::EntropyState)."
);
dense_id!(
    ConstraintId,
    "Identifier of a [Constraint](crate::constraint::Constraint), unique within a field."
);
