//! Stable, lightweight identifier newtypes, modeled after a single macro so that
//! buildings, road segments, road nodes, and clusters each get their own type and
//! cannot be confused with one another or with a raw index.

macro_rules! identifier {
    ($name: ident, $inner: ty) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier.
            pub const fn new(val: $inner) -> Self {
                Self(val)
            }

            /// Returns the inner representation of the identifier.
            pub const fn inner(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(val: $inner) -> Self {
                Self::new(val)
            }
        }
    };
}

identifier!(BuildingId, u64);
identifier!(RoadSegmentId, u64);
identifier!(RoadNodeId, usize);
