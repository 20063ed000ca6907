use std::ops::BitOr;

macro_rules! option_flags {
    (
        $(#[$outer:meta])*
        pub struct $name:ident { $($(#[$inner:meta])* $flag:ident = $bit:expr;)* }
    ) => {
        $(#[$outer])*
        /// Bit values are stable and may be persisted.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(u8);

        impl $name {
            pub const NONE: Self = Self(0);
            $($(#[$inner])* pub const $flag: Self = Self($bit);)*

            pub const fn bits(self) -> u8 {
                self.0
            }

            pub const fn from_bits(bits: u8) -> Self {
                Self(bits)
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

option_flags! {
    /// Row-count and construction policy for single-object materializers.
    pub struct RowOptions {
        /// Zero rows yields `None` instead of [`Error::MissingData`](crate::Error::MissingData).
        ALLOW_EMPTY_RESULTS = 1;
        /// More than one row keeps the first row in cursor order instead of
        /// failing. Whether that order is meaningful is the caller's
        /// responsibility; without an ORDER BY most engines leave it
        /// undefined.
        DISCARD_EXTRA_ROWS = 2;
        /// Bind through the entity's declared constructor and trim the SELECT
        /// to exactly its columns.
        INFER_CONSTRUCTOR = 4;
    }
}

option_flags! {
    /// Construction policy for collection materializers.
    pub struct CollectionOptions {
        /// See [`RowOptions::INFER_CONSTRUCTOR`].
        INFER_CONSTRUCTOR = 1;
    }
}

option_flags! {
    /// Column and null policy for single-column list materializers.
    pub struct ListOptions {
        /// A row with extra columns keeps its first column.
        IGNORE_EXTRA_COLUMNS = 1;
        /// A row with extra columns contributes every column, flattened in
        /// label order.
        FLATTEN_EXTRA_COLUMNS = 2;
        /// NULL values are skipped instead of failing a non-nullable element
        /// type.
        DISCARD_NULLS = 4;
    }
}
