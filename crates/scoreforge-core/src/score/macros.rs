//! Declarative macros for the field-based score types.
//!
//! These generate arithmetic ops, checked integer scaling and slash-separated
//! parsing, which every integral score type shares.

/// Generates `PartialOrd`, `Add`, `Sub`, and `Neg` for a field-based score type.
///
/// The constructor must accept fields in the order they are listed.
macro_rules! impl_score_ops {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        impl PartialOrd for $type {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::ops::Add for $type {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                $type::$ctor( $(self.$field + other.$field),+ )
            }
        }

        impl std::ops::Sub for $type {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                $type::$ctor( $(self.$field - other.$field),+ )
            }
        }

        impl std::ops::Neg for $type {
            type Output = Self;

            fn neg(self) -> Self {
                $type::$ctor( $(-self.$field),+ )
            }
        }
    };
}

/// Generates `multiply_long`, the checked level-wise ops and `abs` inside an `impl Score for Type` block.
macro_rules! impl_score_scale {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        fn multiply_long(&self, multiplicand: i64) -> Option<Self> {
            Some($type::$ctor( $( self.$field.checked_mul(multiplicand)? ),+ ))
        }

        fn checked_add(&self, other: &Self) -> Option<Self> {
            Some($type::$ctor( $( self.$field.checked_add(other.$field)? ),+ ))
        }

        fn checked_sub(&self, other: &Self) -> Option<Self> {
            Some($type::$ctor( $( self.$field.checked_sub(other.$field)? ),+ ))
        }

        fn abs(&self) -> Self {
            $type::$ctor( $( self.$field.abs() ),+ )
        }
    };
}

/// Generates `ParseableScore` for scores using the `"Xsuffix/Ysuffix"` format.
macro_rules! impl_score_parse {
    ($type:ident { $($field:ident => $suffix:literal),+ } => $ctor:ident) => {
        impl $crate::score::traits::ParseableScore for $type {
            fn parse(s: &str) -> Result<Self, $crate::score::traits::ScoreParseError> {
                let s = s.trim();
                let suffixes: &[&str] = &[ $($suffix),+ ];
                let mut parts = s.split('/');

                $(
                    let $field = {
                        let part = parts.next().map(str::trim).ok_or_else(|| {
                            $crate::score::traits::ScoreParseError::new(format!(
                                "invalid {} '{}': expected {} parts separated by '/'",
                                stringify!($type), s, suffixes.len()
                            ))
                        })?;
                        let number = part.strip_suffix($suffix).ok_or_else(|| {
                            $crate::score::traits::ScoreParseError::new(format!(
                                "{} part '{}' must end with '{}'",
                                stringify!($field), part, $suffix
                            ))
                        })?;
                        number.parse::<i64>().map_err(|e| {
                            $crate::score::traits::ScoreParseError::new(format!(
                                "invalid {} score '{}': {}", $suffix, number, e
                            ))
                        })?
                    };
                )+

                if parts.next().is_some() {
                    return Err($crate::score::traits::ScoreParseError::new(format!(
                        "invalid {} '{}': expected {} parts separated by '/'",
                        stringify!($type), s, suffixes.len()
                    )));
                }

                Ok($type::$ctor( $($field),+ ))
            }
        }
    };
}
