//! Element types.
//!
//! Operators are written once over `T: Element`. The trait supplies what the
//! reference sequence operators need from a type: a default value for the
//! `*_or_default` family and an intrinsic equality for set operators.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Tag naming the element type participating in an operator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementType(&'static str);

impl ElementType {
    /// Create a tag from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A type that can flow through Quarry operators.
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static {
    /// Type tag used in operator invocations and diagnostics.
    fn element_type() -> ElementType;

    /// Value produced by `*_or_default` operators when no default is given.
    fn type_default() -> Self;

    /// Intrinsic equality used when no comparer is supplied.
    fn default_eq(&self, other: &Self) -> bool;

    /// Hash consistent with [`Element::default_eq`].
    fn default_hash<H: Hasher>(&self, state: &mut H);
}

macro_rules! impl_element_for_eq {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                fn element_type() -> ElementType {
                    ElementType::new($name)
                }

                fn type_default() -> Self {
                    <$ty>::default()
                }

                fn default_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn default_hash<H: Hasher>(&self, state: &mut H) {
                    self.hash(state);
                }
            }
        )*
    };
}

impl_element_for_eq! {
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    String => "string",
    () => "unit",
}

// Floats compare the way the reference operators do: NaN equals NaN and the
// two zeros are equal, so hashing must collapse them too.
macro_rules! impl_element_for_float {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                fn element_type() -> ElementType {
                    ElementType::new($name)
                }

                fn type_default() -> Self {
                    0.0
                }

                #[allow(clippy::float_cmp)]
                fn default_eq(&self, other: &Self) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }

                fn default_hash<H: Hasher>(&self, state: &mut H) {
                    let bits = if self.is_nan() {
                        <$ty>::NAN.to_bits()
                    } else if *self == 0.0 {
                        (0.0 as $ty).to_bits()
                    } else {
                        self.to_bits()
                    };
                    bits.hash(state);
                }
            }
        )*
    };
}

impl_element_for_float! {
    f32 => "f32",
    f64 => "f64",
}

impl<T: Element> Element for Option<T> {
    fn element_type() -> ElementType {
        // Nullable variants share the tag family of the inner type.
        match T::element_type().name() {
            "bool" => ElementType::new("bool?"),
            "i32" => ElementType::new("i32?"),
            "i64" => ElementType::new("i64?"),
            "f32" => ElementType::new("f32?"),
            "f64" => ElementType::new("f64?"),
            "string" => ElementType::new("string?"),
            _ => ElementType::new("option"),
        }
    }

    fn type_default() -> Self {
        None
    }

    fn default_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.default_eq(b),
            _ => false,
        }
    }

    fn default_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            None => 0u8.hash(state),
            Some(value) => {
                1u8.hash(state);
                value.default_hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::hash::DefaultHasher;

    use super::*;

    fn hash_of<T: Element>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.default_hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(i32::element_type().name(), "i32");
        assert_eq!(String::element_type().to_string(), "string");
        assert_eq!(Option::<f64>::element_type().name(), "f64?");
    }

    #[test]
    fn test_type_defaults() {
        assert_eq!(i64::type_default(), 0);
        assert_eq!(String::type_default(), "");
        assert!(!bool::type_default());
        assert_eq!(Option::<i32>::type_default(), None);
    }

    #[test]
    fn test_float_equality() {
        assert!(f64::NAN.default_eq(&f64::NAN));
        assert!(0.0f64.default_eq(&-0.0));
        assert_eq!(hash_of(&0.0f64), hash_of(&-0.0f64));
        assert_eq!(hash_of(&f32::NAN), hash_of(&-f32::NAN));
        assert!(!1.0f32.default_eq(&2.0));
    }

    #[test]
    fn test_option_equality() {
        assert!(Some(1).default_eq(&Some(1)));
        assert!(None::<i32>.default_eq(&None));
        assert!(!Some(1).default_eq(&None));
        assert_ne!(hash_of(&Some(0i32)), hash_of(&None::<i32>));
    }
}
