// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A macro to define small flag sets (affinities, channel drop modes).

/// Defines a `Copy` flag-set newtype with set operations, a `FLAGS` table of the
/// named flags, and a `Debug` implementation listing the flags that are set.
#[macro_export]
macro_rules! strata_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Every named flag, in declaration order.
            pub const FLAGS: &'static [(&'static str, Self)] = &[
                $( (stringify!($flag_name), Self { bits: $flag_value }), )*
            ];

            /// Creates a flag set from raw bits. Unknown bits are kept.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw value of the flag set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if all flags in `other` are contained within `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is contained within `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Inserts the flags in `other` into `self`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the flags in `other` from `self`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Returns a new `Self` with `other` flags inserted.
            #[must_use]
            pub const fn with(mut self, other: Self) -> Self {
                self.bits |= other.bits;
                self
            }

            /// Iterates the named, non-empty flags contained in `self`.
            pub fn iter(self) -> impl Iterator<Item = Self> {
                Self::FLAGS
                    .iter()
                    .map(|(_, flag)| *flag)
                    .filter(move |flag| !flag.is_empty() && self.contains(*flag))
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut remaining = self.bits;
                let mut first = true;

                write!(f, "{} {{ ", stringify!($name))?;
                for (flag_name, flag) in Self::FLAGS {
                    if flag.bits != 0 && (remaining & flag.bits) == flag.bits {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", flag_name)?;
                        remaining &= !flag.bits;
                        first = false;
                    }
                }

                if remaining != 0 {
                    if !first {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", remaining)?;
                    first = false;
                }

                if first {
                    write!(f, "EMPTY")?;
                }

                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::strata_bitflags;

    strata_bitflags! {
        /// Flags used to exercise the macro.
        pub struct TestFlags: u32 {
            const FLAG_A = 1 << 0;
            const FLAG_B = 1 << 1;
            const FLAG_C = 1 << 2;
            const COMBINED_AC = 1 | (1 << 2);
        }
    }

    #[test]
    fn test_empty_flags() {
        let flags = TestFlags::EMPTY;
        assert!(flags.is_empty());
        assert!(flags.contains(TestFlags::EMPTY));
        assert!(!flags.contains(TestFlags::FLAG_A));
        assert_eq!(TestFlags::default(), TestFlags::EMPTY);
        assert_eq!(format!("{:?}", flags), "TestFlags { EMPTY }");
    }

    #[test]
    fn test_multiple_flags_debug() {
        let flags = TestFlags::FLAG_A | TestFlags::FLAG_C;
        assert_eq!(flags.bits(), 0b101);
        assert!(!flags.contains(TestFlags::FLAG_B));
        // The first matching named flag wins, so the combined constant is never printed.
        assert_eq!(format!("{:?}", flags), "TestFlags { FLAG_A | FLAG_C }");
    }

    #[test]
    fn test_unknown_bits_are_reported() {
        let flags = TestFlags::from_bits_truncate(0b1_0001);
        assert_eq!(format!("{:?}", flags), "TestFlags { FLAG_A | UNKNOWN(0x10) }");
    }

    #[test]
    fn test_insert_remove() {
        let mut flags = TestFlags::FLAG_A;
        flags.insert(TestFlags::FLAG_B);
        assert!(flags.contains(TestFlags::FLAG_A | TestFlags::FLAG_B));
        flags.remove(TestFlags::FLAG_A);
        assert_eq!(flags, TestFlags::FLAG_B);
        assert!(flags.intersects(TestFlags::FLAG_B | TestFlags::FLAG_C));
    }

    #[test]
    fn test_iter_yields_named_flags_in_declaration_order() {
        let flags = TestFlags::FLAG_C | TestFlags::FLAG_A;
        let names: Vec<_> = flags.iter().map(|f| format!("{f:?}")).collect();
        // COMBINED_AC is contained too and is listed after the single flags.
        assert_eq!(
            names,
            vec![
                "TestFlags { FLAG_A }",
                "TestFlags { FLAG_C }",
                "TestFlags { FLAG_A | FLAG_C }",
            ]
        );
    }
}
