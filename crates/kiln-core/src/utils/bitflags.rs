// Copyright 2026 the kiln project developers
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

//! A minimal bitflags macro for the crate's usage/bind flag types.

/// Declares a transparent bitflag struct with the usual set operations.
///
/// Generated types support `|`, `&`, `!` (masked to defined bits),
/// `contains`, `intersects`, and a `Debug` impl that lists set flag names.
#[macro_export]
macro_rules! kiln_bitflags {
    (
        $(#[$outer:meta])*
        $vis:vis struct $Name:ident: $T:ty {
            $(
                $(#[$inner:meta])*
                const $Flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $Name {
            bits: $T,
        }

        impl $Name {
            $(
                $(#[$inner])*
                pub const $Flag: Self = Self { bits: $value };
            )*

            /// Returns a flag set with no bits set.
            pub const fn empty() -> Self {
                Self { bits: 0 }
            }

            /// Returns a flag set with every defined bit set.
            pub const fn all() -> Self {
                Self { bits: 0 $(| $value)* }
            }

            /// Returns the raw bit representation.
            pub const fn bits(&self) -> $T {
                self.bits
            }

            /// Builds a flag set from raw bits, dropping undefined bits.
            pub const fn from_bits_truncate(bits: $T) -> Self {
                Self { bits: bits & Self::all().bits }
            }

            /// Returns `true` if no bits are set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if every bit of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any bit of `other` is set in `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }
        }

        impl core::ops::BitOr for $Name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self { bits: self.bits | rhs.bits }
            }
        }

        impl core::ops::BitOrAssign for $Name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.bits |= rhs.bits;
            }
        }

        impl core::ops::BitAnd for $Name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self { bits: self.bits & rhs.bits }
            }
        }

        impl core::ops::BitAndAssign for $Name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.bits &= rhs.bits;
            }
        }

        impl core::ops::Not for $Name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits & Self::all().bits }
            }
        }

        impl core::fmt::Debug for $Name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut first = true;
                $(
                    if self.contains(Self::$Flag) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        first = false;
                        f.write_str(stringify!($Flag))?;
                    }
                )*
                if first {
                    f.write_str("(empty)")?;
                }
                Ok(())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    kiln_bitflags! {
        /// Test-only flags.
        pub struct TestFlags: u32 {
            /// Bit 0.
            const A = 1 << 0;
            /// Bit 1.
            const B = 1 << 1;
            /// Bit 2.
            const C = 1 << 2;
        }
    }

    #[test]
    fn set_operations() {
        let ab = TestFlags::A | TestFlags::B;
        assert!(ab.contains(TestFlags::A));
        assert!(ab.contains(TestFlags::B));
        assert!(!ab.contains(TestFlags::C));
        assert!(ab.intersects(TestFlags::B | TestFlags::C));
        assert!(!ab.intersects(TestFlags::C));
        assert_eq!((ab & TestFlags::A), TestFlags::A);
        assert_eq!(!TestFlags::A, TestFlags::B | TestFlags::C);
    }

    #[test]
    fn truncates_undefined_bits() {
        let flags = TestFlags::from_bits_truncate(0xFF);
        assert_eq!(flags, TestFlags::all());
        assert_eq!(flags.bits(), 0b111);
    }

    #[test]
    fn debug_lists_flag_names() {
        assert_eq!(format!("{:?}", TestFlags::A | TestFlags::C), "A | C");
        assert_eq!(format!("{:?}", TestFlags::empty()), "(empty)");
    }
}
