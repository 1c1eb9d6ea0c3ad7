mod hashers;

pub use hashers::{hash160, hash256, ripemd160, sha1, sha256};

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::{self, FromStr};

pub const HASH_SIZE: usize = 32;
pub const HASH160_SIZE: usize = 20;

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Clone, Copy, Hash, Default, Debug, Serialize, Deserialize)]
        pub struct $name([u8; $size]);

        impl $name {
            #[inline(always)]
            pub const fn from_bytes(bytes: [u8; $size]) -> Self {
                $name(bytes)
            }

            #[inline(always)]
            pub const fn as_bytes(&self) -> [u8; $size] {
                self.0
            }

            /// Fails with `InvalidStringLength` when `bytes` is not exactly the hash width.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, hex::FromHexError> {
                <[u8; $size]>::try_from(bytes).map($name).map_err(|_| hex::FromHexError::InvalidStringLength)
            }
        }

        impl AsRef<[u8]> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let mut hex = [0u8; $size * 2];
                hex::encode_to_slice(&self.0, &mut hex).expect("The output is exactly twice the size of the input");
                f.write_str(str::from_utf8(&hex).expect("hex is always valid UTF-8"))
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; $size];
                hex::decode_to_slice(hash_str, &mut bytes)?;
                Ok($name(bytes))
            }
        }
    };
}

hash_type!(
    /// A 32 byte digest, as produced by [`sha256`] and [`hash256`].
    Hash,
    HASH_SIZE
);

hash_type!(
    /// A 20 byte digest, as produced by [`hash160`] and [`ripemd160`].
    Hash160,
    HASH160_SIZE
);
