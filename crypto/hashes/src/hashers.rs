use crate::{Hash, Hash160};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> Hash {
    Hash::from_bytes(Sha256::digest(data).into())
}

/// Double SHA-256.
pub fn hash256(data: &[u8]) -> Hash {
    Hash::from_bytes(Sha256::digest(Sha256::digest(data)).into())
}

pub fn ripemd160(data: &[u8]) -> Hash160 {
    Hash160::from_bytes(Ripemd160::digest(data).into())
}

/// RIPEMD-160 of SHA-256, used for public key and script hashes.
pub fn hash160(data: &[u8]) -> Hash160 {
    Hash160::from_bytes(Ripemd160::digest(Sha256::digest(data)).into())
}

/// SHA-1 digest. Only exposed for the legacy script opcode.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        struct TestCase {
            name: &'static str,
            got: String,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                name: "sha256",
                got: sha256(b"abc").to_string(),
                expected: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            },
            TestCase {
                name: "sha256 empty",
                got: sha256(b"").to_string(),
                expected: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            },
            TestCase {
                name: "hash256",
                got: hash256(b"hello").to_string(),
                expected: "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50",
            },
            TestCase { name: "ripemd160", got: ripemd160(b"abc").to_string(), expected: "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc" },
            TestCase { name: "hash160 empty", got: hash160(b"").to_string(), expected: "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb" },
            TestCase { name: "sha1", got: hex::encode(sha1(b"abc")), expected: "a9993e364706816aba3e25717850c26c9cd0d89d" },
        ];

        for test in tests {
            assert_eq!(test.got, test.expected, "test '{}' failed", test.name);
        }
    }
}
