use crate::{EccError, Point, Signature};
use hmac::{Hmac, Mac};
use kestrel_math::FieldElement;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A cyclic subgroup of a curve, given by its generator and prime order, over which
/// ECDSA signatures are produced and checked.
#[derive(Clone, Debug)]
pub struct Ecdsa<F> {
    generator: Point<F>,
    order: BigUint,
}

impl<F: FieldElement> Ecdsa<F> {
    /// Fails unless `generator` is a finite point with `order · generator = O`.
    pub fn new(generator: Point<F>, order: BigUint) -> Result<Self, EccError> {
        if generator.is_infinity() || order <= BigUint::one() || !generator.smul(&order).is_infinity() {
            return Err(EccError::InvalidGroup(generator.to_string(), order.to_string()));
        }
        Ok(Self { generator, order })
    }

    pub fn generator(&self) -> &Point<F> {
        &self.generator
    }

    pub fn order(&self) -> &BigUint {
        &self.order
    }

    pub fn check_secret(&self, secret: &BigUint) -> Result<(), EccError> {
        if secret.is_zero() || *secret >= self.order {
            return Err(EccError::ScalarOutOfRange(self.order.to_string()));
        }
        Ok(())
    }

    pub fn public_point(&self, secret: &BigUint) -> Point<F> {
        self.generator.smul(secret)
    }

    /// Signs digest `z` with a deterministic RFC 6979 nonce. The returned signature
    /// always carries the low `s` value.
    pub fn sign(&self, secret: &BigUint, z: &BigUint) -> Result<Signature, EccError> {
        self.check_secret(secret)?;
        Ok(self.sign_unchecked(secret, z))
    }

    pub(crate) fn sign_unchecked(&self, secret: &BigUint, z: &BigUint) -> Signature {
        let mut nonces = Rfc6979::new(&self.order, secret, z);
        loop {
            let k = nonces.next_candidate();
            if let Some(signature) = self.sign_with_nonce(secret, z, &k) {
                return signature;
            }
        }
    }

    /// Signs with an explicit nonce `k`. Returns `None` when `k` yields a zero `r` or
    /// `s`, in which case another nonce must be picked.
    pub fn sign_with_nonce(&self, secret: &BigUint, z: &BigUint, k: &BigUint) -> Option<Signature> {
        let n = &self.order;
        let r = self.generator.smul(k).x()?.value() % n;
        if r.is_zero() {
            return None;
        }
        let k_inv = mod_inverse(k, n);
        let mut s = ((z + &r * secret) * k_inv) % n;
        if s.is_zero() {
            return None;
        }
        if s > n >> 1 {
            s = n - s;
        }
        Some(Signature::new(r, s))
    }

    /// Accepts both low and high `s` values.
    pub fn verify(&self, public: &Point<F>, z: &BigUint, signature: &Signature) -> bool {
        if signature.check_range(&self.order).is_err() || public.is_infinity() {
            return false;
        }
        let n = &self.order;
        let s_inv = mod_inverse(signature.s(), n);
        let u = (z * &s_inv) % n;
        let v = (signature.r() * &s_inv) % n;
        let total = self.generator.smul(&u).add(&public.smul(&v));
        match total.x() {
            Some(x) => x.value() % n == *signature.r(),
            None => false,
        }
    }

    /// The first RFC 6979 nonce candidate for `secret` and `z`.
    pub fn deterministic_k(&self, secret: &BigUint, z: &BigUint) -> BigUint {
        Rfc6979::new(&self.order, secret, z).next_candidate()
    }
}

/// Inverse modulo a prime `n` by Fermat's little theorem.
fn mod_inverse(value: &BigUint, n: &BigUint) -> BigUint {
    value.modpow(&(n - 2u32), n)
}

/// HMAC-SHA256 deterministic nonce generation (RFC 6979, section 3.2).
struct Rfc6979<'a> {
    order: &'a BigUint,
    qlen: u64,
    rlen: usize,
    k: [u8; 32],
    v: [u8; 32],
    started: bool,
}

impl<'a> Rfc6979<'a> {
    fn new(order: &'a BigUint, secret: &BigUint, z: &BigUint) -> Self {
        let qlen = order.bits();
        let rlen = (qlen as usize).div_ceil(8);
        let mut generator = Self { order, qlen, rlen, k: [0u8; 32], v: [1u8; 32], started: false };

        let x = generator.int2octets(secret);
        let h = generator.int2octets(&(z % order));
        for round in [0x00u8, 0x01] {
            generator.k = generator.hmac(&[&generator.v[..], &[round], &x, &h]);
            generator.v = generator.hmac(&[&generator.v[..]]);
        }
        generator
    }

    fn hmac(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.k).expect("HMAC accepts keys of any length");
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().into()
    }

    fn int2octets(&self, value: &BigUint) -> Vec<u8> {
        let bytes = value.to_bytes_be();
        let mut out = vec![0u8; self.rlen.saturating_sub(bytes.len())];
        out.extend_from_slice(&bytes);
        out
    }

    fn bits2int(&self, bytes: &[u8]) -> BigUint {
        let value = BigUint::from_bytes_be(bytes);
        let blen = bytes.len() as u64 * 8;
        if blen > self.qlen { value >> (blen - self.qlen) } else { value }
    }

    fn next_candidate(&mut self) -> BigUint {
        loop {
            if self.started {
                self.k = self.hmac(&[&self.v[..], &[0x00]]);
                self.v = self.hmac(&[&self.v[..]]);
            }
            self.started = true;

            let mut t = Vec::with_capacity(self.rlen.max(32));
            while t.len() < self.rlen {
                self.v = self.hmac(&[&self.v[..]]);
                t.extend_from_slice(&self.v);
            }
            let k = self.bits2int(&t);
            if !k.is_zero() && k < *self.order {
                return k;
            }
        }
    }
}
