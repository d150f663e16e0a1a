//! Frame encryption and authentication.
//!
//! A session holds one direction's stream-cipher state: AES-256 in 8-bit
//! cipher feedback (CFB-8, NIST SP 800-38A) plus a frame counter feeding a
//! truncated SHA-256 tag. Sender and receiver counters advance in
//! lockstep; a single dropped or duplicated frame desynchronizes the pair
//! for the rest of the connection, so every verification failure is fatal.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;
use batchwire_core::constants::FRAME_TAG_SIZE;
use batchwire_core::error::{CodecError, Result};
use sha2::{Digest, Sha256};

/// AES-256 CFB-8 stream state.
///
/// Both directions run the block cipher forward; they differ only in which
/// byte feeds the shift register, so encryption and decryption are two
/// distinct stateful procedures.
struct Cfb8 {
    cipher: Aes256,
    register: [u8; 16],
}

impl Cfb8 {
    fn new(key: &[u8; 32], iv: [u8; 16]) -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(key)),
            register: iv,
        }
    }

    fn keystream_byte(&self) -> u8 {
        let mut block = GenericArray::clone_from_slice(&self.register);
        self.cipher.encrypt_block(&mut block);
        block[0]
    }

    fn shift_in(&mut self, feedback: u8) {
        self.register.copy_within(1.., 0);
        self.register[15] = feedback;
    }

    /// Encrypts in place; the produced ciphertext byte feeds back.
    fn encrypt(&mut self, data: &mut [u8]) {
        for byte in data {
            let ciphertext = *byte ^ self.keystream_byte();
            self.shift_in(ciphertext);
            *byte = ciphertext;
        }
    }

    /// Decrypts in place; the consumed ciphertext byte feeds back.
    fn decrypt(&mut self, data: &mut [u8]) {
        for byte in data {
            let ciphertext = *byte;
            *byte = ciphertext ^ self.keystream_byte();
            self.shift_in(ciphertext);
        }
    }
}

/// Per-direction encryption state for one connection.
///
/// Created once per direction and never reset; a new connection gets a new
/// session. Not safe to share across threads without synchronization: the
/// counter and cipher state mutate on every frame.
pub struct EncryptSession {
    secret: [u8; 32],
    counter: u64,
    cfb: Cfb8,
}

impl EncryptSession {
    /// Creates a session from the shared 32-byte secret.
    ///
    /// The CFB-8 shift register is seeded from the first 16 bytes of the
    /// secret and the frame counter starts at 0, so two sessions built
    /// from the same secret start in lockstep.
    pub fn new(secret: [u8; 32]) -> Self {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&secret[..16]);
        Self {
            cfb: Cfb8::new(&secret, iv),
            secret,
            counter: 0,
        }
    }

    /// Appends the frame tag to `payload` and encrypts the whole buffer in
    /// place. `payload` is the frame minus its header byte. Advances the
    /// counter.
    pub fn encrypt(&mut self, payload: &mut Vec<u8>) {
        self.encrypt_from(payload, 0);
    }

    /// As [`encrypt`](Self::encrypt), but leaves `buffer[..offset]`
    /// untouched so an encoder can keep the frame header in the same
    /// buffer.
    pub(crate) fn encrypt_from(&mut self, buffer: &mut Vec<u8>, offset: usize) {
        let tag = tag_for(self.counter, &buffer[offset..], &self.secret);
        self.counter = self.counter.wrapping_add(1);
        buffer.extend_from_slice(&tag);
        self.cfb.encrypt(&mut buffer[offset..]);
    }

    /// Decrypts `payload` in place without verifying it.
    pub fn decrypt(&mut self, payload: &mut [u8]) {
        self.cfb.decrypt(payload);
    }

    /// Verifies the trailing tag of a decrypted payload.
    ///
    /// The counter advances whether or not verification succeeds, keeping
    /// it in lockstep with the peer's; a failure here cannot be retried.
    pub fn verify(&mut self, payload: &[u8]) -> Result<()> {
        let counter = self.counter;
        self.counter = self.counter.wrapping_add(1);

        if payload.len() < FRAME_TAG_SIZE {
            return Err(CodecError::PayloadTooShort { length: payload.len() });
        }
        let (body, received) = payload.split_at(payload.len() - FRAME_TAG_SIZE);
        let expected = tag_for(counter, body, &self.secret);
        if !constant_time_eq(&expected, received) {
            return Err(CodecError::TagMismatch);
        }
        Ok(())
    }
}

/// First 8 bytes of `SHA-256(LE64(counter) ‖ payload ‖ secret)`.
fn tag_for(counter: u64, payload: &[u8], secret: &[u8; 32]) -> [u8; FRAME_TAG_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(counter.to_le_bytes());
    hasher.update(payload);
    hasher.update(secret);
    let digest = hasher.finalize();
    let mut tag = [0u8; FRAME_TAG_SIZE];
    tag.copy_from_slice(&digest[..FRAME_TAG_SIZE]);
    tag
}

fn constant_time_eq(a: &[u8; FRAME_TAG_SIZE], b: &[u8]) -> bool {
    if b.len() != FRAME_TAG_SIZE {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 32] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
        0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B,
        0x1C, 0x1D, 0x1E, 0x1F,
    ];

    fn session_pair() -> (EncryptSession, EncryptSession) {
        (EncryptSession::new(SECRET), EncryptSession::new(SECRET))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (mut sender, mut receiver) = session_pair();

        let mut payload = b"one ordinary frame payload".to_vec();
        let original = payload.clone();
        sender.encrypt(&mut payload);
        assert_ne!(&payload[..original.len()], original.as_slice());

        receiver.decrypt(&mut payload);
        receiver.verify(&payload).unwrap();
        payload.truncate(payload.len() - FRAME_TAG_SIZE);
        assert_eq!(payload, original);
    }

    #[test]
    fn test_roundtrip_many_frames_stay_in_lockstep() {
        let (mut sender, mut receiver) = session_pair();

        for i in 0..20usize {
            let mut payload = vec![i as u8; 3 + i * 7];
            let original = payload.clone();
            sender.encrypt(&mut payload);
            receiver.decrypt(&mut payload);
            receiver.verify(&payload).unwrap();
            payload.truncate(payload.len() - FRAME_TAG_SIZE);
            assert_eq!(payload, original);
        }
    }

    #[test]
    fn test_cipher_output_depends_on_history() {
        // The shift register carries state between frames; identical
        // plaintexts must not produce identical ciphertexts.
        let mut sender = EncryptSession::new(SECRET);
        let mut first = vec![7u8; 16];
        let mut second = vec![7u8; 16];
        sender.encrypt(&mut first);
        sender.encrypt(&mut second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_single_bit_tamper_detected() {
        let (mut sender, mut receiver) = session_pair();

        let mut payload = vec![0x5Au8; 64];
        sender.encrypt(&mut payload);
        payload[20] ^= 0x04;

        receiver.decrypt(&mut payload);
        assert!(matches!(receiver.verify(&payload), Err(CodecError::TagMismatch)));
    }

    #[test]
    fn test_counter_desync_is_permanent() {
        let (mut sender, mut receiver) = session_pair();

        let mut skipped = vec![1u8; 32];
        let mut delivered = vec![2u8; 32];
        let mut follow_up = vec![3u8; 32];
        sender.encrypt(&mut skipped);
        sender.encrypt(&mut delivered);
        sender.encrypt(&mut follow_up);

        // The first frame never arrives; the receiver's counter (and cipher
        // state) is now one step behind and never recovers.
        receiver.decrypt(&mut delivered);
        assert!(receiver.verify(&delivered).is_err());

        receiver.decrypt(&mut follow_up);
        assert!(receiver.verify(&follow_up).is_err());
    }

    #[test]
    fn test_payload_shorter_than_tag() {
        let mut receiver = EncryptSession::new(SECRET);
        let err = receiver.verify(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooShort { length: 4 }));
    }

    #[test]
    fn test_verify_failure_still_advances_counter() {
        let (mut sender, mut receiver) = session_pair();

        // Feed garbage first; the counter must advance anyway, so the
        // receiver can never silently fall back into sync.
        assert!(receiver.verify(&[0u8; 16]).is_err());

        let mut payload = vec![9u8; 16];
        sender.encrypt(&mut payload);
        receiver.decrypt(&mut payload);
        assert!(receiver.verify(&payload).is_err());
    }

    #[test]
    fn test_different_secrets_fail() {
        let mut sender = EncryptSession::new(SECRET);
        let mut other = [0xEEu8; 32];
        other[0] = 0x01;
        let mut receiver = EncryptSession::new(other);

        let mut payload = vec![4u8; 24];
        sender.encrypt(&mut payload);
        receiver.decrypt(&mut payload);
        assert!(receiver.verify(&payload).is_err());
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let (mut sender, mut receiver) = session_pair();

        let mut payload = Vec::new();
        sender.encrypt(&mut payload);
        assert_eq!(payload.len(), FRAME_TAG_SIZE);

        receiver.decrypt(&mut payload);
        receiver.verify(&payload).unwrap();
    }
}
