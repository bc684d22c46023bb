//! Room code generation
//!
//! Codes are drawn letter by letter from `A..=Z`. Uniqueness is checked by the
//! registry, not here.

use rand::Rng;

use crate::types::RoomCode;

/// Default number of letters in a room code (26^4 possible codes)
pub const DEFAULT_CODE_LENGTH: usize = 4;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Source of candidate room codes
pub trait CodeGenerator: Send {
    /// Produce a code of exactly `length` uppercase letters
    fn generate(&mut self, length: usize) -> RoomCode;
}

/// Uniform random generator over the 26-letter alphabet
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&mut self, length: usize) -> RoomCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }
}
