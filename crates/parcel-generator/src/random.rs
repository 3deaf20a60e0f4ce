use crate::error::AllocationError;
use crate::Generator;
use parcel_core::ShortCode;
use rand::Rng;

/// The default code alphabet, `[A-Za-z0-9]`.
pub const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

/// Fixed-length random tokens drawn uniformly from an alphabet.
#[derive(Debug, Clone)]
pub struct RandomCode {
    alphabet: Vec<char>,
    length: usize,
}

impl RandomCode {
    /// Creates a generator for `length`-character codes over `alphabet`.
    ///
    /// The alphabet must be non-empty ASCII alphanumerics and the length
    /// must produce a valid [`ShortCode`].
    pub fn new(alphabet: &str, length: usize) -> Result<Self, AllocationError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(AllocationError::InvalidSettings(format!(
                "code length must be between {MIN_LENGTH} and {MAX_LENGTH}, got {length}"
            )));
        }

        let mut chars: Vec<char> = alphabet.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        if chars.is_empty() || !chars.iter().all(char::is_ascii_alphanumeric) {
            return Err(AllocationError::InvalidSettings(format!(
                "alphabet must be non-empty ascii alphanumerics: '{alphabet}'"
            )));
        }

        Ok(Self {
            alphabet: chars,
            length,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Generator for RandomCode {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect();
        ShortCode::new_unchecked(code)
    }
}
