//! Random names and file bodies.

use pounder_config::ContentConfig;
use rand::Rng;

/// Characters used for generated names.
const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz012345";

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

fn random_chars<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
        .collect()
}

/// An 8.3 style file name, e.g. `k2fq0a4x.b3m`.
pub fn random_file_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}.{}", random_chars(rng, 8), random_chars(rng, 3))
}

/// An eight character directory name with no extension.
pub fn random_directory_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_chars(rng, 8)
}

/// Between zero and `max_repetitions - 1` lines of the phrase, each followed
/// by a number below 1000 and a line terminator.
pub fn random_content<R: Rng + ?Sized>(rng: &mut R, config: &ContentConfig) -> String {
    let lines = rng.gen_range(0..config.max_repetitions.max(1));
    let mut content = String::new();
    for _ in 0..lines {
        content.push_str(&config.phrase);
        content.push_str(&rng.gen_range(0..1000u32).to_string());
        content.push_str(LINE_ENDING);
    }
    content
}
