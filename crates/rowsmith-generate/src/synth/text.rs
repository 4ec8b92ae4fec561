use rand::Rng;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn pick_char<R: Rng + ?Sized>(alphabet: &[u8], rng: &mut R) -> char {
    alphabet[rng.random_range(0..alphabet.len())] as char
}

pub fn random_string<R: Rng + ?Sized>(alphabet: &[u8], len: usize, rng: &mut R) -> String {
    (0..len).map(|_| pick_char(alphabet, rng)).collect()
}

pub fn lowercase<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    random_string(LOWERCASE, len, rng)
}

pub fn alphanumeric<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    random_string(ALPHANUMERIC, len, rng)
}

/// `<local><1..=999>@<domain>`.
pub fn email<R: Rng + ?Sized>(local: &str, domain: &str, rng: &mut R) -> String {
    format!("{local}{}@{domain}", rng.random_range(1..=999))
}

/// Substitute `#` with a digit, `A` with an uppercase and `a` with a
/// lowercase letter; every other character is kept.
pub fn fill_pattern<R: Rng + ?Sized>(template: &[char], rng: &mut R) -> String {
    template
        .iter()
        .map(|ch| match ch {
            '#' => pick_char(DIGITS, rng),
            'A' => pick_char(UPPERCASE, rng),
            'a' => pick_char(LOWERCASE, rng),
            other => *other,
        })
        .collect()
}

/// Space-separated words: `include` first (up to the drawn count), padded
/// with random alphabetic words of 3 to 10 letters, then shuffled.
pub fn words<R: Rng + ?Sized>(min: u32, max: u32, include: &[String], rng: &mut R) -> String {
    use rand::seq::SliceRandom;

    let count = rng.random_range(min..=max) as usize;
    let mut picked: Vec<String> = include.iter().take(count).cloned().collect();
    while picked.len() < count {
        let len = rng.random_range(3..=10);
        picked.push(random_string(LETTERS, len, rng));
    }
    picked.shuffle(rng);
    picked.join(" ")
}
