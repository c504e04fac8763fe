//! Nickname Generation
//!
//! Random display handles for accounts registered without a nickname.

use rand::{seq::SliceRandom, Rng};

const ADJECTIVES: &[&str] = &[
    "clever", "jolly", "brave", "sly", "gentle", "swift", "quiet", "bold", "lucky", "calm",
    "eager", "fuzzy", "happy", "mighty", "nimble", "proud", "witty", "zesty", "shiny", "sunny",
];

const ANIMALS: &[&str] = &[
    "panda", "fox", "raccoon", "koala", "lion", "otter", "badger", "falcon", "heron", "lynx",
    "marmot", "owl", "puffin", "quokka", "seal", "tiger", "walrus", "yak", "zebra", "wombat",
];

/// Generate a nickname in the form `adjective_animal_NNN`
pub fn generate_nickname() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("quiet");
    let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("owl");
    let number: u16 = rng.gen_range(0..1000);
    format!("{}_{}_{}", adjective, animal, number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::validate_nickname;

    #[test]
    fn test_generated_nickname_shape() {
        let nickname = generate_nickname();
        let parts: Vec<&str> = nickname.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(ANIMALS.contains(&parts[1]));
        assert!(parts[2].parse::<u16>().unwrap() < 1000);
    }

    #[test]
    fn test_generated_nickname_passes_validation() {
        for _ in 0..50 {
            assert!(validate_nickname(&generate_nickname()));
        }
    }
}
