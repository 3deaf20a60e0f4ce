use crate::Generator;
use parcel_core::ShortCode;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "ancient", "autumn", "bold", "brave", "bright", "calm", "clever", "cosmic", "crimson",
    "curly", "daring", "dusty", "eager", "electric", "fancy", "fierce", "fluffy", "frosty",
    "gentle", "giant", "golden", "happy", "hidden", "humble", "icy", "jolly", "lively", "lucky",
    "mellow", "misty", "nimble", "noble", "odd", "patient", "plucky", "polite", "proud", "quick",
    "quiet", "rapid", "rusty", "shiny", "silent", "silver", "sleepy", "sly", "snowy", "solar",
    "spicy", "steady", "stormy", "sunny", "swift", "tidy", "tiny", "velvet", "vivid", "wandering",
    "wild", "windy", "wise", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "bison", "canyon", "cedar", "comet", "coral", "crane", "dolphin", "dune",
    "eagle", "ember", "falcon", "fern", "fjord", "fox", "galaxy", "gecko", "glacier", "harbor",
    "hawk", "heron", "island", "jaguar", "kettle", "koala", "lagoon", "lantern", "lemur", "lynx",
    "maple", "meadow", "meteor", "moose", "nebula", "newt", "oasis", "orca", "otter", "owl",
    "panda", "pebble", "pine", "puffin", "quartz", "raven", "reef", "river", "robin", "sparrow",
    "summit", "tiger", "tulip", "tundra", "valley", "violet", "walrus", "willow", "wolf",
    "yak", "zebra", "zephyr", "acorn", "bramble",
];

/// Human-readable `adjective-noun` codes, e.g. `brave-otter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPair;

impl WordPair {
    pub fn new() -> Self {
        Self
    }

    /// Number of distinct codes this generator can produce.
    pub fn combinations() -> usize {
        ADJECTIVES.len() * NOUNS.len()
    }
}

impl Generator for WordPair {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.random_range(0..NOUNS.len())];
        ShortCode::new_unchecked(format!("{adjective}-{noun}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_valid_adjective_noun_codes() {
        let generator = WordPair::new();
        for _ in 0..500 {
            let code = generator.generate();
            assert!(ShortCode::new(code.as_str()).is_ok(), "invalid: {code}");
            let (adjective, noun) = code.as_str().split_once('-').unwrap();
            assert!(ADJECTIVES.contains(&adjective));
            assert!(NOUNS.contains(&noun));
        }
    }

    #[test]
    fn word_lists_have_no_duplicates() {
        let mut adjectives = ADJECTIVES.to_vec();
        adjectives.sort_unstable();
        adjectives.dedup();
        assert_eq!(adjectives.len(), ADJECTIVES.len());

        let mut nouns = NOUNS.to_vec();
        nouns.sort_unstable();
        nouns.dedup();
        assert_eq!(nouns.len(), NOUNS.len());

        assert_eq!(WordPair::combinations(), ADJECTIVES.len() * NOUNS.len());
    }
}
