use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;

/// Category to word-list mapping backing the secret-word draw. Pure data;
/// the session never looks inside a pack beyond drawing uniformly from it.
#[derive(Debug, Clone)]
pub struct WordBank {
    packs: Vec<(String, Vec<String>)>,
}

const DEFAULT_PACKS: &[(&str, &[&str])] = &[
    (
        "Animals",
        &[
            "Lion", "Penguin", "Giraffe", "Octopus", "Kangaroo", "Wolf", "Dolphin", "Panda",
            "Eagle", "Turtle", "Camel", "Hedgehog", "Otter", "Raccoon", "Moose", "Chameleon",
        ],
    ),
    (
        "Food",
        &[
            "Pizza", "Sushi", "Burger", "Tacos", "Pancakes", "Ramen", "Lasagna", "Burrito",
            "Dumplings", "Meatballs", "Popcorn", "Falafel", "Omelette", "Hotdog", "Paella",
        ],
    ),
    (
        "Places",
        &[
            "School", "Hospital", "Beach", "Library", "Airport", "Museum", "Casino", "Prison",
            "Lighthouse", "Stadium", "Bakery", "Harbor", "Castle", "Aquarium", "Cinema",
        ],
    ),
    (
        "Jobs",
        &[
            "Doctor", "Teacher", "Astronaut", "Chef", "Firefighter", "Magician", "Detective",
            "Pilot", "Carpenter", "Clown", "Veterinarian", "Architect", "Spy", "Judge",
        ],
    ),
    (
        "Sports",
        &[
            "Soccer", "Tennis", "Swimming", "Boxing", "Volleyball", "Surfing", "Archery",
            "Bowling", "Karate", "Rowing", "Fencing", "Curling", "Marathon", "Gymnastics",
        ],
    ),
    (
        "Transport",
        &[
            "Bicycle", "Helicopter", "Submarine", "Tractor", "Rocket", "Ferry", "Scooter",
            "Tram", "Sled", "Gondola", "Ambulance", "Skateboard", "Hot Air Balloon",
        ],
    ),
    (
        "Household",
        &[
            "Umbrella", "Toothbrush", "Mirror", "Scissors", "Kettle", "Vacuum", "Candle",
            "Ladder", "Curtains", "Toaster", "Broom", "Pillow", "Ironing Board", "Doormat",
        ],
    ),
    (
        "Nature",
        &[
            "Volcano", "Waterfall", "Glacier", "Rainbow", "Desert", "Jungle", "Lightning",
            "Coral Reef", "Meadow", "Canyon", "Swamp", "Island", "Avalanche", "Geyser",
        ],
    ),
];

impl Default for WordBank {
    fn default() -> Self {
        Self {
            packs: DEFAULT_PACKS
                .iter()
                .map(|(category, words)| {
                    (
                        category.to_string(),
                        words.iter().map(|w| w.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl WordBank {
    /// Builds a bank from custom packs; empty word lists are dropped.
    pub fn from_packs(packs: HashMap<String, Vec<String>>) -> Self {
        let mut packs: Vec<_> = packs
            .into_iter()
            .filter(|(_, words)| !words.is_empty())
            .collect();
        packs.sort_by(|a, b| a.0.cmp(&b.0));
        Self { packs }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.packs.iter().map(|(category, _)| category.as_str())
    }

    /// Uniform category, then uniform word within it. None on an empty bank.
    pub fn assign(&self, rng: &mut impl Rng) -> Option<(String, String)> {
        let (category, words) = self.packs.choose(rng)?;
        let word = words.choose(rng)?;
        Some((category.clone(), word.clone()))
    }
}
