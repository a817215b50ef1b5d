// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use clientdesk_app::{MemoryStore, NewClient, UserId};
use time::Date;
use time::macros::date;

const FIRST_NAMES: [&str; 16] = [
    "Camille", "Léa", "Hugo", "Manon", "Lucas", "Chloé", "Nathan", "Inès", "Théo", "Jade",
    "Louis", "Sarah", "Jules", "Emma", "Malik", "Zoé",
];
const LAST_NAMES: [&str; 16] = [
    "Martin", "Bernard", "Dubois", "Thomas", "Robert", "Richard", "Petit", "Durand", "Leroy",
    "Moreau", "Simon", "Laurent", "Lefèvre", "Michel", "Garcia", "Fournier",
];

const STREET_KINDS: [&str; 6] = ["rue", "avenue", "boulevard", "impasse", "allée", "place"];
const STREET_NAMES: [&str; 14] = [
    "Victor Hugo",
    "de la République",
    "Jean Jaurès",
    "des Lilas",
    "du Général de Gaulle",
    "Pasteur",
    "des Écoles",
    "de la Gare",
    "Voltaire",
    "du Moulin",
    "des Tilleuls",
    "Gambetta",
    "de la Paix",
    "du Château",
];
const CITIES: [(&str, &str); 12] = [
    ("75011", "Paris"),
    ("69002", "Lyon"),
    ("13001", "Marseille"),
    ("31000", "Toulouse"),
    ("33000", "Bordeaux"),
    ("59000", "Lille"),
    ("44000", "Nantes"),
    ("67000", "Strasbourg"),
    ("34000", "Montpellier"),
    ("35000", "Rennes"),
    ("06000", "Nice"),
    ("21000", "Dijon"),
];
const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const OLDEST_BIRTH_DATE: Date = date!(1940 - 01 - 01);
const YOUNGEST_BIRTH_DATE: Date = date!(2006 - 12 - 31);

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic generator of plausible client drafts. The same seed always
/// yields the same sequence.
#[derive(Debug, Clone)]
pub struct ClientFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl ClientFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn owner_name(&mut self) -> String {
        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES))
    }

    /// Two letters then six digits, e.g. `KD482913`.
    pub fn license_number(&mut self) -> String {
        let first = LETTERS[self.rng.int_n(LETTERS.len())] as char;
        let second = LETTERS[self.rng.int_n(LETTERS.len())] as char;
        format!("{first}{second}{:06}", self.rng.int_n(1_000_000))
    }

    pub fn phone(&mut self) -> String {
        let prefix = if self.rng.int_n(2) == 0 { "06" } else { "07" };
        let groups: Vec<String> = (0..4)
            .map(|_| format!("{:02}", self.rng.int_n(100)))
            .collect();
        format!("{prefix} {}", groups.join(" "))
    }

    /// Street line and city line separated by a newline.
    pub fn address(&mut self) -> String {
        let number = self.rng.int_n(180) + 1;
        let kind = self.pick(&STREET_KINDS);
        let street = self.pick(&STREET_NAMES);
        let (postcode, city) = CITIES[self.rng.int_n(CITIES.len())];
        format!("{number} {kind} {street}\n{postcode} {city}")
    }

    pub fn birth_date(&mut self) -> Date {
        let start = OLDEST_BIRTH_DATE.to_julian_day();
        let span = YOUNGEST_BIRTH_DATE.to_julian_day() - start + 1;
        let offset = self.rng.int_n(span as usize) as i32;
        Date::from_julian_day(start + offset).unwrap_or(OLDEST_BIRTH_DATE)
    }

    pub fn client(&mut self, owner_id: UserId) -> NewClient {
        NewClient {
            license_number: self.license_number(),
            phone: self.phone(),
            address: self.address(),
            birth_date: self.birth_date(),
            owner_id,
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Memory store holding `count` fake clients owned by `owner`, whose display
/// name is generated from the same seed.
pub fn seeded_store(seed: u64, count: usize, owner: UserId) -> MemoryStore {
    let mut faker = ClientFaker::new(seed);
    let owner_name = faker.owner_name();
    let mut store = MemoryStore::new().with_owner(owner, &owner_name);
    for _ in 0..count {
        store.insert(&faker.client(owner));
    }
    store
}

#[cfg(test)]
mod tests {
    use super::{ClientFaker, OLDEST_BIRTH_DATE, YOUNGEST_BIRTH_DATE, seeded_store};
    use clientdesk_app::{ClientId, UserId};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_clients() {
        let mut left = ClientFaker::new(42);
        let mut right = ClientFaker::new(42);

        for _ in 0..5 {
            assert_eq!(left.client(UserId::new(1)), right.client(UserId::new(1)));
        }
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(ClientFaker::new(0).seed(), 1);
    }

    #[test]
    fn client_fields_are_filled() {
        let mut faker = ClientFaker::new(7);
        for _ in 0..50 {
            let client = faker.client(UserId::new(3));
            assert_eq!(client.license_number.len(), 8);
            assert!(client.phone.starts_with("06") || client.phone.starts_with("07"));
            assert_eq!(client.address.lines().count(), 2, "{}", client.address);
            assert!((OLDEST_BIRTH_DATE..=YOUNGEST_BIRTH_DATE).contains(&client.birth_date));
            assert_eq!(client.owner_id, UserId::new(3));
        }
    }

    #[test]
    fn variety_across_seeds() {
        let licenses: BTreeSet<String> = (1_u64..=20)
            .map(|seed| ClientFaker::new(seed).license_number())
            .collect();
        assert!(licenses.len() > 15, "got {licenses:?}");
    }

    #[test]
    fn seeded_store_assigns_sequential_ids_and_owner() {
        let store = seeded_store(9, 4, UserId::new(2));
        let clients = store.clients();

        assert_eq!(clients.len(), 4);
        assert_eq!(clients[0].id, ClientId::new(1));
        assert_eq!(clients[3].id, ClientId::new(4));
        assert!(clients.iter().all(|client| !client.owner_name.is_empty()));
        assert_eq!(
            seeded_store(9, 4, UserId::new(2)).clients(),
            clients,
            "seeded store must be reproducible"
        );
    }
}
