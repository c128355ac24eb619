//! Synthetic record generation for the "create" command.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::NewThing;

const ADJECTIVES: &[&str] = &[
    "Small", "Ergonomic", "Rustic", "Intelligent", "Gorgeous", "Incredible", "Fantastic",
    "Practical", "Sleek", "Awesome", "Generic", "Handcrafted", "Handmade", "Licensed",
    "Refined", "Unbranded", "Tasty",
];

const MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Concrete", "Plastic", "Cotton", "Granite", "Rubber", "Metal", "Soft",
    "Fresh", "Frozen", "Bronze", "Marble",
];

const PRODUCTS: &[&str] = &[
    "Chair", "Car", "Computer", "Keyboard", "Mouse", "Bike", "Ball", "Gloves", "Pants", "Shirt",
    "Table", "Shoes", "Hat", "Towels", "Soap", "Tuna", "Chicken", "Fish", "Cheese", "Bacon",
    "Pizza", "Salad", "Sausages", "Chips",
];

/// Highest weight a generated thing can have.
pub const MAX_WEIGHT: u32 = 100;

/// Produces the payload for a new thing owned by `owner`.
pub trait ThingFactory: Send {
    fn next_thing(&mut self, owner: &str) -> NewThing;
}

/// Builds product-style names and uniform weights from a random source.
pub struct RandomThingFactory<R> {
    rng: R,
}

impl RandomThingFactory<StdRng> {
    /// Factory seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomThingFactory<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn pick(&mut self, words: &[&'static str]) -> &'static str {
        words.choose(&mut self.rng).copied().unwrap_or("Thing")
    }

    /// A name of the form `<adjective> <material> <product>`.
    pub fn product_name(&mut self) -> String {
        let adjective = self.pick(ADJECTIVES);
        let material = self.pick(MATERIALS);
        let product = self.pick(PRODUCTS);
        format!("{} {} {}", adjective, material, product)
    }
}

impl<R: Rng + Send> ThingFactory for RandomThingFactory<R> {
    fn next_thing(&mut self, owner: &str) -> NewThing {
        let name = self.product_name();
        let weight = self.rng.gen_range(0..=MAX_WEIGHT);
        NewThing::new(name, weight, owner)
    }
}
