//! Demo catalog used by `pazar-cli seed` and by the in-memory backend.

/// Size labels, in id order.
pub const SIZES: &[&str] = &["S", "M", "L"];

/// A product with its price in minor units and stock per size label.
#[derive(Debug, Clone, Copy)]
pub struct DemoProduct {
    pub name: &'static str,
    pub price_minor: i64,
    pub stock: &'static [(&'static str, u32)],
}

#[derive(Debug, Clone, Copy)]
pub struct DemoStore {
    pub name: &'static str,
    pub products: &'static [DemoProduct],
}

/// Customer profiles with a default delivery address.
pub const DEMO_PROFILES: &[(i32, &str)] = &[
    (1, "Bagdat Cd. 120, Kadikoy, Istanbul"),
    (2, "Ataturk Blv. 45, Cankaya, Ankara"),
];

pub const DEMO_STORES: &[DemoStore] = &[
    DemoStore {
        name: "Mavi",
        products: &[
            DemoProduct {
                name: "Basic T-Shirt",
                price_minor: 12_999,
                stock: &[("S", 10), ("M", 5), ("L", 10)],
            },
            DemoProduct {
                name: "Slim Fit Jeans",
                price_minor: 24_999,
                stock: &[("S", 8), ("M", 8), ("L", 8)],
            },
        ],
    },
    DemoStore {
        name: "Zara",
        products: &[
            DemoProduct {
                name: "Linen Shirt",
                price_minor: 39_990,
                stock: &[("S", 6), ("M", 6), ("L", 6)],
            },
            DemoProduct {
                name: "Wool Coat",
                price_minor: 189_900,
                stock: &[("M", 3), ("L", 2)],
            },
        ],
    },
    DemoStore {
        name: "Koton",
        products: &[
            DemoProduct {
                name: "Hoodie",
                price_minor: 29_999,
                stock: &[("S", 12), ("M", 12), ("L", 12)],
            },
            DemoProduct {
                name: "Chino Trousers",
                price_minor: 34_999,
                stock: &[("M", 7), ("L", 7)],
            },
        ],
    },
];

/// Id a size label gets when seeded into an empty database.
#[must_use]
pub fn size_position(label: &str) -> Option<i32> {
    SIZES
        .iter()
        .position(|s| *s == label)
        .and_then(|i| i32::try_from(i + 1).ok())
}
