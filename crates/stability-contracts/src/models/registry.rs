use indexmap::IndexMap;

/// Largest seed the remote API accepts (32-bit unsigned range minus one).
pub const MAX_SEED: u64 = 4_294_967_294;

const CORE_ROUTE: &str = "/v2beta/stable-image/generate/core";
const ULTRA_ROUTE: &str = "/v2beta/stable-image/generate/ultra";
const SD3_ROUTE: &str = "/v2beta/stable-image/generate/sd3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StabilityModel {
    Core,
    Ultra,
    Sd35Large,
    Sd35LargeTurbo,
    Sd35Medium,
    Sd35Flash,
}

impl StabilityModel {
    /// Declaration order; listings follow it.
    pub const ALL: [StabilityModel; 6] = [
        StabilityModel::Core,
        StabilityModel::Ultra,
        StabilityModel::Sd35Large,
        StabilityModel::Sd35LargeTurbo,
        StabilityModel::Sd35Medium,
        StabilityModel::Sd35Flash,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StabilityModel::Core => "stable-image-core",
            StabilityModel::Ultra => "stable-image-ultra",
            StabilityModel::Sd35Large => "sd3.5-large",
            StabilityModel::Sd35LargeTurbo => "sd3.5-large-turbo",
            StabilityModel::Sd35Medium => "sd3.5-medium",
            StabilityModel::Sd35Flash => "sd3.5-flash",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.key() == key)
    }

    pub fn descriptor(self) -> ModelDescriptor {
        match self {
            StabilityModel::Core => ModelDescriptor {
                model: self,
                name: "Stable Image Core",
                description: "Fast, affordable, natural language optimized. Best for everyday use.",
                route: CORE_ROUTE,
                supports_negative_prompt: true,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
            StabilityModel::Ultra => ModelDescriptor {
                model: self,
                name: "Stable Image Ultra",
                description: "Highest quality results. State-of-the-art, SD3.5-based. Use for important or complex images.",
                route: ULTRA_ROUTE,
                supports_negative_prompt: true,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
            StabilityModel::Sd35Large => ModelDescriptor {
                model: self,
                name: "SD3.5 Large",
                description: "8B parameter model. Maximum control and detail. Good for technical or artistic work.",
                route: SD3_ROUTE,
                supports_negative_prompt: true,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
            StabilityModel::Sd35LargeTurbo => ModelDescriptor {
                model: self,
                name: "SD3.5 Large Turbo",
                description: "Distilled faster version of SD3.5 Large. Good balance of quality and speed.",
                route: SD3_ROUTE,
                supports_negative_prompt: true,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
            StabilityModel::Sd35Medium => ModelDescriptor {
                model: self,
                name: "SD3.5 Medium",
                description: "2B parameter model. Efficient and fast with good quality.",
                route: SD3_ROUTE,
                supports_negative_prompt: true,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
            StabilityModel::Sd35Flash => ModelDescriptor {
                model: self,
                name: "SD3.5 Flash",
                description: "Ultra-fast 4-step generation. Fastest generation, good for rapid iteration and previews.",
                route: SD3_ROUTE,
                supports_negative_prompt: false,
                supports_image_to_image: true,
                supports_strength: true,
                max_seed: MAX_SEED,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub model: StabilityModel,
    pub name: &'static str,
    pub description: &'static str,
    pub route: &'static str,
    pub supports_negative_prompt: bool,
    pub supports_image_to_image: bool,
    pub supports_strength: bool,
    pub max_seed: u64,
}

impl ModelDescriptor {
    pub fn key(&self) -> &'static str {
        self.model.key()
    }

    /// Core and Ultra are the natural-language flagship models.
    pub fn is_flagship(&self) -> bool {
        self.key().starts_with("stable-image-")
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<&'static str, ModelDescriptor>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        let models = StabilityModel::ALL
            .into_iter()
            .map(|model| (model.key(), model.descriptor()))
            .collect();
        Self { models }
    }

    pub fn resolve(&self, key: &str) -> Option<&ModelDescriptor> {
        self.models.get(key)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.models.keys().copied().collect()
    }

    /// A route served by more than one model needs the model key in the payload.
    pub fn route_is_shared(&self, route: &str) -> bool {
        self.models
            .values()
            .filter(|model| model.route == route)
            .count()
            > 1
    }
}
