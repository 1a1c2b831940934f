pub mod chirps;
pub mod fields;
pub mod narrative;
pub mod zones;

pub use chirps::ChirpsClient;
pub use fields::JsonFieldStore;
pub use narrative::TemplateNarrative;
pub use zones::StaticZoneLookup;
