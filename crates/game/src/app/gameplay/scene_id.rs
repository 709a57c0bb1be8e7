use serde::{Deserialize, Serialize};

/// Every scene the controller can switch to. The serialized form is the name used by
/// portal objects in the maps and by save files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum SceneId {
    #[serde(rename = "main menu")]
    MainMenu,
    #[serde(rename = "instructions")]
    Instructions,
    #[serde(rename = "load game")]
    LoadGame,
    #[serde(rename = "town")]
    Town,
    #[serde(rename = "castle")]
    Castle,
    #[serde(rename = "house")]
    House,
    #[serde(rename = "overworld")]
    Overworld,
    #[serde(rename = "brotherhouse")]
    BrotherHouse,
    #[serde(rename = "Inn")]
    Inn,
    #[serde(rename = "armor shop")]
    ArmorShop,
    #[serde(rename = "weapon shop")]
    WeaponShop,
    #[serde(rename = "magic shop")]
    MagicShop,
    #[serde(rename = "potion shop")]
    PotionShop,
    #[serde(rename = "battle")]
    Battle,
    #[serde(rename = "dungeon")]
    Dungeon,
    #[serde(rename = "dungeon2")]
    Dungeon2,
    #[serde(rename = "dungeon3")]
    Dungeon3,
    #[serde(rename = "dungeon4")]
    Dungeon4,
    #[serde(rename = "dungeon5")]
    Dungeon5,
    #[serde(rename = "death scene")]
    DeathScene,
    #[serde(rename = "credits")]
    Credits,
}

impl SceneId {
    pub(crate) const ALL: [SceneId; 21] = [
        SceneId::MainMenu,
        SceneId::Instructions,
        SceneId::LoadGame,
        SceneId::Town,
        SceneId::Castle,
        SceneId::House,
        SceneId::Overworld,
        SceneId::BrotherHouse,
        SceneId::Inn,
        SceneId::ArmorShop,
        SceneId::WeaponShop,
        SceneId::MagicShop,
        SceneId::PotionShop,
        SceneId::Battle,
        SceneId::Dungeon,
        SceneId::Dungeon2,
        SceneId::Dungeon3,
        SceneId::Dungeon4,
        SceneId::Dungeon5,
        SceneId::DeathScene,
        SceneId::Credits,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            SceneId::MainMenu => "main menu",
            SceneId::Instructions => "instructions",
            SceneId::LoadGame => "load game",
            SceneId::Town => "town",
            SceneId::Castle => "castle",
            SceneId::House => "house",
            SceneId::Overworld => "overworld",
            SceneId::BrotherHouse => "brotherhouse",
            SceneId::Inn => "Inn",
            SceneId::ArmorShop => "armor shop",
            SceneId::WeaponShop => "weapon shop",
            SceneId::MagicShop => "magic shop",
            SceneId::PotionShop => "potion shop",
            SceneId::Battle => "battle",
            SceneId::Dungeon => "dungeon",
            SceneId::Dungeon2 => "dungeon2",
            SceneId::Dungeon3 => "dungeon3",
            SceneId::Dungeon4 => "dungeon4",
            SceneId::Dungeon5 => "dungeon5",
            SceneId::DeathScene => "death scene",
            SceneId::Credits => "credits",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Maps where walking can trigger random encounters.
    pub(crate) fn allows_battles(self) -> bool {
        matches!(
            self,
            SceneId::Overworld
                | SceneId::Dungeon
                | SceneId::Dungeon2
                | SceneId::Dungeon3
                | SceneId::Dungeon4
                | SceneId::Dungeon5
        )
    }

    /// Maps whose last row of tiles is hidden under the screen edge.
    pub(crate) fn cuts_off_bottom_row(self) -> bool {
        matches!(self, SceneId::Castle | SceneId::Town | SceneId::Dungeon)
    }
}
