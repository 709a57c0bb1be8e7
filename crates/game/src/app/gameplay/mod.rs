use std::rc::Rc;

use crown_engine::{AssetBundle, LoggingAudio, SaveFile, Scene, SceneController};

mod actor;
mod battle;
mod collision;
mod credits;
mod death;
mod dialogue;
mod game_data;
mod level;
mod menus;
mod painter;
mod player_menu;
mod rng;
mod scene_id;
mod shop;
mod transition;

pub(crate) use game_data::GameData;
pub(crate) use scene_id::SceneId;

use battle::BattleScene;
use credits::CreditsScene;
use death::DeathScene;
use level::LevelScene;
use menus::{TitlePage, TitleScene};
use rng::Dice;
use shop::{ShopKind, ShopScene};

pub(crate) type GameScene = Box<dyn Scene<SceneId, GameData>>;

fn make_scene(id: SceneId, assets: &Rc<AssetBundle>, save: &SaveFile) -> GameScene {
    let assets = Rc::clone(assets);
    match id {
        SceneId::MainMenu => Box::new(TitleScene::new(TitlePage::MainMenu, assets, save.clone())),
        SceneId::Instructions => Box::new(TitleScene::new(TitlePage::Instructions, assets, save.clone())),
        SceneId::LoadGame => Box::new(TitleScene::new(TitlePage::LoadGame, assets, save.clone())),
        SceneId::Town
        | SceneId::Castle
        | SceneId::House
        | SceneId::Overworld
        | SceneId::BrotherHouse
        | SceneId::Dungeon
        | SceneId::Dungeon2
        | SceneId::Dungeon3
        | SceneId::Dungeon4
        | SceneId::Dungeon5 => Box::new(LevelScene::new(id, assets, Dice::from_entropy())),
        SceneId::Inn => Box::new(ShopScene::new(ShopKind::Inn, assets, save.clone())),
        SceneId::ArmorShop => Box::new(ShopScene::new(ShopKind::Armor, assets, save.clone())),
        SceneId::WeaponShop => Box::new(ShopScene::new(ShopKind::Weapon, assets, save.clone())),
        SceneId::MagicShop => Box::new(ShopScene::new(ShopKind::Magic, assets, save.clone())),
        SceneId::PotionShop => Box::new(ShopScene::new(ShopKind::Potion, assets, save.clone())),
        SceneId::Battle => Box::new(BattleScene::new(assets, Dice::from_entropy())),
        SceneId::DeathScene => Box::new(DeathScene::new(assets, save.clone())),
        SceneId::Credits => Box::new(CreditsScene::new()),
    }
}

/// Every scene of the game, registered and waiting on the main menu.
pub(crate) fn build_controller(assets: &Rc<AssetBundle>, save: &SaveFile) -> SceneController<SceneId, GameData> {
    let audio = LoggingAudio::new(Rc::clone(assets));
    let mut controller = SceneController::new(SceneId::MainMenu, Box::new(audio));
    for id in SceneId::ALL {
        controller.register(id, make_scene(id, assets, save));
    }
    controller
}
