use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

use crate::physics::{Simulation, SimulationSet};

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    LeftClick,
}

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::LeftClick, MouseButton::Left);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());

    app.add_systems(Update, request_spawn.before(SimulationSet));
}

/// Every click only raises the pending-spawn flag; the frame step decides what spawns.
fn request_spawn(actions: Res<ActionState<InputAction>>, mut sim: ResMut<Simulation>) {
    if actions.just_pressed(&InputAction::LeftClick) {
        sim.0.on_input_down();
    }
}
