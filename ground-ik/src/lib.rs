/*!
Per-frame foot and body ground adaptation for two-legged characters.

Each tick the host hands over an animated pose and a way to query ground
geometry ([`GroundQuery`]). The solver:
- decides whether adaptation should run at all (validity, ground presence),
- finds the ground under each foot with a foot-sized box sweep and a refining
  sphere sweep,
- lowers (or raises) the body so both feet can reach,
- lifts each foot onto the ground without ever pushing it below its animation,
- tilts the ankles with the slope and places the knee hints,
- leans the spine on slopes and the whole body into movement,
- reports footsteps and grounded transitions as [`SolverEvent`]s.

[`GroundWorld`] provides a Rapier-backed query world for hosts that do not
already own one.

```no_run
use ground_ik::{GroundWorld, RestLeg, Side, SolverBuilder, SolverConfig, TickInput, Vec3};
# fn main() -> Result<(), ground_ik::SetupError> {
let leg = |x: f32| RestLeg {
    thigh: Vec3::new(x, 0.9, 0.0),
    knee: Vec3::new(x, 0.5, 0.05),
    ankle: Vec3::new(x, 0.1, 0.0),
};
let mut solver = SolverBuilder::new(SolverConfig::default())
    .leg(Side::Left, leg(0.1))
    .leg(Side::Right, leg(-0.1))
    .build()?;

let world = GroundWorld::build(Vec::new());
let mut pose = ground_ik::Pose::default();
let input = TickInput::new(1.0 / 60.0, ground_ik::RootFrame::default());
let events = solver.tick(&world.query(u32::MAX), &input, &mut pose);
# let _ = events;
# Ok(())
# }
```
*/

pub mod body;
pub mod config;
pub mod error;
pub mod footstep;
pub mod grounded;
pub mod hint;
pub mod lean;
pub mod leg;
pub mod math;
pub mod pose;
pub mod query;
pub mod rotation;
pub mod settings;
pub mod solver;
pub mod types;
pub mod world;

#[cfg(test)]
mod testing;

pub use config::{
    AnkleConfig, BodyConfig, FootConfig, FootstepConfig, GroundCheckConfig, LeanConfig,
    MoveLeanConfig, SmoothingMode, SolverConfig, ValidityMode,
};
pub use error::{Segment, SetupError};
pub use footstep::SolverEvent;
pub use grounded::{GroundedResult, LayerState, StateExclusion};
pub use leg::{ContactKind, LegContactResult};
pub use pose::{LegPose, Pose, RestLeg};
pub use query::{GroundQuery, ShapeHit};
pub use solver::{FootIkSolver, SolverBuilder, TickInput};
pub use types::{GroundRef, Iso, Quat, RootFrame, Side, Vec3};
pub use world::{GroundDef, GroundShape, GroundWorld, WorldQuery};
