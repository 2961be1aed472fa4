//! 定时器到期事件

use super::rdt_world::RdtWorld;
use crate::sim::{Event, Simulator, TimerId, World};

/// 事件：定时器到期。已取消的定时器在 `RdtWorld::on_timer` 中认领失败，什么也不做。
#[derive(Debug)]
pub struct TimerFired {
    pub id: TimerId,
}

impl Event for TimerFired {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TimerFired { id } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<RdtWorld>() else {
            return;
        };
        w.on_timer(id, sim);
    }
}
