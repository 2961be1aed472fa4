//! 发送恢复事件

use super::rdt_world::RdtWorld;
use crate::sim::{Event, Simulator, World};

/// 事件：发送方此前因旧副本可能仍在信道中而暂停首发，到点后继续。
#[derive(Debug)]
pub struct ResumeSend;

impl Event for ResumeSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<RdtWorld>() else {
            return;
        };
        w.on_wake(sim);
    }
}
