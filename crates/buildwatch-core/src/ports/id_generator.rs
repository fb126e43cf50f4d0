//! IdGenerator port - 相関 ID の発行
//!
//! timestamp 部分は Clock から取るので、FixedClock を渡せばテストでも決定的です。

use ulid::Ulid;

use crate::domain::{NotificationId, RunId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_notification_id(&self) -> NotificationId;

    fn generate_run_id(&self) -> RunId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn issue(&self) -> Ulid {
        Ulid::from_parts(self.clock.now().timestamp_millis() as u64, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_notification_id(&self) -> NotificationId {
        NotificationId::from_ulid(self.issue())
    }

    fn generate_run_id(&self) -> RunId {
        RunId::from_ulid(self.issue())
    }
}
